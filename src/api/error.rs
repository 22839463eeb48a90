// =============================================================================
// API error type — `{error, detail}` JSON bodies
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::error::AnalyticsError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unavailable(String),
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::UnknownCommodity(_) | AnalyticsError::BaseNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            AnalyticsError::InvalidInput(_) => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<AnalyticsError>() {
            Some(typed) => typed.clone().into(),
            None => Self::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::NotFound(detail) => ErrorBody {
                error: "Resource not found".to_string(),
                detail: Some(detail),
            },
            Self::BadRequest(detail) => ErrorBody {
                error: "Bad request".to_string(),
                detail: Some(detail),
            },
            Self::Unavailable(detail) => ErrorBody {
                error: "Service unavailable".to_string(),
                detail: Some(detail),
            },
            Self::Internal(err) => {
                error!(error = %format!("{err:#}"), "internal server error");
                ErrorBody {
                    error: "Internal server error".to_string(),
                    detail: Some("Please check server logs".to_string()),
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
