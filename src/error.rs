// =============================================================================
// Engine & data-access errors
// =============================================================================
//
// The computation engines return these directly. The I/O layers wrap them in
// `anyhow::Error`; the REST layer downcasts back to pick a status code.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("Commodity '{0}' not found in dataset")]
    UnknownCommodity(String),

    #[error("Base timestamp {0} not found in data")]
    BaseNotFound(String),
}

impl AnalyticsError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
