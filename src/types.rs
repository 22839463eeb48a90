// =============================================================================
// Shared types used across the Depo analytics service
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar. A series of bars is ordered by ascending `date` with
/// unique dates; gaps (non-trading days) are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<u64>,
    #[serde(default)]
    pub adjusted_close: Option<f64>,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume: None,
            adjusted_close: None,
        }
    }

    pub fn with_volume(mut self, volume: u64) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// Extract the close column of a bar series.
pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Broad instrument class, stored alongside each asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Commodity,
    Currency,
}

impl AssetType {
    /// Infer the asset class from the configured symbol category.
    pub fn from_category(category: &str) -> Self {
        match category.to_lowercase().as_str() {
            "currency" | "currencies" | "fx" => Self::Currency,
            "metals" | "commodity" | "commodities" | "energy" => Self::Commodity,
            _ => Self::Stock,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Commodity => "commodity",
            Self::Currency => "currency",
        }
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one ETL job, persisted into the job log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// One row of the ETL job log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtlJobLog {
    pub run_id: String,
    pub asset_id: Option<i64>,
    pub job_name: String,
    pub job_type: String,
    pub status: JobStatus,
    pub rows_processed: u64,
    pub rows_failed: u64,
    pub error_message: Option<String>,
    pub duration_seconds: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_type_from_category() {
        assert_eq!(AssetType::from_category("Currency"), AssetType::Currency);
        assert_eq!(AssetType::from_category("Metals"), AssetType::Commodity);
        assert_eq!(AssetType::from_category("US"), AssetType::Stock);
        assert_eq!(AssetType::from_category("Turkish"), AssetType::Stock);
    }

    #[test]
    fn closes_preserves_order() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bars = vec![
            PriceBar::new(d, 1.0, 2.0, 0.5, 1.5),
            PriceBar::new(d.succ_opt().unwrap(), 1.5, 2.5, 1.0, 2.0),
        ];
        assert_eq!(closes(&bars), vec![1.5, 2.0]);
    }

    #[test]
    fn job_status_text_roundtrip() {
        for status in [JobStatus::Success, JobStatus::Failed] {
            assert_eq!(status.to_string().parse::<JobStatus>(), Ok(status));
        }
        assert!("pending".parse::<JobStatus>().is_err());
    }
}
