// =============================================================================
// ETL Pipeline — quote source -> SQLite
// =============================================================================
//
// Per symbol:
//   1. fetch daily bars for [today - lookback_days, today]
//   2. ensure the asset row exists
//   3. upsert the bars
//   4. compute the IndicatorSet over the fetched window and upsert it
//   5. write one etl_logs row (success or failed, with duration)
//
// Symbols are processed sequentially. A failing symbol is logged and the run
// moves on to the next one.
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::indicators::{detect_golden_cross, IndicatorSet};
use crate::market_data::QuoteSource;
use crate::persistence::{NewAsset, PriceRepository};
use crate::types::{AssetType, EtlJobLog, JobStatus};

const JOB_TYPE: &str = "daily_update";
const DEFAULT_MARKET: &str = "Various";
const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: String,
}

/// Outcome of one full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtlReport {
    pub run_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub succeeded: Vec<String>,
    pub failed: Vec<SymbolFailure>,
    pub rows_loaded: u64,
}

pub struct EtlPipeline {
    source: Arc<dyn QuoteSource>,
    repo: PriceRepository,
}

impl EtlPipeline {
    pub fn new(source: Arc<dyn QuoteSource>, repo: PriceRepository) -> Self {
        Self { source, repo }
    }

    /// Run every configured symbol, grouped by category, over the lookback
    /// window ending at `today`.
    pub async fn run(
        &self,
        symbols_by_category: &BTreeMap<String, Vec<String>>,
        lookback_days: u32,
        today: NaiveDate,
    ) -> Result<EtlReport> {
        let run_id = Uuid::new_v4().to_string();
        let start = today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .with_context(|| format!("lookback of {lookback_days} days is out of the date range"))?;

        info!(%run_id, %start, end = %today, "ETL run started");

        let mut report = EtlReport {
            run_id: run_id.clone(),
            start,
            end: today,
            succeeded: Vec::new(),
            failed: Vec::new(),
            rows_loaded: 0,
        };

        for (category, symbols) in symbols_by_category {
            for symbol in symbols {
                let started = Instant::now();
                info!(%symbol, %category, "processing symbol");

                let outcome = self.process_symbol(symbol, category, start, today).await;
                let duration_seconds = Some(started.elapsed().as_secs_f64());

                let log = match &outcome {
                    Ok((asset_id, rows)) => EtlJobLog {
                        run_id: run_id.clone(),
                        asset_id: Some(*asset_id),
                        job_name: symbol.clone(),
                        job_type: JOB_TYPE.to_string(),
                        status: JobStatus::Success,
                        rows_processed: *rows as u64,
                        rows_failed: 0,
                        error_message: None,
                        duration_seconds,
                    },
                    Err(e) => EtlJobLog {
                        run_id: run_id.clone(),
                        asset_id: None,
                        job_name: symbol.clone(),
                        job_type: JOB_TYPE.to_string(),
                        status: JobStatus::Failed,
                        rows_processed: 0,
                        rows_failed: 0,
                        error_message: Some(format!("{e:#}")),
                        duration_seconds,
                    },
                };

                if let Err(e) = self.repo.log_etl_job(&log).await {
                    warn!(%symbol, error = %e, "failed to write ETL log");
                }

                match outcome {
                    Ok((_, rows)) => {
                        info!(%symbol, records = rows, "successfully processed symbol");
                        report.rows_loaded += rows as u64;
                        report.succeeded.push(symbol.clone());
                    }
                    Err(e) => {
                        error!(%symbol, error = %e, "error processing symbol");
                        report.failed.push(SymbolFailure {
                            symbol: symbol.clone(),
                            error: format!("{e:#}"),
                        });
                    }
                }
            }
        }

        info!(
            %run_id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            rows = report.rows_loaded,
            "ETL run completed"
        );
        Ok(report)
    }

    async fn process_symbol(
        &self,
        symbol: &str,
        category: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(i64, usize)> {
        let bars = self.source.daily_bars(symbol, start, end).await?;
        if bars.is_empty() {
            anyhow::bail!("No data retrieved for {symbol}");
        }

        let asset_id = self
            .repo
            .ensure_asset(&NewAsset {
                symbol,
                asset_name: symbol,
                asset_type: AssetType::from_category(category),
                market: Some(DEFAULT_MARKET),
                currency: DEFAULT_CURRENCY,
                sector: Some(category),
            })
            .await?;

        let rows = self.repo.upsert_daily_prices(asset_id, &bars).await?;

        let set = IndicatorSet::compute(&bars);
        let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
        self.repo.upsert_indicators(asset_id, &dates, &set).await?;

        let fast = set.column(|r| r.sma_50);
        let slow = set.column(|r| r.sma_200);
        if let Some(cross) = detect_golden_cross(&dates, &fast, &slow) {
            info!(
                %symbol,
                date = %cross.at,
                sma_50 = cross.fast,
                sma_200 = cross.slow,
                "golden cross in window"
            );
        }

        Ok((asset_id, rows))
    }
}
