// =============================================================================
// Quote Client — daily OHLCV bars from the HTTP chart endpoint
// =============================================================================
//
// GET {base_url}/v8/finance/chart/{symbol}?period1=..&period2=..&interval=1d
//
// The payload is column-oriented: one `timestamp` array plus parallel
// open/high/low/close/volume arrays in which any cell may be null. Rows with
// no usable close are dropped; the rest become `PriceBar`s in ascending date
// order.
// =============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::types::PriceBar;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; depo/1.0)";

/// Anything that can produce a daily bar series for a symbol.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn daily_bars(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<PriceBar>>;
}

#[derive(Clone)]
pub struct QuoteClient {
    base_url: String,
    client: reqwest::Client,
}

impl QuoteClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, "QuoteClient initialised");

        Ok(Self { base_url, client })
    }
}

#[async_trait]
impl QuoteSource for QuoteClient {
    #[instrument(skip(self), name = "quotes::daily_bars")]
    async fn daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>> {
        let period1 = day_start_epoch(start);
        // `period2` is exclusive; include the whole end day.
        let period2 = day_start_epoch(end) + 86_400;
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        info!(symbol, %start, %end, "fetching daily bars");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("GET chart for {symbol} failed"))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("failed to read chart body for {symbol}"))?;

        if !status.is_success() {
            anyhow::bail!("chart endpoint returned {} for {}: {}", status, symbol, body);
        }

        let bars = parse_chart(symbol, &body)?;
        if bars.is_empty() {
            warn!(symbol, "no data retrieved");
        } else {
            info!(symbol, count = bars.len(), "retrieved daily bars");
        }
        Ok(bars)
    }
}

fn day_start_epoch(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Payload parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
    #[serde(default)]
    adjclose: Vec<AdjCloseColumn>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseColumn {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

fn cell(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten().filter(|v| v.is_finite())
}

/// Parse a chart payload into bars sorted by date.
///
/// A payload with no result (or an empty one) yields an empty series. A
/// payload carrying an `error` object is an error.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<PriceBar>> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .with_context(|| format!("failed to parse chart payload for {symbol}"))?;

    if let Some(err) = envelope.chart.error.filter(|e| !e.is_null()) {
        anyhow::bail!("chart endpoint reported an error for {}: {}", symbol, err);
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|c| c.adjclose)
        .unwrap_or_default();

    // Keyed by date so a repeated day keeps its last row.
    let mut by_date = BTreeMap::new();
    let mut dropped = 0usize;

    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
            dropped += 1;
            continue;
        };
        let Some(close) = cell(&quote.close, i) else {
            dropped += 1;
            continue;
        };

        let mut bar = PriceBar::new(
            date,
            cell(&quote.open, i).unwrap_or(close),
            cell(&quote.high, i).unwrap_or(close),
            cell(&quote.low, i).unwrap_or(close),
            close,
        );
        if let Some(volume) = cell(&quote.volume, i).filter(|v| *v >= 0.0) {
            bar = bar.with_volume(volume as u64);
        }
        bar.adjusted_close = cell(&adjclose, i);
        by_date.insert(date, bar);
    }

    if dropped > 0 {
        warn!(symbol, dropped, "dropped rows without a usable close");
    }

    Ok(by_date.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
      "chart": {
        "result": [{
          "timestamp": [1704205800, 1704292200, 1704378600, 1704465000],
          "indicators": {
            "quote": [{
              "open":   [187.15, 184.22, null, 181.99],
              "high":   [188.44, 185.88, null, 182.76],
              "low":    [183.89, 183.43, null, 180.17],
              "close":  [185.64, 184.25, null, 181.18],
              "volume": [82488700, 58414500, null, null]
            }],
            "adjclose": [{ "adjclose": [184.73, 183.35, null, 180.29] }]
          }
        }],
        "error": null
      }
    }"#;

    #[test]
    fn parses_rows_and_drops_missing_close() {
        let bars = parse_chart("AAPL", PAYLOAD).unwrap();
        assert_eq!(bars.len(), 3);

        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].close, 185.64);
        assert_eq!(bars[0].volume, Some(82_488_700));
        assert_eq!(bars[0].adjusted_close, Some(184.73));

        assert_eq!(bars[2].date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(bars[2].volume, None);
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn empty_result_is_empty_series() {
        let body = r#"{"chart":{"result":[],"error":null}}"#;
        assert!(parse_chart("X", body).unwrap().is_empty());

        let body = r#"{"chart":{"result":null,"error":null}}"#;
        assert!(parse_chart("X", body).unwrap().is_empty());
    }

    #[test]
    fn error_object_is_an_error() {
        let body = r#"{"chart":{"result":null,
            "error":{"code":"Not Found","description":"No data found"}}}"#;
        assert!(parse_chart("NOPE", body).is_err());
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_chart("X", "<html>").is_err());
    }

    #[test]
    fn missing_ohl_falls_back_to_close() {
        let body = r#"{"chart":{"result":[{"timestamp":[1704205800],
            "indicators":{"quote":[{"close":[10.0]}]}}],"error":null}}"#;
        let bars = parse_chart("X", body).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!((bars[0].open, bars[0].high, bars[0].low), (10.0, 10.0, 10.0));
        assert_eq!(bars[0].adjusted_close, None);
    }

    #[test]
    fn epoch_covers_whole_day() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(day_start_epoch(d), 1_704_153_600);
    }
}
