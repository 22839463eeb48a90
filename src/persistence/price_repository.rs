// =============================================================================
// Price Repository — assets, daily bars, indicators and ETL job log
// =============================================================================
//
// All writes are upserts keyed on `symbol` or `(asset_id, price_date)`, so
// running the same load twice leaves the tables unchanged.
// =============================================================================

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::indicators::{detect_golden_cross, CrossSignal, IndicatorRow, IndicatorSet};
use crate::types::{AssetType, EtlJobLog, PriceBar};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Static description of an asset, as written into `assets`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset<'a> {
    pub symbol: &'a str,
    pub asset_name: &'a str,
    pub asset_type: AssetType,
    pub market: Option<&'a str>,
    pub currency: &'a str,
    pub sector: Option<&'a str>,
}

/// Most recent bar of one asset plus its change versus the previous bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestPrice {
    pub symbol: String,
    pub asset_name: String,
    pub asset_type: String,
    #[serde(flatten)]
    pub bar: PriceBar,
    pub daily_change_pct: Option<f64>,
}

/// A stored bar joined with whatever indicators exist for its date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRow {
    #[serde(flatten)]
    pub bar: PriceBar,
    #[serde(flatten)]
    pub indicators: IndicatorRow,
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).with_context(|| format!("bad stored date '{raw}'"))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn bar_from_row(row: &SqliteRow) -> Result<PriceBar> {
    let date: String = row.try_get("price_date")?;
    let volume: Option<i64> = row.try_get("volume")?;
    Ok(PriceBar {
        date: parse_date(&date)?,
        open: row.try_get("open_price")?,
        high: row.try_get("high_price")?,
        low: row.try_get("low_price")?,
        close: row.try_get("close_price")?,
        volume: volume.and_then(|v| u64::try_from(v).ok()),
        adjusted_close: row.try_get("adjusted_close")?,
    })
}

fn indicators_from_row(row: &SqliteRow) -> Result<IndicatorRow> {
    Ok(IndicatorRow {
        sma_20: row.try_get("sma_20")?,
        sma_50: row.try_get("sma_50")?,
        sma_200: row.try_get("sma_200")?,
        ema_12: row.try_get("ema_12")?,
        ema_26: row.try_get("ema_26")?,
        rsi_14: row.try_get("rsi_14")?,
        macd: row.try_get("macd")?,
        macd_signal: row.try_get("macd_signal")?,
        bollinger_upper: row.try_get("bollinger_upper")?,
        bollinger_middle: row.try_get("bollinger_middle")?,
        bollinger_lower: row.try_get("bollinger_lower")?,
        atr_14: row.try_get("atr_14")?,
    })
}

#[derive(Clone)]
pub struct PriceRepository {
    pool: SqlitePool,
}

impl PriceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Insert the asset if its symbol is new and return its id either way.
    pub async fn ensure_asset(&self, asset: &NewAsset<'_>) -> Result<i64> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO assets (symbol, asset_name, asset_type, market, currency, sector)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (symbol) DO NOTHING
            "#,
        )
        .bind(asset.symbol)
        .bind(asset.asset_name)
        .bind(asset.asset_type.as_str())
        .bind(asset.market)
        .bind(asset.currency)
        .bind(asset.sector)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert asset {}", asset.symbol))?;

        let asset_id: i64 = sqlx::query_scalar("SELECT asset_id FROM assets WHERE symbol = ?")
            .bind(asset.symbol)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("failed to look up asset {}", asset.symbol))?;

        if inserted.rows_affected() > 0 {
            info!(symbol = asset.symbol, asset_id, "created new asset");
        }
        Ok(asset_id)
    }

    pub async fn upsert_daily_prices(&self, asset_id: i64, bars: &[PriceBar]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for bar in bars {
            sqlx::query(
                r#"
                INSERT INTO daily_prices
                    (asset_id, price_date, open_price, high_price, low_price, close_price, volume, adjusted_close)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (asset_id, price_date) DO UPDATE SET
                    open_price     = excluded.open_price,
                    high_price     = excluded.high_price,
                    low_price      = excluded.low_price,
                    close_price    = excluded.close_price,
                    volume         = excluded.volume,
                    adjusted_close = excluded.adjusted_close
                "#,
            )
            .bind(asset_id)
            .bind(bar.date.format(DATE_FORMAT).to_string())
            .bind(bar.open)
            .bind(bar.high)
            .bind(bar.low)
            .bind(bar.close)
            .bind(bar.volume.and_then(|v| i64::try_from(v).ok()))
            .bind(bar.adjusted_close)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to upsert price for {}", bar.date))?;
        }
        tx.commit().await.context("failed to commit price upsert")?;

        info!(asset_id, count = bars.len(), "upserted price records");
        Ok(bars.len())
    }

    /// Upsert indicator rows. `dates[i]` is the bar date of `set.rows[i]`.
    pub async fn upsert_indicators(
        &self,
        asset_id: i64,
        dates: &[NaiveDate],
        set: &IndicatorSet,
    ) -> Result<usize> {
        if set.len() != dates.len() {
            anyhow::bail!("{} indicator rows for {} dates", set.len(), dates.len());
        }
        if set.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0usize;
        for (date, row) in dates.iter().zip(&set.rows) {
            sqlx::query(
                r#"
                INSERT INTO technical_indicators
                    (asset_id, price_date, sma_20, sma_50, sma_200, ema_12, ema_26, rsi_14,
                     macd, macd_signal, bollinger_upper, bollinger_middle, bollinger_lower, atr_14)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (asset_id, price_date) DO UPDATE SET
                    sma_20           = excluded.sma_20,
                    sma_50           = excluded.sma_50,
                    sma_200          = excluded.sma_200,
                    ema_12           = excluded.ema_12,
                    ema_26           = excluded.ema_26,
                    rsi_14           = excluded.rsi_14,
                    macd             = excluded.macd,
                    macd_signal      = excluded.macd_signal,
                    bollinger_upper  = excluded.bollinger_upper,
                    bollinger_middle = excluded.bollinger_middle,
                    bollinger_lower  = excluded.bollinger_lower,
                    atr_14           = excluded.atr_14
                "#,
            )
            .bind(asset_id)
            .bind(date.format(DATE_FORMAT).to_string())
            .bind(row.sma_20)
            .bind(row.sma_50)
            .bind(row.sma_200)
            .bind(row.ema_12)
            .bind(row.ema_26)
            .bind(row.rsi_14)
            .bind(row.macd)
            .bind(row.macd_signal)
            .bind(row.bollinger_upper)
            .bind(row.bollinger_middle)
            .bind(row.bollinger_lower)
            .bind(row.atr_14)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to upsert indicators for {date}"))?;
            written += 1;
        }
        tx.commit().await.context("failed to commit indicator upsert")?;

        info!(asset_id, count = written, "upserted technical indicator records");
        Ok(written)
    }

    pub async fn log_etl_job(&self, log: &EtlJobLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO etl_logs
                (run_id, asset_id, job_name, job_type, status, rows_processed, rows_failed,
                 error_message, duration_seconds)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.run_id.as_str())
        .bind(log.asset_id)
        .bind(log.job_name.as_str())
        .bind(log.job_type.as_str())
        .bind(log.status.to_string())
        .bind(i64::try_from(log.rows_processed).unwrap_or(i64::MAX))
        .bind(i64::try_from(log.rows_failed).unwrap_or(i64::MAX))
        .bind(log.error_message.as_deref())
        .bind(log.duration_seconds)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to log ETL job {}", log.job_name))?;

        debug!(job = %log.job_name, status = %log.status, "ETL job logged");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Latest stored bar for each requested symbol, with the percent change
    /// against the bar before it (rounded to 2 decimals). Unknown symbols are
    /// skipped.
    pub async fn latest_prices(&self, symbols: &[String]) -> Result<Vec<LatestPrice>> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; symbols.len()].join(", ");
        let sql = format!(
            r#"
            WITH ranked AS (
                SELECT a.symbol, a.asset_name, a.asset_type,
                       dp.price_date, dp.open_price, dp.high_price, dp.low_price,
                       dp.close_price, dp.volume, dp.adjusted_close,
                       LAG(dp.close_price) OVER (PARTITION BY dp.asset_id ORDER BY dp.price_date) AS prev_close,
                       ROW_NUMBER() OVER (PARTITION BY dp.asset_id ORDER BY dp.price_date DESC) AS rn
                FROM assets a
                JOIN daily_prices dp ON dp.asset_id = a.asset_id
                WHERE a.symbol IN ({placeholders})
            )
            SELECT * FROM ranked WHERE rn = 1 ORDER BY symbol
            "#
        );

        let mut query = sqlx::query(&sql);
        for symbol in symbols {
            query = query.bind(symbol.as_str());
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("failed to query latest prices")?;

        rows.iter()
            .map(|row| -> Result<LatestPrice> {
                let bar = bar_from_row(row)?;
                let prev_close: Option<f64> = row.try_get("prev_close")?;
                let daily_change_pct = prev_close
                    .filter(|p| *p != 0.0)
                    .map(|p| round2((bar.close - p) / p * 100.0));
                Ok(LatestPrice {
                    symbol: row.try_get("symbol")?,
                    asset_name: row.try_get("asset_name")?,
                    asset_type: row.try_get("asset_type")?,
                    bar,
                    daily_change_pct,
                })
            })
            .collect()
    }

    /// Stored bars on or after `since`, oldest first, each joined with its
    /// indicators (all `None` where none were stored).
    pub async fn historical(&self, symbol: &str, since: NaiveDate) -> Result<Vec<HistoricalRow>> {
        let rows = sqlx::query(
            r#"
            SELECT dp.price_date, dp.open_price, dp.high_price, dp.low_price, dp.close_price,
                   dp.volume, dp.adjusted_close,
                   ti.sma_20, ti.sma_50, ti.sma_200, ti.ema_12, ti.ema_26, ti.rsi_14,
                   ti.macd, ti.macd_signal, ti.bollinger_upper, ti.bollinger_middle,
                   ti.bollinger_lower, ti.atr_14
            FROM assets a
            JOIN daily_prices dp ON dp.asset_id = a.asset_id
            LEFT JOIN technical_indicators ti
                   ON ti.asset_id = dp.asset_id AND ti.price_date = dp.price_date
            WHERE a.symbol = ? AND dp.price_date >= ?
            ORDER BY dp.price_date ASC
            "#,
        )
        .bind(symbol)
        .bind(since.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to query history for {symbol}"))?;

        rows.iter()
            .map(|row| -> Result<HistoricalRow> {
                Ok(HistoricalRow {
                    bar: bar_from_row(row)?,
                    indicators: indicators_from_row(row)?,
                })
            })
            .collect()
    }

    /// `(date, sma_50, sma_200)` on or after `since`, oldest first.
    pub async fn sma_history(
        &self,
        symbol: &str,
        since: NaiveDate,
    ) -> Result<Vec<(NaiveDate, Option<f64>, Option<f64>)>> {
        let rows = sqlx::query(
            r#"
            SELECT ti.price_date, ti.sma_50, ti.sma_200
            FROM assets a
            JOIN technical_indicators ti ON ti.asset_id = a.asset_id
            WHERE a.symbol = ? AND ti.price_date >= ?
            ORDER BY ti.price_date ASC
            "#,
        )
        .bind(symbol)
        .bind(since.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to query SMA history for {symbol}"))?;

        rows.iter()
            .map(|row| -> Result<(NaiveDate, Option<f64>, Option<f64>)> {
                let date: String = row.try_get("price_date")?;
                Ok((parse_date(&date)?, row.try_get("sma_50")?, row.try_get("sma_200")?))
            })
            .collect()
    }

    /// Most recent SMA50 / SMA200 golden cross on or after `since`.
    pub async fn golden_cross(
        &self,
        symbol: &str,
        since: NaiveDate,
    ) -> Result<Option<CrossSignal<NaiveDate>>> {
        let history = self.sma_history(symbol, since).await?;
        let dates: Vec<NaiveDate> = history.iter().map(|(d, _, _)| *d).collect();
        let fast: Vec<Option<f64>> = history.iter().map(|(_, f, _)| *f).collect();
        let slow: Vec<Option<f64>> = history.iter().map(|(_, _, s)| *s).collect();
        Ok(detect_golden_cross(&dates, &fast, &slow))
    }

    pub async fn recent_etl_logs(&self, limit: u32) -> Result<Vec<EtlJobLog>> {
        let rows = sqlx::query(
            r#"
            SELECT run_id, asset_id, job_name, job_type, status, rows_processed, rows_failed,
                   error_message, duration_seconds
            FROM etl_logs
            ORDER BY log_id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .context("failed to query ETL logs")?;

        rows.iter()
            .map(|row| -> Result<EtlJobLog> {
                let status: String = row.try_get("status")?;
                let rows_processed: i64 = row.try_get("rows_processed")?;
                let rows_failed: i64 = row.try_get("rows_failed")?;
                Ok(EtlJobLog {
                    run_id: row.try_get("run_id")?,
                    asset_id: row.try_get("asset_id")?,
                    job_name: row.try_get("job_name")?,
                    job_type: row.try_get("job_type")?,
                    status: status.parse().map_err(anyhow::Error::msg)?,
                    rows_processed: u64::try_from(rows_processed).unwrap_or_default(),
                    rows_failed: u64::try_from(rows_failed).unwrap_or_default(),
                    error_message: row.try_get("error_message")?,
                    duration_seconds: row.try_get("duration_seconds")?,
                })
            })
            .collect()
    }
}
