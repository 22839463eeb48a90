// =============================================================================
// SQLite connection pool and schema
// =============================================================================
//
// Tables:
//   assets               one row per symbol
//   daily_prices         OHLCV per (asset_id, price_date)
//   technical_indicators IndicatorRow per (asset_id, price_date)
//   etl_logs             one row per processed symbol per ETL run
//
// Dates are stored as ISO `YYYY-MM-DD` text so that lexical order is
// chronological order.
// =============================================================================

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

const SCHEMA: &[(&str, &str)] = &[
    (
        "assets",
        r#"
        CREATE TABLE IF NOT EXISTS assets (
            asset_id   INTEGER PRIMARY KEY AUTOINCREMENT,
            symbol     TEXT NOT NULL UNIQUE,
            asset_name TEXT NOT NULL,
            asset_type TEXT NOT NULL,
            market     TEXT,
            currency   TEXT NOT NULL DEFAULT 'USD',
            sector     TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    ),
    (
        "daily_prices",
        r#"
        CREATE TABLE IF NOT EXISTS daily_prices (
            asset_id       INTEGER NOT NULL REFERENCES assets(asset_id),
            price_date     TEXT NOT NULL,
            open_price     REAL NOT NULL,
            high_price     REAL NOT NULL,
            low_price      REAL NOT NULL,
            close_price    REAL NOT NULL,
            volume         INTEGER,
            adjusted_close REAL,
            PRIMARY KEY (asset_id, price_date)
        );
        "#,
    ),
    (
        "technical_indicators",
        r#"
        CREATE TABLE IF NOT EXISTS technical_indicators (
            asset_id         INTEGER NOT NULL REFERENCES assets(asset_id),
            price_date       TEXT NOT NULL,
            sma_20           REAL,
            sma_50           REAL,
            sma_200          REAL,
            ema_12           REAL,
            ema_26           REAL,
            rsi_14           REAL,
            macd             REAL,
            macd_signal      REAL,
            bollinger_upper  REAL,
            bollinger_middle REAL,
            bollinger_lower  REAL,
            atr_14           REAL,
            PRIMARY KEY (asset_id, price_date)
        );
        "#,
    ),
    (
        "etl_logs",
        r#"
        CREATE TABLE IF NOT EXISTS etl_logs (
            log_id           INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id           TEXT NOT NULL,
            asset_id         INTEGER REFERENCES assets(asset_id),
            job_name         TEXT NOT NULL,
            job_type         TEXT NOT NULL,
            status           TEXT NOT NULL,
            rows_processed   INTEGER NOT NULL DEFAULT 0,
            rows_failed      INTEGER NOT NULL DEFAULT 0,
            error_message    TEXT,
            duration_seconds REAL,
            completed_at     TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    ),
    (
        "idx_daily_prices_date",
        "CREATE INDEX IF NOT EXISTS idx_daily_prices_date ON daily_prices (price_date);",
    ),
];

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `db_url` and apply the schema.
    ///
    /// `sqlite::memory:` URLs get a single long-lived connection, since every
    /// new connection to an in-memory database starts empty.
    pub async fn new(db_url: &str) -> Result<Self> {
        let in_memory = db_url.contains(":memory:");

        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            if let Some(parent) = Path::new(path_part).parent() {
                if !in_memory && !parent.as_os_str().is_empty() && !parent.exists() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .context("failed to create database directory")?;
                }
            }
        }

        let mut options = SqliteConnectOptions::from_str(db_url)
            .with_context(|| format!("invalid database URL {db_url}"))?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .context("failed to connect to SQLite database")?;

        info!(url = db_url, "connected to database");

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        for (name, ddl) in SCHEMA {
            sqlx::query(ddl)
                .execute(&mut *conn)
                .await
                .with_context(|| format!("failed to create {name}"))?;
        }
        Ok(())
    }
}
