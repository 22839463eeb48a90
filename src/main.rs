// =============================================================================
// Depo — Main Entry Point
// =============================================================================
//
// `depo serve` (default) runs the read-only REST API over the commodity CSV
// and, when reachable, the SQLite price store.
// `depo etl` runs one ETL pass over the configured symbols and exits.
// `depo init-config` writes the effective settings to the config file.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod error;
mod etl;
mod indicators;
mod market_data;
mod persistence;
mod runtime_config;
mod statistics;
mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::etl::EtlPipeline;
use crate::market_data::{CommodityLoader, QuoteClient};
use crate::persistence::{Database, PriceRepository};
use crate::runtime_config::RuntimeConfig;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Historical commodity and asset price analytics",
    long_about = None
)]
struct Cli {
    /// JSON runtime config; defaults are used when the file is missing
    #[arg(short, long, default_value = "runtime_config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the REST API
    Serve {
        /// Listen address (overrides config and DEPO_BIND_ADDR)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Fetch, transform and load daily bars for every configured symbol
    Etl {
        /// Days of history to fetch (overrides config and DEPO_LOOKBACK_DAYS)
        #[arg(short, long)]
        lookback_days: Option<u32>,
    },
    /// Write the effective configuration (file, defaults and DEPO_* overrides)
    /// to the --config path
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = RuntimeConfig::load(&cli.config).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides();

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            serve(config).await
        }
        Commands::Etl { lookback_days } => {
            if let Some(days) = lookback_days {
                config.lookback_days = days;
            }
            run_etl(config).await
        }
        Commands::InitConfig { force } => init_config(&config, &cli.config, force),
    }
}

async fn serve(config: RuntimeConfig) -> anyhow::Result<()> {
    info!("Starting Depo API...");

    // ── 2. Data sources ──────────────────────────────────────────────────
    let loader = Arc::new(CommodityLoader::new(&config.data_path));
    match loader.table().await {
        Ok(table) => info!(count = table.commodities.len(), "Data preload complete"),
        Err(e) => {
            error!(path = %loader.data_path().display(), error = %e, "Error preloading data");
            warn!("API will attempt to load data on first request");
        }
    }

    let prices = match Database::new(&config.database_url).await {
        Ok(db) => Some(PriceRepository::new(db.pool)),
        Err(e) => {
            warn!(error = %e, "Price database unavailable, asset endpoints disabled");
            None
        }
    };

    // ── 3. Shared state & router ─────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, loader, prices));
    let app = api::rest::router(state);

    // ── 4. Serve until Ctrl-C ────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("Shutting down Depo API...");
    Ok(())
}

async fn run_etl(config: RuntimeConfig) -> anyhow::Result<()> {
    info!(
        symbols = config.symbol_count(),
        lookback_days = config.lookback_days,
        "Starting ETL pipeline"
    );

    let db = Database::new(&config.database_url).await?;
    let source = Arc::new(QuoteClient::new(&config.quote_base_url)?);
    let pipeline = EtlPipeline::new(source, PriceRepository::new(db.pool.clone()));

    let today = chrono::Utc::now().date_naive();
    let report = pipeline
        .run(&config.symbols, config.lookback_days, today)
        .await?;

    for failure in &report.failed {
        warn!(symbol = %failure.symbol, error = %failure.error, "symbol failed");
    }
    info!(
        run_id = %report.run_id,
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        rows = report.rows_loaded,
        "ETL Pipeline execution completed"
    );

    db.pool.close().await;
    Ok(())
}

fn init_config(config: &RuntimeConfig, path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to replace it)", path.display());
    }
    config.save(path)?;
    info!(path = %path.display(), "Runtime config initialised");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}
