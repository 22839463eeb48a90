// =============================================================================
// Runtime Configuration — layered service settings
// =============================================================================
//
// Settings come from three layers, later layers winning:
//   1. built-in defaults (every field carries `#[serde(default)]`)
//   2. an optional JSON file
//   3. `DEPO_*` environment variables (a `.env` file is read first)
//
// `depo init-config` writes the merged result back to disk.
// =============================================================================

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::market_data::quotes::DEFAULT_BASE_URL;

pub const ENV_BIND_ADDR: &str = "DEPO_BIND_ADDR";
pub const ENV_DATA_PATH: &str = "DEPO_DATA_PATH";
pub const ENV_DATABASE_URL: &str = "DEPO_DATABASE_URL";
pub const ENV_LOOKBACK_DAYS: &str = "DEPO_LOOKBACK_DAYS";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_data_path() -> String {
    "Database/data/commodity_prices.csv".to_string()
}

fn default_database_url() -> String {
    "sqlite://data/depo.db".to_string()
}

fn default_lookback_days() -> u32 {
    365
}

fn default_quote_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn to_strings(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

fn default_symbols() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        ("US".to_string(), to_strings(&["AAPL", "GOOGL", "MSFT", "TSLA", "AMZN"])),
        (
            "Turkish".to_string(),
            to_strings(&["THYAO.IS", "SISE.IS", "KCHOL.IS", "GARAN.IS", "AKBNK.IS"]),
        ),
        ("Metals".to_string(), to_strings(&["GC=F", "SI=F", "CL=F"])),
        ("Currency".to_string(), to_strings(&["EURUSD=X", "GBPUSD=X", "USDTRY=X"])),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Address the REST server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Annual commodity CSV served by the REST API.
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// SQLite URL used by the ETL pipeline.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Days of history fetched per symbol on each ETL run.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    #[serde(default = "default_quote_base_url")]
    pub quote_base_url: String,

    /// ETL symbols keyed by category. The category also decides the stored
    /// asset type.
    #[serde(default = "default_symbols")]
    pub symbols: BTreeMap<String, Vec<String>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_path: default_data_path(),
            database_url: default_database_url(),
            lookback_days: default_lookback_days(),
            quote_base_url: default_quote_base_url(),
            symbols: default_symbols(),
        }
    }
}

impl RuntimeConfig {
    /// Read the JSON file at `path`. A missing file is an error; `main`
    /// falls back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("cannot open runtime config {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid runtime config in {}", path.display()))?;

        info!(
            path = %path.display(),
            data_path = %config.data_path,
            symbols = config.symbol_count(),
            "runtime config loaded"
        );
        Ok(config)
    }

    /// Write the settings to `path`, creating parent directories. The target
    /// is replaced by a single rename of a staged sibling file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create config directory {}", dir.display()))?;
        }

        let mut json =
            serde_json::to_vec_pretty(self).context("runtime config is not serialisable")?;
        json.push(b'\n');

        let staging = staging_path(path);
        std::fs::write(&staging, &json)
            .with_context(|| format!("cannot write {}", staging.display()))?;
        std::fs::rename(&staging, path)
            .with_context(|| format!("cannot move config into place at {}", path.display()))?;

        info!(path = %path.display(), symbols = self.symbol_count(), "runtime config written");
        Ok(())
    }

    /// Apply `DEPO_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Empty values are
    /// ignored; an unparsable lookback is ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_BIND_ADDR) {
            self.bind_addr = v;
        }
        if let Some(v) = get(ENV_DATA_PATH) {
            self.data_path = v;
        }
        if let Some(v) = get(ENV_DATABASE_URL) {
            self.database_url = v;
        }
        if let Some(v) = get(ENV_LOOKBACK_DAYS) {
            match v.trim().parse() {
                Ok(days) => self.lookback_days = days,
                Err(_) => warn!(key = ENV_LOOKBACK_DAYS, value = %v, "ignoring invalid override"),
            }
        }
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.values().map(Vec::len).sum()
    }
}

/// Sibling file the config is staged in before the rename.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
