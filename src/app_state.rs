// =============================================================================
// Central Application State — Depo analytics service
// =============================================================================
//
// Shared across all request handlers via `Arc<AppState>`. The commodity
// loader owns its own read-through cache; the price repository is present
// only when the SQLite database could be opened.
// =============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::market_data::CommodityLoader;
use crate::persistence::PriceRepository;
use crate::runtime_config::RuntimeConfig;

pub struct AppState {
    pub config: RuntimeConfig,
    pub loader: Arc<CommodityLoader>,
    pub prices: Option<PriceRepository>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        loader: Arc<CommodityLoader>,
        prices: Option<PriceRepository>,
    ) -> Self {
        Self {
            config,
            loader,
            prices,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
