// =============================================================================
// Statistics Module
// =============================================================================
//
// Pure summary statistics over a single price series. Like the indicators,
// nothing here holds state between calls.

pub mod summary;
pub mod transforms;

pub use summary::{cagr, summarize, StatisticsSummary};
pub use transforms::{daily_returns, normalize, price_range, volume_stats, PriceRange, VolumeStats};
