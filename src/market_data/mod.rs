pub mod loader;
pub mod quotes;

pub use loader::{CommodityInfo, CommodityLoader, Comparison, DateRange};
pub use quotes::{QuoteClient, QuoteSource};
