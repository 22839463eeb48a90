// =============================================================================
// Commodity Loader — read-through cache over the annual price table
// =============================================================================
//
// The CSV has a `Year` column followed by one price column per commodity.
// Cells may be empty (no quote that year).
//
// The table is parsed once on first use and then served from memory. The
// loader is an ordinary value owned by `AppState`; callers share it by
// reference. Async callers go through `table()`, which parses on the
// blocking pool so a cache miss never stalls a runtime worker.
// =============================================================================

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::AnalyticsError;
use crate::indicators::from_nan_series;

const YEAR_COLUMN: &str = "Year";

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Parsed annual table. `prices[name][i]` belongs to `years[i]`.
#[derive(Debug, Clone, Default)]
pub struct CommodityTable {
    pub years: Vec<i32>,
    pub commodities: Vec<String>,
    prices: HashMap<String, Vec<Option<f64>>>,
}

impl CommodityTable {
    /// Parse a table from any CSV reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let headers = rdr.headers().context("failed to read CSV header")?.clone();
        let year_idx = headers
            .iter()
            .position(|h| h == YEAR_COLUMN)
            .with_context(|| format!("CSV has no '{YEAR_COLUMN}' column"))?;

        let commodities: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != year_idx)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut years = Vec::new();
        let mut raw: HashMap<&str, Vec<f64>> =
            commodities.iter().map(|c| (c.as_str(), Vec::new())).collect();

        for (line, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("malformed CSV record {}", line + 1))?;

            let year = match record.get(year_idx).and_then(parse_year) {
                Some(y) => y,
                None => {
                    warn!(line = line + 1, "skipping row without a valid year");
                    continue;
                }
            };
            years.push(year);

            for (idx, header) in headers.iter().enumerate() {
                if idx == year_idx {
                    continue;
                }
                if let Some(column) = raw.get_mut(header) {
                    column.push(record.get(idx).map_or(f64::NAN, parse_price));
                }
            }
        }

        let prices = raw
            .into_iter()
            .map(|(name, column)| (name.to_string(), from_nan_series(&column)))
            .collect();

        Ok(Self {
            years,
            commodities,
            prices,
        })
    }
}

fn parse_year(raw: &str) -> Option<i32> {
    raw.parse::<i32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|y| y.fract() == 0.0).map(|y| y as i32))
}

/// Empty, unparsable and non-finite cells all become the NaN marker.
fn parse_price(raw: &str) -> f64 {
    raw.parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .unwrap_or(f64::NAN)
}

fn in_range(year: i32, start: Option<i32>, end: Option<i32>) -> bool {
    start.map_or(true, |s| year >= s) && end.map_or(true, |e| year <= e)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommodityInfo {
    pub name: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub available_from: Option<i32>,
    pub available_to: Option<i32>,
    pub data_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub start_year: i32,
    pub end_year: i32,
    pub total_years: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub commodities: Vec<String>,
    pub years: Vec<i32>,
    pub data: HashMap<String, Vec<Option<f64>>>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl CommodityTable {
    fn column(&self, name: &str) -> Result<&[Option<f64>], AnalyticsError> {
        self.prices
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| AnalyticsError::UnknownCommodity(name.to_string()))
    }

    /// `(year, price)` points for one commodity within the optional year
    /// bounds (inclusive). Years without a price are dropped.
    pub fn series(
        &self,
        name: &str,
        start_year: Option<i32>,
        end_year: Option<i32>,
    ) -> Result<Vec<(i32, f64)>, AnalyticsError> {
        let column = self.column(name)?;
        Ok(self
            .years
            .iter()
            .zip(column)
            .filter(|(y, _)| in_range(**y, start_year, end_year))
            .filter_map(|(y, p)| p.map(|p| (*y, p)))
            .collect())
    }

    /// Side-by-side columns for several commodities. Missing prices stay as
    /// `None` so that all columns line up with `years`.
    pub fn compare(
        &self,
        names: &[String],
        start_year: Option<i32>,
        end_year: Option<i32>,
    ) -> Result<Comparison, AnalyticsError> {
        let columns = names
            .iter()
            .map(|n| self.column(n).map(|c| (n, c)))
            .collect::<Result<Vec<_>, _>>()?;

        let keep: Vec<usize> = self
            .years
            .iter()
            .enumerate()
            .filter(|(_, y)| in_range(**y, start_year, end_year))
            .map(|(i, _)| i)
            .collect();

        let data = columns
            .into_iter()
            .map(|(name, column)| (name.clone(), keep.iter().map(|&i| column[i]).collect()))
            .collect();

        Ok(Comparison {
            commodities: names.to_vec(),
            years: keep.iter().map(|&i| self.years[i]).collect(),
            data,
        })
    }

    pub fn date_range(&self) -> Result<DateRange, AnalyticsError> {
        match (self.years.iter().min(), self.years.iter().max()) {
            (Some(&start_year), Some(&end_year)) => Ok(DateRange {
                start_year,
                end_year,
                total_years: self.years.len(),
            }),
            _ => Err(AnalyticsError::invalid("dataset has no rows")),
        }
    }

    pub fn info(&self, name: &str) -> Result<CommodityInfo, AnalyticsError> {
        let points = self.series(name, None, None)?;
        Ok(CommodityInfo {
            name: name.to_string(),
            category: None,
            unit: None,
            available_from: points.iter().map(|(y, _)| *y).min(),
            available_to: points.iter().map(|(y, _)| *y).max(),
            data_points: points.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// CommodityLoader
// ---------------------------------------------------------------------------

pub struct CommodityLoader {
    data_path: PathBuf,
    cache: RwLock<Option<Arc<CommodityTable>>>,
}

impl CommodityLoader {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            cache: RwLock::new(None),
        }
    }

    /// Loader whose cache is already populated.
    #[cfg(test)]
    pub fn with_table(table: CommodityTable) -> Self {
        Self {
            data_path: PathBuf::new(),
            cache: RwLock::new(Some(Arc::new(table))),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    fn cached(&self) -> Option<Arc<CommodityTable>> {
        self.cache.read().as_ref().map(Arc::clone)
    }

    /// The cached table. A miss reads the CSV on the blocking pool.
    pub async fn table(self: &Arc<Self>) -> Result<Arc<CommodityTable>> {
        if let Some(table) = self.cached() {
            return Ok(table);
        }
        let loader = Arc::clone(self);
        tokio::task::spawn_blocking(move || loader.load())
            .await
            .context("commodity loader task failed")?
    }

    /// Blocking read-through: returns the cached table, reading the CSV on
    /// first use.
    fn load(&self) -> Result<Arc<CommodityTable>> {
        if let Some(table) = self.cached() {
            return Ok(table);
        }

        let mut slot = self.cache.write();
        // Another caller may have filled the cache while we waited.
        if let Some(table) = slot.as_ref() {
            return Ok(Arc::clone(table));
        }

        info!(path = %self.data_path.display(), "loading commodity data");
        let file = std::fs::File::open(&self.data_path)
            .inspect_err(|e| {
                error!(path = %self.data_path.display(), error = %e, "data file not found")
            })
            .with_context(|| format!("failed to open {}", self.data_path.display()))?;
        let table = Arc::new(CommodityTable::from_reader(file)?);
        info!(
            rows = table.years.len(),
            commodities = table.commodities.len(),
            "commodity data loaded"
        );

        *slot = Some(Arc::clone(&table));
        Ok(table)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Year,Gold,Silver,Copper
2018,1268.5,15.7,
2019,1392.6,16.2,6000
2020,1769.6,,6180
2021,1798.6,25.1,9317
";

    fn table() -> CommodityTable {
        CommodityTable::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn parses_header_and_rows() {
        let table = table();
        assert_eq!(table.years, vec![2018, 2019, 2020, 2021]);
        assert_eq!(table.commodities, vec!["Gold", "Silver", "Copper"]);
        assert_eq!(table.prices["Copper"][0], None);
        assert_eq!(table.prices["Silver"][2], None);
    }

    #[test]
    fn missing_year_column_is_an_error() {
        assert!(CommodityTable::from_reader("Date,Gold\n2020,1\n".as_bytes()).is_err());
    }

    #[test]
    fn float_years_are_accepted() {
        let table = CommodityTable::from_reader("Year,Gold\n2020.0,1\n".as_bytes()).unwrap();
        assert_eq!(table.years, vec![2020]);
    }

    #[test]
    fn series_drops_missing_prices_and_filters_years() {
        let t = table();
        let silver = t.series("Silver", None, None).unwrap();
        assert_eq!(silver, vec![(2018, 15.7), (2019, 16.2), (2021, 25.1)]);

        let gold = t.series("Gold", Some(2019), Some(2020)).unwrap();
        assert_eq!(gold, vec![(2019, 1392.6), (2020, 1769.6)]);
    }

    #[test]
    fn unknown_commodity_is_typed_error() {
        assert_eq!(
            table().series("Platinum", None, None),
            Err(AnalyticsError::UnknownCommodity("Platinum".into()))
        );
    }

    #[test]
    fn compare_keeps_missing_as_none() {
        let names = vec!["Silver".to_string(), "Copper".to_string()];
        let cmp = table().compare(&names, Some(2019), None).unwrap();
        assert_eq!(cmp.years, vec![2019, 2020, 2021]);
        assert_eq!(cmp.data["Silver"], vec![Some(16.2), None, Some(25.1)]);
        assert_eq!(cmp.data["Copper"], vec![Some(6000.0), Some(6180.0), Some(9317.0)]);
    }

    #[test]
    fn compare_rejects_unknown_name() {
        let names = vec!["Gold".to_string(), "Unobtainium".to_string()];
        assert!(table().compare(&names, None, None).is_err());
    }

    #[test]
    fn date_range_and_info() {
        let t = table();
        let range = t.date_range().unwrap();
        assert_eq!(range.start_year, 2018);
        assert_eq!(range.end_year, 2021);
        assert_eq!(range.total_years, 4);

        let info = t.info("Copper").unwrap();
        assert_eq!(info.available_from, Some(2019));
        assert_eq!(info.available_to, Some(2021));
        assert_eq!(info.data_points, 3);
    }

    #[test]
    fn non_finite_cells_are_missing() {
        let t = CommodityTable::from_reader("Year,Gold\n2019,inf\n2020,NaN\n2021,5\n".as_bytes())
            .unwrap();
        assert_eq!(t.series("Gold", None, None).unwrap(), vec![(2021, 5.0)]);
    }

    #[test]
    fn empty_table_has_no_date_range() {
        let t = CommodityTable::from_reader("Year,Gold\n".as_bytes()).unwrap();
        assert!(matches!(t.date_range(), Err(AnalyticsError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn read_through_cache_reads_file_once() {
        let path = std::env::temp_dir().join(format!("depo-{}.csv", uuid::Uuid::new_v4()));
        std::fs::write(&path, SAMPLE).unwrap();

        let l = Arc::new(CommodityLoader::new(&path));
        let first = l.table().await.unwrap();
        assert_eq!(first.commodities.len(), 3);

        // Served from memory after the first read.
        std::fs::remove_file(&path).unwrap();
        let second = l.table().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let l = Arc::new(CommodityLoader::new("/definitely/not/here.csv"));
        assert!(l.table().await.is_err());
        assert!(l.cached().is_none());
    }
}
