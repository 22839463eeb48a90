// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Commodity endpoints read the annual CSV through the shared loader. Asset
// endpoints read the SQLite store filled by the ETL pipeline and answer 503
// when no database is configured.
//
// CORS is permissive; the service is read-only.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use super::error::ApiError;
use crate::app_state::AppState;
use crate::indicators::{CrossSignal, IndicatorRow, IndicatorSet};
use crate::market_data::{CommodityInfo, Comparison, DateRange};
use crate::persistence::{HistoricalRow, LatestPrice, PriceRepository};
use crate::statistics::{
    cagr, daily_returns, normalize, price_range, summarize, volume_stats, PriceRange,
    StatisticsSummary, VolumeStats,
};
use crate::types::{EtlJobLog, PriceBar};

type ApiResult<T> = Result<Json<T>, ApiError>;

const DEFAULT_HISTORY_DAYS: u32 = 90;
const DEFAULT_LOG_LIMIT: u32 = 20;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/date-range", get(date_range))
        // ── Annual commodity table ──────────────────────────────────
        .route("/api/commodities", get(commodities))
        .route("/api/commodities/compare", get(compare))
        .route("/api/commodities/:name/info", get(commodity_info))
        .route("/api/commodities/:name/history", get(commodity_history))
        .route("/api/commodities/:name/indicators", get(commodity_indicators))
        .route("/api/commodities/:name/analysis", get(commodity_analysis))
        .route("/api/stats/:name", get(commodity_stats))
        // ── Daily asset store ───────────────────────────────────────
        .route("/api/assets/latest", get(latest_prices))
        .route("/api/assets/:symbol/history", get(asset_history))
        .route("/api/assets/:symbol/summary", get(asset_summary))
        .route("/api/assets/:symbol/golden-cross", get(golden_cross))
        .route("/api/etl/logs", get(etl_logs))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Query parameters
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct YearRange {
    start_year: Option<i32>,
    end_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct CompareQuery {
    names: Option<String>,
    start_year: Option<i32>,
    end_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisQuery {
    start_year: Option<i32>,
    end_year: Option<i32>,
    base_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct DaysQuery {
    days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SymbolsQuery {
    symbols: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LimitQuery {
    limit: Option<u32>,
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Service info
// =============================================================================

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Depo API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Historical commodity and stock price data API",
        "health": "/api/health",
        "endpoints": {
            "commodities": "/api/commodities",
            "info": "/api/commodities/{name}/info",
            "history": "/api/commodities/{name}/history",
            "indicators": "/api/commodities/{name}/indicators",
            "analysis": "/api/commodities/{name}/analysis",
            "compare": "/api/commodities/compare?names=Gold,Silver",
            "statistics": "/api/stats/{name}",
            "date_range": "/api/date-range",
            "latest_prices": "/api/assets/latest?symbols=AAPL,GC=F",
            "asset_history": "/api/assets/{symbol}/history?days=90",
            "asset_summary": "/api/assets/{symbol}/summary?days=90",
            "golden_cross": "/api/assets/{symbol}/golden-cross?days=90",
            "etl_logs": "/api/etl/logs"
        }
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    version: &'static str,
    uptime_seconds: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
    })
}

async fn date_range(State(state): State<Arc<AppState>>) -> ApiResult<DateRange> {
    Ok(Json(state.loader.table().await?.date_range()?))
}

// =============================================================================
// Commodities
// =============================================================================

async fn commodities(State(state): State<Arc<AppState>>) -> ApiResult<Vec<String>> {
    Ok(Json(state.loader.table().await?.commodities.clone()))
}

async fn commodity_info(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<CommodityInfo> {
    Ok(Json(state.loader.table().await?.info(&name)?))
}

#[derive(Serialize)]
struct PricePoint {
    year: i32,
    price: f64,
}

#[derive(Serialize)]
struct PriceHistory {
    commodity: String,
    data: Vec<PricePoint>,
    count: usize,
}

async fn commodity_history(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(range): Query<YearRange>,
) -> ApiResult<PriceHistory> {
    let data: Vec<PricePoint> = state
        .loader
        .table()
        .await?
        .series(&name, range.start_year, range.end_year)?
        .into_iter()
        .map(|(year, price)| PricePoint { year, price })
        .collect();

    debug!(commodity = %name, count = data.len(), "history served");
    Ok(Json(PriceHistory {
        commodity: name,
        count: data.len(),
        data,
    }))
}

async fn compare(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CompareQuery>,
) -> ApiResult<Comparison> {
    let names = q.names.as_deref().map(split_list).unwrap_or_default();
    if names.len() < 2 {
        return Err(ApiError::BadRequest(
            "Please provide at least 2 commodities to compare".to_string(),
        ));
    }
    let table = state.loader.table().await?;
    Ok(Json(table.compare(&names, q.start_year, q.end_year)?))
}

#[derive(Serialize)]
struct IndicatorPoint {
    year: i32,
    price: f64,
    #[serde(flatten)]
    values: IndicatorRow,
}

#[derive(Serialize)]
struct IndicatorResponse {
    commodity: String,
    count: usize,
    data: Vec<IndicatorPoint>,
}

async fn commodity_indicators(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(range): Query<YearRange>,
) -> ApiResult<IndicatorResponse> {
    let table = state.loader.table().await?;
    let points = table.series(&name, range.start_year, range.end_year)?;
    let closes: Vec<f64> = points.iter().map(|(_, p)| *p).collect();

    // Close-only table: high and low collapse onto the close.
    let set = IndicatorSet::from_columns(&closes, &closes, &closes);

    let data: Vec<IndicatorPoint> = points
        .into_iter()
        .zip(set.rows)
        .map(|((year, price), values)| IndicatorPoint {
            year,
            price,
            values,
        })
        .collect();

    Ok(Json(IndicatorResponse {
        commodity: name,
        count: data.len(),
        data,
    }))
}

#[derive(Serialize)]
struct AnalysisPoint {
    year: i32,
    price: f64,
    change_pct: f64,
    normalized: f64,
}

#[derive(Serialize)]
struct AnalysisResponse {
    commodity: String,
    base_year: Option<i32>,
    cagr_pct: f64,
    data: Vec<AnalysisPoint>,
}

async fn commodity_analysis(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(q): Query<AnalysisQuery>,
) -> ApiResult<AnalysisResponse> {
    let table = state.loader.table().await?;
    let points = table.series(&name, q.start_year, q.end_year)?;
    let closes: Vec<f64> = points.iter().map(|(_, p)| *p).collect();

    let changes = daily_returns(&closes);
    let normalized = normalize(&points, q.base_year.as_ref())?;

    let cagr_pct = match (points.first(), points.last()) {
        (Some((y0, p0)), Some((y1, p1))) => cagr(*p0, *p1, f64::from(y1 - y0)),
        _ => 0.0,
    };

    let data = points
        .iter()
        .zip(changes)
        .zip(normalized)
        .map(|((&(year, price), change_pct), normalized)| AnalysisPoint {
            year,
            price,
            change_pct,
            normalized,
        })
        .collect();

    Ok(Json(AnalysisResponse {
        commodity: name,
        base_year: q.base_year.or_else(|| points.first().map(|(y, _)| *y)),
        cagr_pct,
        data,
    }))
}

#[derive(Serialize)]
struct CommodityStatistics {
    commodity: String,
    #[serde(flatten)]
    summary: StatisticsSummary<i32>,
}

async fn commodity_stats(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(range): Query<YearRange>,
) -> ApiResult<CommodityStatistics> {
    let table = state.loader.table().await?;
    let points = table.series(&name, range.start_year, range.end_year)?;
    if points.is_empty() {
        return Err(ApiError::NotFound(format!("No data found for {name}")));
    }

    let summary = summarize(&points)?;
    Ok(Json(CommodityStatistics {
        commodity: name,
        summary,
    }))
}

// =============================================================================
// Daily asset store
// =============================================================================

fn repository(state: &AppState) -> Result<&PriceRepository, ApiError> {
    state
        .prices
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("price database is not configured".to_string()))
}

/// First date of a `days`-long window ending today.
fn since(days: Option<u32>) -> Result<NaiveDate, ApiError> {
    let days = days.unwrap_or(DEFAULT_HISTORY_DAYS);
    Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| {
            ApiError::BadRequest(format!("days={days} reaches past the earliest supported date"))
        })
}

async fn latest_prices(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SymbolsQuery>,
) -> ApiResult<Vec<LatestPrice>> {
    let repo = repository(&state)?;
    let symbols = match q.symbols.as_deref().map(split_list) {
        Some(list) if !list.is_empty() => list,
        _ => state.config.symbols.values().flatten().cloned().collect(),
    };
    Ok(Json(repo.latest_prices(&symbols).await?))
}

#[derive(Serialize)]
struct AssetHistory {
    symbol: String,
    count: usize,
    data: Vec<HistoricalRow>,
}

async fn asset_history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(q): Query<DaysQuery>,
) -> ApiResult<AssetHistory> {
    let repo = repository(&state)?;
    let data = repo.historical(&symbol, since(q.days)?).await?;
    Ok(Json(AssetHistory {
        symbol,
        count: data.len(),
        data,
    }))
}

#[derive(Serialize)]
struct AssetSummary {
    symbol: String,
    statistics: StatisticsSummary<NaiveDate>,
    price_range: Option<PriceRange>,
    volume: VolumeStats,
}

async fn asset_summary(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(q): Query<DaysQuery>,
) -> ApiResult<AssetSummary> {
    let repo = repository(&state)?;
    let bars: Vec<PriceBar> = repo
        .historical(&symbol, since(q.days)?)
        .await?
        .into_iter()
        .map(|row| row.bar)
        .collect();
    if bars.is_empty() {
        return Err(ApiError::NotFound(format!("No data found for {symbol}")));
    }

    let points: Vec<(NaiveDate, f64)> = bars.iter().map(|b| (b.date, b.close)).collect();
    Ok(Json(AssetSummary {
        symbol,
        statistics: summarize(&points)?,
        price_range: price_range(&bars),
        volume: volume_stats(&bars),
    }))
}

#[derive(Serialize)]
struct GoldenCrossResponse {
    symbol: String,
    signal: Option<CrossSignal<NaiveDate>>,
}

async fn golden_cross(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(q): Query<DaysQuery>,
) -> ApiResult<GoldenCrossResponse> {
    let repo = repository(&state)?;
    let signal = repo.golden_cross(&symbol, since(q.days)?).await?;
    if let Some(s) = &signal {
        info!(%symbol, date = %s.at, "golden cross detected");
    }
    Ok(Json(GoldenCrossResponse { symbol, signal }))
}

async fn etl_logs(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LimitQuery>,
) -> ApiResult<Vec<EtlJobLog>> {
    let repo = repository(&state)?;
    let limit = q.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    Ok(Json(repo.recent_etl_logs(limit).await?))
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::loader::CommodityTable;
    use crate::market_data::CommodityLoader;
    use crate::persistence::{Database, NewAsset};
    use crate::runtime_config::RuntimeConfig;
    use crate::types::AssetType;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use serde_json::Value;
    use tower::ServiceExt;

    const SAMPLE: &str = "\
Year,Gold,Silver,Copper
2018,1000,15,
2019,1100,16,6000
2020,1210,,6180
2021,1331,25,9317
";

    fn state_with(prices: Option<PriceRepository>) -> Arc<AppState> {
        let table = CommodityTable::from_reader(SAMPLE.as_bytes()).unwrap();
        Arc::new(AppState::new(
            RuntimeConfig::default(),
            Arc::new(CommodityLoader::with_table(table)),
            prices,
        ))
    }

    async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
        let resp = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn root_and_health() {
        let (status, body) = get(state_with(None), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Depo API");

        let (status, body) = get(state_with(None), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn lists_commodities_and_range() {
        let (status, body) = get(state_with(None), "/api/commodities").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!(["Gold", "Silver", "Copper"]));

        let (_, body) = get(state_with(None), "/api/date-range").await;
        assert_eq!(body["start_year"], 2018);
        assert_eq!(body["end_year"], 2021);
        assert_eq!(body["total_years"], 4);
    }

    #[tokio::test]
    async fn history_filters_years() {
        let (status, body) =
            get(state_with(None), "/api/commodities/Silver/history?start_year=2019").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["commodity"], "Silver");
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"][0]["year"], 2019);
        assert_eq!(body["data"][1]["price"], 25.0);
    }

    #[tokio::test]
    async fn unknown_commodity_is_404_with_error_body() {
        let (status, body) = get(state_with(None), "/api/commodities/Unobtainium/info").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Resource not found");
        assert!(body["detail"].as_str().unwrap().contains("Unobtainium"));
    }

    #[tokio::test]
    async fn compare_needs_two_names() {
        let (status, body) = get(state_with(None), "/api/commodities/compare?names=Gold").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("at least 2"));

        let (status, _) = get(state_with(None), "/api/commodities/compare").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn compare_keeps_nulls() {
        let (status, body) =
            get(state_with(None), "/api/commodities/compare?names=Gold,%20Silver").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["years"], serde_json::json!([2018, 2019, 2020, 2021]));
        assert_eq!(body["data"]["Silver"][2], Value::Null);

        let (status, _) =
            get(state_with(None), "/api/commodities/compare?names=Gold,Nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stats_summary() {
        let (status, body) = get(state_with(None), "/api/stats/Gold").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["commodity"], "Gold");
        assert_eq!(body["min_price"], 1000.0);
        assert_eq!(body["min_timestamp"], 2018);
        assert_eq!(body["max_timestamp"], 2021);

        let (status, body) =
            get(state_with(None), "/api/stats/Copper?start_year=2030").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().contains("No data found"));
    }

    #[tokio::test]
    async fn indicators_are_aligned_with_years() {
        let (status, body) = get(state_with(None), "/api/commodities/Gold/indicators").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 4);
        assert_eq!(body["data"][3]["year"], 2021);
        assert_eq!(body["data"][0]["sma_20"], Value::Null);
        assert_eq!(body["data"][0]["ema_12"], 1000.0);
    }

    #[tokio::test]
    async fn analysis_rebases_and_reports_cagr() {
        let (status, body) =
            get(state_with(None), "/api/commodities/Gold/analysis?base_year=2019").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["base_year"], 2019);
        assert_eq!(body["data"][1]["normalized"], 100.0);
        assert_eq!(body["data"][0]["change_pct"], 0.0);
        let cagr = body["cagr_pct"].as_f64().unwrap();
        assert!((cagr - 10.0).abs() < 1e-6);

        let (status, _) =
            get(state_with(None), "/api/commodities/Gold/analysis?base_year=1900").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn asset_routes_without_database_are_503() {
        let (status, body) = get(state_with(None), "/api/assets/latest").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Service unavailable");
    }

    #[tokio::test]
    async fn oversized_day_window_is_rejected() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let state = state_with(Some(PriceRepository::new(db.pool)));

        for route in ["history", "summary", "golden-cross"] {
            let uri = format!("/api/assets/AAPL/{route}?days=4000000000");
            let (status, body) = get(state.clone(), &uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{route}");
            assert!(body["detail"].as_str().unwrap().contains("days=4000000000"));
        }

        let (status, _) = get(state, "/api/assets/AAPL/history?days=36500").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn asset_routes_read_the_store() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let repo = PriceRepository::new(db.pool);
        let id = repo
            .ensure_asset(&NewAsset {
                symbol: "AAPL",
                asset_name: "AAPL",
                asset_type: AssetType::Stock,
                market: None,
                currency: "USD",
                sector: Some("US"),
            })
            .await
            .unwrap();
        let today = Utc::now().date_naive();
        let bars: Vec<PriceBar> = (0..5)
            .map(|i| {
                let c = 100.0 + i as f64;
                PriceBar::new(today - Duration::days(4 - i), c, c + 2.0, c - 2.0, c)
                    .with_volume(1_000 + i as u64)
            })
            .collect();
        repo.upsert_daily_prices(id, &bars).await.unwrap();

        let state = state_with(Some(repo));

        let (status, body) = get(state.clone(), "/api/assets/latest?symbols=AAPL").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["symbol"], "AAPL");
        assert_eq!(body[0]["close"], 104.0);

        let (_, body) = get(state.clone(), "/api/assets/AAPL/history?days=2").await;
        assert_eq!(body["count"], 3);

        let (status, body) = get(state.clone(), "/api/assets/AAPL/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["statistics"]["mean"], 102.0);
        assert_eq!(body["price_range"]["total_range"], 8.0);
        assert_eq!(body["volume"]["max_volume"], 1004);

        let (status, _) = get(state.clone(), "/api/assets/MSFT/summary").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get(state.clone(), "/api/assets/AAPL/golden-cross").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["signal"], Value::Null);

        let (status, body) = get(state, "/api/etl/logs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }
}
