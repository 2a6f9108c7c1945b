// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
//   GET /get_stock_data?ticker=<symbol>&days=<int>
//   GET /health
//
// CORS is fully permissive: the dashboard frontend is served from another
// origin and no endpoint carries credentials.
// =============================================================================

use axum::{
    extract::{rejection::QueryRejection, Json, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::analysis::StockAnalysis;
use crate::api::error::ApiError;
use crate::api::response::StockDataResponse;
use crate::app_state::AppState;
use crate::config::ServerConfig;
use crate::types::PriceSeries;

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST router with CORS and request tracing.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/get_stock_data", get(get_stock_data))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Stock data
// =============================================================================

/// Raw query string. `days` stays a string so a bad value is reported as
/// `InvalidDays` with the caller's text.
#[derive(Debug, Default, Deserialize)]
pub struct StockDataParams {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub days: Option<String>,
}

/// A validated request: symbol plus the half-open window to fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct StockRequest {
    pub symbol: String,
    pub days: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl StockRequest {
    /// Apply defaults and validate. The window ends at `now` and starts `days`
    /// calendar days earlier.
    pub fn resolve(
        params: &StockDataParams,
        config: &ServerConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, ApiError> {
        let symbol = params
            .ticker
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(config.default_ticker.as_str())
            .to_string();

        let days = match params.days.as_deref() {
            None => config.default_days,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(days) if days > 0 => days,
                _ => return Err(ApiError::InvalidDays(raw.to_string())),
            },
        };

        let start = now
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| ApiError::InvalidDays(days.to_string()))?;

        Ok(Self {
            symbol,
            days,
            start,
            end: now,
        })
    }
}

async fn get_stock_data(
    State(state): State<AppState>,
    query: Result<Query<StockDataParams>, QueryRejection>,
) -> Result<Json<StockDataResponse>, ApiError> {
    let Query(params) = query.map_err(|rejection| ApiError::InvalidQuery(rejection.body_text()))?;
    let request = StockRequest::resolve(&params, &state.config, Utc::now())?;

    match load_stock_data(&state, &request).await {
        Ok(response) => {
            info!(
                symbol = %request.symbol,
                days = request.days,
                rows = response.dates.len(),
                "stock data served"
            );
            Ok(Json(response))
        }
        Err(err) => {
            match &err {
                ApiError::NotFound { symbol } => {
                    warn!(symbol = %symbol, "no data found");
                }
                ApiError::MissingClose { symbol } => {
                    error!(symbol = %symbol, "close column missing from provider data");
                }
                ApiError::Unclassified { symbol, source } => {
                    error!(symbol = %symbol, error = %source, "error fetching data");
                }
                ApiError::InvalidDays(_) | ApiError::InvalidQuery(_) => {}
            }
            Err(err)
        }
    }
}

/// Fetch → coerce → compute → serialize for one validated request.
async fn load_stock_data(
    state: &AppState,
    request: &StockRequest,
) -> Result<StockDataResponse, ApiError> {
    let symbol = &request.symbol;

    let table = state
        .provider
        .fetch_daily(symbol, request.start, request.end)
        .await
        .map_err(|source| ApiError::Unclassified {
            symbol: symbol.clone(),
            source,
        })?;

    if table.is_empty() {
        return Err(ApiError::NotFound {
            symbol: symbol.clone(),
        });
    }

    let cells = table.close.as_deref().ok_or_else(|| ApiError::MissingClose {
        symbol: symbol.clone(),
    })?;

    let series = PriceSeries::from_cells(&table.dates, cells);
    let analysis = StockAnalysis::compute(&series).ok_or_else(|| ApiError::NotFound {
        symbol: symbol.clone(),
    })?;

    Ok(StockDataResponse::from_analysis(&analysis))
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::{Datelike, NaiveDate, TimeZone, Weekday};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::market_data::{HistoryTable, PriceProvider, ProviderError};

    /// In-memory provider that records each call and answers with a canned
    /// table or failure.
    struct StubProvider {
        reply: Result<HistoryTable, String>,
        calls: Mutex<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>,
    }

    impl StubProvider {
        fn with_table(table: HistoryTable) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(table),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(reason.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PriceProvider for StubProvider {
        async fn fetch_daily(
            &self,
            symbol: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<HistoryTable, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((symbol.to_string(), start, end));
            self.reply.clone().map_err(ProviderError::Api)
        }
    }

    /// One year of weekday closes starting 2024-01-01, gently oscillating.
    fn year_of_weekdays() -> HistoryTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut dates = Vec::new();
        let mut close = Vec::new();
        for offset in 0..365 {
            let date = start + Duration::days(offset);
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }
            let i = dates.len() as f64;
            dates.push(date);
            close.push(json!(180.0 + (i * 0.3).sin() * 12.0 + i * 0.05));
        }
        HistoryTable {
            dates,
            close: Some(close),
        }
    }

    fn app(provider: Arc<StubProvider>) -> Router {
        router(AppState::new(ServerConfig::default(), provider))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn floats(value: &Value) -> Vec<Option<f64>> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(Value::as_f64)
            .collect()
    }

    // ---- StockRequest::resolve -------------------------------------------

    #[test]
    fn resolve_applies_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let req =
            StockRequest::resolve(&StockDataParams::default(), &ServerConfig::default(), now)
                .unwrap();
        assert_eq!(req.symbol, "AAPL");
        assert_eq!(req.days, 365);
        assert_eq!(req.end, now);
        assert_eq!(req.start, now - Duration::days(365));
    }

    #[test]
    fn resolve_trims_ticker_and_keeps_its_case() {
        let params = StockDataParams {
            ticker: Some("  nbcc.ns ".into()),
            days: Some("30".into()),
        };
        let req = StockRequest::resolve(&params, &ServerConfig::default(), Utc::now()).unwrap();
        assert_eq!(req.symbol, "nbcc.ns");
        assert_eq!(req.days, 30);
    }

    #[test]
    fn resolve_blank_ticker_uses_default() {
        let params = StockDataParams {
            ticker: Some("   ".into()),
            days: None,
        };
        let req = StockRequest::resolve(&params, &ServerConfig::default(), Utc::now()).unwrap();
        assert_eq!(req.symbol, "AAPL");
    }

    #[test]
    fn resolve_rejects_bad_days() {
        for raw in ["0", "-5", "abc", "1.5", ""] {
            let params = StockDataParams {
                ticker: None,
                days: Some(raw.into()),
            };
            let err = StockRequest::resolve(&params, &ServerConfig::default(), Utc::now())
                .unwrap_err();
            assert!(matches!(err, ApiError::InvalidDays(_)), "accepted {raw:?}");
        }
    }

    // ---- /get_stock_data -------------------------------------------------

    #[tokio::test]
    async fn full_year_response_is_consistent() {
        let provider = StubProvider::with_table(year_of_weekdays());
        let (status, body) = get(app(provider.clone()), "/get_stock_data?ticker=AAPL&days=365").await;
        assert_eq!(status, StatusCode::OK);

        let dates: Vec<&str> = body["dates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d.as_str().unwrap())
            .collect();
        let prices = floats(&body["prices"]);
        let sma20 = floats(&body["sma20"]);
        let rsi14 = floats(&body["rsi14"]);

        assert_eq!(dates.len(), 261);
        assert_eq!(prices.len(), dates.len());
        assert_eq!(sma20.len(), dates.len());
        assert_eq!(rsi14.len(), dates.len());
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(dates[0], "2024-01-01");

        assert!(sma20[..19].iter().all(Option::is_none));
        assert!(sma20[19..].iter().all(Option::is_some));
        assert!(rsi14[..14].iter().all(Option::is_none));
        for v in rsi14[14..].iter().flatten() {
            assert!((0.0..=100.0).contains(v));
        }

        let closes: Vec<f64> = prices.iter().flatten().copied().collect();
        let tail = &closes[closes.len() - 30..];
        let expected_avg = tail.iter().sum::<f64>() / 30.0;
        let avg = body["avg_close_30_days"].as_f64().unwrap();
        assert!((avg - expected_avg).abs() < 1e-9);

        let high = body["52_week_high"].as_f64().unwrap();
        let low = body["52_week_low"].as_f64().unwrap();
        assert!(closes.iter().all(|&c| c <= high && c >= low));
        assert_eq!(body["last_close"].as_f64().unwrap(), *closes.last().unwrap());

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "AAPL");
        assert_eq!(calls[0].2 - calls[0].1, Duration::days(365));
    }

    #[tokio::test]
    async fn empty_result_is_404_naming_symbol() {
        let provider = StubProvider::with_table(HistoryTable::empty());
        let (status, body) = get(app(provider), "/get_stock_data?ticker=ZZZZ").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("ZZZZ"));
    }

    #[tokio::test]
    async fn not_found_message_uses_callers_spelling() {
        let provider = StubProvider::with_table(HistoryTable::empty());
        let (status, body) = get(app(provider.clone()), "/get_stock_data?ticker=zzzz").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let msg = body["error"].as_str().unwrap();
        assert!(msg.starts_with("No data found for zzzz."), "{msg}");
        assert_eq!(provider.calls.lock().unwrap()[0].0, "zzzz");
    }

    #[tokio::test]
    async fn missing_close_column_is_500() {
        let mut table = year_of_weekdays();
        table.close = None;
        let (status, body) = get(app(StubProvider::with_table(table)), "/get_stock_data").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Close price column not found in fetched data.");
    }

    #[tokio::test]
    async fn provider_failure_is_500_with_reason() {
        let provider = StubProvider::failing("upstream exploded");
        let (status, body) = get(app(provider), "/get_stock_data?ticker=msft").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let msg = body["error"].as_str().unwrap();
        assert!(msg.starts_with("Failed to fetch data for msft:"));
        assert!(msg.contains("upstream exploded"));
    }

    #[tokio::test]
    async fn invalid_days_is_400_without_fetch() {
        let provider = StubProvider::with_table(year_of_weekdays());
        let (status, body) = get(app(provider.clone()), "/get_stock_data?days=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("abc"));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_query_is_400_json_without_fetch() {
        let provider = StubProvider::with_table(year_of_weekdays());
        let (status, body) = get(app(provider.clone()), "/get_stock_data?days=1&days=2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let msg = body["error"].as_str().unwrap();
        assert!(msg.starts_with("Invalid query string:"), "{msg}");
        assert!(msg.contains("days"), "{msg}");
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_numeric_closes_drop_from_all_arrays() {
        let mut table = year_of_weekdays();
        if let Some(close) = table.close.as_mut() {
            close[3] = Value::Null;
            close[40] = json!("garbage");
        }
        let (status, body) = get(app(StubProvider::with_table(table)), "/get_stock_data").await;
        assert_eq!(status, StatusCode::OK);

        let len = body["dates"].as_array().unwrap().len();
        assert_eq!(len, 259);
        for key in ["prices", "sma20", "rsi14"] {
            assert_eq!(body[key].as_array().unwrap().len(), len, "{key}");
        }
        assert!(floats(&body["prices"]).iter().all(Option::is_some));
        assert!(!body["dates"]
            .as_array()
            .unwrap()
            .contains(&json!("2024-01-04")));
    }

    #[tokio::test]
    async fn all_closes_unusable_is_404() {
        let table = HistoryTable {
            dates: vec![NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()],
            close: Some(vec![Value::Null]),
        };
        let (status, _) = get(app(StubProvider::with_table(table)), "/get_stock_data?ticker=X").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn short_history_serialises_nulls() {
        let table = HistoryTable {
            dates: vec![
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            ],
            close: Some(vec![json!(10.0), json!(11.0)]),
        };
        let (status, body) = get(app(StubProvider::with_table(table)), "/get_stock_data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sma20"], json!([null, null]));
        assert_eq!(body["rsi14"], json!([null, null]));
        assert_eq!(body["avg_close_30_days"], json!(10.5));
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let provider = StubProvider::with_table(year_of_weekdays());
        let resp = app(provider)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://dashboard.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = get(app(StubProvider::failing("unused")), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
