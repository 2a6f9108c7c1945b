// =============================================================================
// Market data: provider abstraction
// =============================================================================
//
// A `PriceProvider` answers one question: the daily history of a single
// symbol over a date range. The contract is single-symbol and
// single-column; callers never see multi-ticker frames.
// =============================================================================

pub mod yahoo;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use thiserror::Error;

pub use yahoo::YahooProvider;

/// Raw daily history as returned by a provider, before numeric coercion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryTable {
    /// Trading dates in exchange-local time.
    pub dates: Vec<NaiveDate>,
    /// Closing-price cells, one per date. `None` when the provider table has
    /// no closing-price column at all.
    pub close: Option<Vec<Value>>,
}

impl HistoryTable {
    /// A table with no rows (unknown symbol or empty range).
    pub fn empty() -> Self {
        Self {
            dates: Vec::new(),
            close: Some(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Errors raised while talking to a market-data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (DNS, TLS, connection reset, body read).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status without a usable error payload.
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The provider answered with an explicit error message.
    #[error("provider error: {0}")]
    Api(String),

    /// The response body was not the expected JSON shape.
    #[error("failed to parse provider response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The closing-price column does not have one cell per timestamp.
    #[error("provider returned {closes} closing prices for {dates} dates")]
    ShapeMismatch { dates: usize, closes: usize },

    #[error("invalid timestamp in provider response: {0}")]
    InvalidTimestamp(i64),

    #[error("invalid provider url: {0}")]
    InvalidUrl(String),
}

/// Source of daily price history.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetch the daily history of `symbol` between `start` and `end`.
    async fn fetch_daily(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HistoryTable, ProviderError>;
}
