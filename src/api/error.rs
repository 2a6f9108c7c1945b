// =============================================================================
// API errors: tagged failure kinds mapped to HTTP responses
// =============================================================================
//
// Every error renders as `{"error": "<message>"}`:
//   InvalidQuery -> 400 (query string did not deserialize)
//   InvalidDays  -> 400
//   NotFound     -> 404
//   MissingClose -> 500 (data-shape)
//   Unclassified -> 500 (provider failure, reason echoed to the caller)
// =============================================================================

use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::market_data::ProviderError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    #[error("Invalid days value '{0}'. Expected a positive whole number of days.")]
    InvalidDays(String),

    #[error(
        "No data found for {symbol}. Please check the ticker symbol and ensure it's valid for \
         the selected exchange (e.g., NBCC.NS for NSE, SAGILITY.BO for BSE). If it's a mutual \
         fund, direct NAV APIs are required."
    )]
    NotFound { symbol: String },

    #[error("Close price column not found in fetched data.")]
    MissingClose { symbol: String },

    #[error("Failed to fetch data for {symbol}: {source}")]
    Unclassified {
        symbol: String,
        #[source]
        source: ProviderError,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidQuery(_) | Self::InvalidDays(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MissingClose { .. } | Self::Unclassified { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
