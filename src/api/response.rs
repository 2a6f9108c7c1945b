// =============================================================================
// JSON response shape for /get_stock_data
// =============================================================================

use serde::Serialize;

use crate::analysis::StockAnalysis;

/// Body of a successful `/get_stock_data` response.
///
/// The four arrays are index-aligned; a missing value is `null`, never
/// omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockDataResponse {
    pub dates: Vec<String>,
    pub prices: Vec<Option<f64>>,
    pub sma20: Vec<Option<f64>>,
    pub rsi14: Vec<Option<f64>>,
    pub last_close: Option<f64>,
    pub avg_close_30_days: Option<f64>,
    #[serde(rename = "52_week_high")]
    pub high_52_week: Option<f64>,
    #[serde(rename = "52_week_low")]
    pub low_52_week: Option<f64>,
}

impl StockDataResponse {
    /// Serialization boundary: every non-finite float in the analysis becomes
    /// `None` (JSON `null`).
    pub fn from_analysis(analysis: &StockAnalysis) -> Self {
        let summary = &analysis.summary;
        Self {
            dates: analysis
                .dates
                .iter()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .collect(),
            prices: json_safe_series(&analysis.prices),
            sma20: json_safe_series(&analysis.sma20),
            rsi14: json_safe_series(&analysis.rsi14),
            last_close: json_safe(summary.last_close),
            avg_close_30_days: json_safe(summary.avg_close_30),
            high_52_week: json_safe(summary.high),
            low_52_week: json_safe(summary.low),
        }
    }
}

fn json_safe(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn json_safe_series(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(json_safe).collect()
}
