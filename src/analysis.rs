// =============================================================================
// Stock analysis: indicators and summary over one price series
// =============================================================================
//
// Produces the SMA(20) / RSI(14) columns aligned with the price series plus
// the scalar summary shown on the dashboard. Undefined indicator slots stay
// NaN here; converting them to JSON nulls happens at the response boundary.
// =============================================================================

use chrono::NaiveDate;

use crate::indicators::{calculate_rsi, calculate_sma};
use crate::types::PriceSeries;

pub const SMA_PERIOD: usize = 20;
pub const RSI_PERIOD: usize = 14;

/// Number of trailing closes averaged into `avg_close_30`.
pub const TRAILING_AVERAGE_LEN: usize = 30;

/// Scalar statistics over the fetched window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub last_close: f64,
    pub avg_close_30: f64,
    pub high: f64,
    pub low: f64,
}

impl Summary {
    /// Returns `None` for an empty slice.
    pub fn from_closes(closes: &[f64]) -> Option<Self> {
        let last_close = *closes.last()?;

        let tail = &closes[closes.len().saturating_sub(TRAILING_AVERAGE_LEN)..];
        let avg_close_30 = tail.iter().sum::<f64>() / tail.len() as f64;

        let high = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let low = closes.iter().copied().fold(f64::INFINITY, f64::min);

        Some(Self {
            last_close,
            avg_close_30,
            high,
            low,
        })
    }
}

/// Indicator table for one symbol. All column vectors share one length.
#[derive(Debug, Clone)]
pub struct StockAnalysis {
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<f64>,
    pub sma20: Vec<f64>,
    pub rsi14: Vec<f64>,
    pub summary: Summary,
}

impl StockAnalysis {
    /// Compute indicators and summary. Returns `None` when the series is
    /// empty.
    pub fn compute(series: &PriceSeries) -> Option<Self> {
        let prices = series.closes();
        let summary = Summary::from_closes(&prices)?;

        Some(Self {
            dates: series.dates().collect(),
            sma20: calculate_sma(&prices, SMA_PERIOD),
            rsi14: calculate_rsi(&prices, RSI_PERIOD),
            prices,
            summary,
        })
    }
}
