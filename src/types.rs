// =============================================================================
// Shared types used across the AuraLens backend
// =============================================================================

use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

/// One trading day's closing price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closing prices ordered by strictly increasing date. Every close is
/// finite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from a date axis and a column of loosely-typed close
    /// cells.
    ///
    /// Cells that do not coerce to a finite number are dropped together with
    /// their date. Rows are ordered by date; when a date repeats, the later
    /// row wins.
    ///
    /// Providers reject tables whose close column is not one cell per date;
    /// a mismatch reaching this point is logged and the extra rows ignored.
    pub fn from_cells(dates: &[NaiveDate], cells: &[Value]) -> Self {
        if dates.len() != cells.len() {
            warn!(dates = dates.len(), closes = cells.len(), "close column length differs from date axis");
        }
        let mut rows: Vec<PricePoint> = dates
            .iter()
            .zip(cells)
            .filter_map(|(&date, cell)| coerce_close(cell).map(|close| PricePoint { date, close }))
            .collect();
        rows.sort_by_key(|p| p.date);

        let mut points: Vec<PricePoint> = Vec::with_capacity(rows.len());
        for row in rows {
            match points.last_mut() {
                Some(last) if last.date == row.date => *last = row,
                _ => points.push(row),
            }
        }
        Self { points }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }
}

/// Coerce a raw close cell into a finite `f64`.
///
/// Numbers and numeric strings are accepted; nulls, booleans, non-numeric
/// strings and non-finite values are not.
pub fn coerce_close(cell: &Value) -> Option<f64> {
    let value = match cell {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}
