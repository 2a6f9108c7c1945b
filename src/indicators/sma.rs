// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Unweighted mean of the last `period` closes. Trailing window, no centering
// and no padding: slots without a full window are NaN.

/// Compute the SMA series for `closes`, aligned index-for-index with the input.
///
/// `result[i]` is NaN for `i < period - 1`, otherwise the mean of
/// `closes[i + 1 - period..=i]`. A zero period yields an all-NaN series.
pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; closes.len()];
    if period == 0 || closes.len() < period {
        return result;
    }

    let period_f = period as f64;
    for (offset, window) in closes.windows(period).enumerate() {
        result[offset + period - 1] = window.iter().sum::<f64>() / period_f;
    }
    result
}
