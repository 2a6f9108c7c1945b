// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators served by the
// stock-data endpoint. Every function returns a series the same length as its
// input, with NaN in the slots that lack enough history, so the outputs stay
// aligned with the date axis.

pub mod rsi;
pub mod sma;

pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
