// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators read by the signal
// rule. Functions return `Option<T>` so callers are forced to handle
// insufficient-data and numerical-edge-case scenarios.

pub mod bundle;
pub mod ema;
pub mod volume;

pub use bundle::{compute_indicators, IndicatorBundle};
