// =============================================================================
// Signal Evaluator — bullish trend-continuation rule
// =============================================================================
//
// A symbol is a winner when ALL four conditions hold on the latest closed
// candle:
//   1. Alignment  — EMA fast > EMA mid > EMA slow
//   2. Ratio band — 1 < fast/mid < fast_mid_ratio_max
//                   1 < mid/slow < mid_slow_ratio_max
//                   (trend confirmed, but not already extended)
//   3. Volume     — spike factor >= volume_spike_threshold
//   4. Momentum   — close change > 0
//
// On pass, stop-loss / take-profit levels are derived from the current price.
// Evaluation is pure: the same bundle and timestamp always give the same
// verdict.
// =============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::indicators::IndicatorBundle;
use crate::risk::RiskLevels;
use crate::runtime_config::{IndicatorParams, SignalParams};

// =============================================================================
// Trade Setup
// =============================================================================

/// A symbol that passed every condition, with its exit levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeSetup {
    pub symbol: String,
    pub price: f64,
    pub spike_factor: f64,
    pub sl_price: f64,
    pub tp1_price: f64,
    pub tp2_price: f64,
    /// UTC wall-clock time of evaluation, `HH:MM:SS`.
    pub scan_time: String,
    /// EMA ratios keyed by period pair, e.g. `"7/25"`.
    pub ratios: BTreeMap<String, f64>,
}

/// One condition of the signal rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Condition {
    Alignment,
    RatioBand,
    VolumeSpike,
    Momentum,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alignment => write!(f, "Alignment"),
            Self::RatioBand => write!(f, "RatioBand"),
            Self::VolumeSpike => write!(f, "VolumeSpike"),
            Self::Momentum => write!(f, "Momentum"),
        }
    }
}

/// Result of evaluating one bundle.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Signal(TradeSetup),
    /// Every condition that did not hold.
    NoSignal(Vec<Condition>),
}

// =============================================================================
// Evaluator
// =============================================================================

#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    params: SignalParams,
    ema_periods: [usize; 3],
}

impl SignalEvaluator {
    pub fn new(params: SignalParams, indicator_params: &IndicatorParams) -> Self {
        Self {
            params,
            ema_periods: indicator_params.ema_periods,
        }
    }

    /// Conditions that `bundle` fails, in rule order. Empty means pass.
    pub fn failed_conditions(&self, b: &IndicatorBundle) -> Vec<Condition> {
        let p = &self.params;

        let alignment = b.ema_fast > b.ema_mid && b.ema_mid > b.ema_slow;
        let ratio_band = b.ratio_fast_mid > 1.0
            && b.ratio_fast_mid < p.fast_mid_ratio_max
            && b.ratio_mid_slow > 1.0
            && b.ratio_mid_slow < p.mid_slow_ratio_max;
        let volume = b.spike_factor >= p.volume_spike_threshold;
        let momentum = b.close_change > 0.0;

        [
            (alignment, Condition::Alignment),
            (ratio_band, Condition::RatioBand),
            (volume, Condition::VolumeSpike),
            (momentum, Condition::Momentum),
        ]
        .into_iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, c)| c)
        .collect()
    }

    pub fn evaluate(&self, symbol: &str, bundle: &IndicatorBundle, scanned_at: DateTime<Utc>) -> Verdict {
        let failed = self.failed_conditions(bundle);
        if !failed.is_empty() {
            return Verdict::NoSignal(failed);
        }

        let levels = RiskLevels::for_long(bundle.current_price, &self.params);
        let [fast, mid, slow] = self.ema_periods;

        let mut ratios = BTreeMap::new();
        ratios.insert(format!("{fast}/{mid}"), bundle.ratio_fast_mid);
        ratios.insert(format!("{mid}/{slow}"), bundle.ratio_mid_slow);

        Verdict::Signal(TradeSetup {
            symbol: symbol.to_string(),
            price: bundle.current_price,
            spike_factor: bundle.spike_factor,
            sl_price: levels.sl_price,
            tp1_price: levels.tp1_price,
            tp2_price: levels.tp2_price,
            scan_time: scanned_at.format("%H:%M:%S").to_string(),
            ratios,
        })
    }
}
