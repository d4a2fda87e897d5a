// =============================================================================
// Indicator Bundle — everything the signal rule reads for one symbol
// =============================================================================
//
// Pipeline over one fetched klines series:
//   1. Drop the in-progress candle (always the last element).
//   2. Require max(period) + 1 closed candles.
//   3. EMA fast / mid / slow over closes, latest value of each.
//   4. EMA ratios fast/mid and mid/slow.
//   5. Volume spike factor of the latest closed candle.
//   6. Close-to-close change of the latest closed candle.
//
// Too little history is not an error: it is the normal state of a freshly
// listed contract, and yields `None` so the caller skips the symbol.
// =============================================================================

use serde::Serialize;

use crate::indicators::ema::ema_last;
use crate::indicators::volume::volume_spike_factor;
use crate::market_data::{closed_candles, Candle};
use crate::runtime_config::IndicatorParams;

/// Derived per-symbol values for one scan pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorBundle {
    pub current_price: f64,
    pub ema_fast: f64,
    pub ema_mid: f64,
    pub ema_slow: f64,
    pub ratio_fast_mid: f64,
    pub ratio_mid_slow: f64,
    pub spike_factor: f64,
    pub close_change: f64,
}

impl IndicatorBundle {
    fn is_finite(&self) -> bool {
        [
            self.current_price,
            self.ema_fast,
            self.ema_mid,
            self.ema_slow,
            self.ratio_fast_mid,
            self.ratio_mid_slow,
            self.spike_factor,
            self.close_change,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Compute the indicator bundle from a freshly fetched series (open candle
/// still attached).
///
/// Returns `None` when there is not enough closed history or when the inputs
/// produce non-finite values (e.g. a zero price).
pub fn compute_indicators(series: &[Candle], params: &IndicatorParams) -> Option<IndicatorBundle> {
    let candles = closed_candles(series);

    let required = params.max_period() + 1;
    if candles.len() < required || candles.len() < 2 {
        return None;
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

    let [fast, mid, slow] = params.ema_periods;
    let ema_fast = ema_last(&closes, fast)?;
    let ema_mid = ema_last(&closes, mid)?;
    let ema_slow = ema_last(&closes, slow)?;

    let current_price = closes[closes.len() - 1];
    let previous_close = closes[closes.len() - 2];

    let bundle = IndicatorBundle {
        current_price,
        ema_fast,
        ema_mid,
        ema_slow,
        ratio_fast_mid: ema_fast / ema_mid,
        ratio_mid_slow: ema_mid / ema_slow,
        spike_factor: volume_spike_factor(&volumes, params.volume_lookback)?,
        close_change: (current_price - previous_close) / previous_close,
    };

    bundle.is_finite().then_some(bundle)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{rising_series, series_from_closes};

    #[test]
    fn series_below_threshold_is_insufficient() {
        let params = IndicatorParams::default();
        // 100 raw candles -> 99 closed, one short of 99 + 1.
        for len in [0, 1, 2, 50, 99, 100] {
            let series = rising_series(len, 0.0002, 1_000.0, 1_000.0);
            assert!(compute_indicators(&series, &params).is_none(), "len {len}");
        }
    }

    #[test]
    fn series_at_threshold_yields_bundle() {
        let params = IndicatorParams::default();
        let series = rising_series(params.candle_limit(), 0.0002, 1_000.0, 1_000.0);
        assert!(compute_indicators(&series, &params).is_some());
    }

    #[test]
    fn open_candle_is_ignored() {
        let params = IndicatorParams::default();
        let mut series = rising_series(params.candle_limit(), 0.0002, 1_000.0, 2_000.0);
        let baseline = compute_indicators(&series, &params).unwrap();

        let last = series.last_mut().unwrap();
        last.close = 1.0;
        last.volume = 1e12;
        let mutated = compute_indicators(&series, &params).unwrap();
        assert_eq!(baseline, mutated);
    }

    #[test]
    fn bundle_values_on_gentle_uptrend() {
        let params = IndicatorParams::default();
        let series = rising_series(params.candle_limit(), 0.0002, 1_000.0, 2_000.0);
        let b = compute_indicators(&series, &params).unwrap();

        let closed = &series[..series.len() - 1];
        assert_eq!(b.current_price, closed[closed.len() - 1].close);
        assert!(b.ema_fast > b.ema_mid && b.ema_mid > b.ema_slow);
        assert!((b.ratio_fast_mid - b.ema_fast / b.ema_mid).abs() < 1e-15);
        assert!(b.ratio_fast_mid > 1.0 && b.ratio_fast_mid < 1.005);
        assert!(b.ratio_mid_slow > 1.0 && b.ratio_mid_slow < 1.01);
        assert!((b.spike_factor - 2.0).abs() < 1e-12);
        assert!(b.close_change > 0.0);
    }

    #[test]
    fn close_change_uses_previous_closed_candle() {
        let params = IndicatorParams {
            ema_periods: [2, 3, 4],
            volume_lookback: 3,
        };
        // Closed: 10, 10, 10, 10, 11 ; open candle 99.
        let series = series_from_closes(&[10.0, 10.0, 10.0, 10.0, 11.0, 99.0], 5.0);
        let b = compute_indicators(&series, &params).unwrap();
        assert!((b.close_change - 0.1).abs() < 1e-12);
        assert_eq!(b.current_price, 11.0);
    }

    #[test]
    fn zero_volume_history_gives_zero_spike() {
        let params = IndicatorParams::default();
        let mut series = rising_series(params.candle_limit(), 0.0002, 0.0, 0.0);
        let n = series.len();
        series[n - 2].volume = 500.0;
        let b = compute_indicators(&series, &params).unwrap();
        assert_eq!(b.spike_factor, 0.0);
    }

    #[test]
    fn zero_price_is_rejected() {
        let params = IndicatorParams {
            ema_periods: [2, 3, 4],
            volume_lookback: 3,
        };
        let series = series_from_closes(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0], 5.0);
        assert!(compute_indicators(&series, &params).is_none());
    }

    #[test]
    fn constant_series_has_unit_ratios() {
        let params = IndicatorParams::default();
        let closes = vec![42.5; params.candle_limit()];
        let series = series_from_closes(&closes, 10.0);
        let b = compute_indicators(&series, &params).unwrap();
        assert_eq!(b.ema_fast, 42.5);
        assert_eq!(b.ema_slow, 42.5);
        assert_eq!(b.ratio_fast_mid, 1.0);
        assert_eq!(b.ratio_mid_slow, 1.0);
        assert_eq!(b.close_change, 0.0);
    }
}
