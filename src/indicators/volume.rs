// =============================================================================
// Volume Spike Factor
// =============================================================================
//
// spike = latest_volume / mean(volume over the `lookback` candles before it)
//
// The latest candle is excluded from its own baseline. When the history is
// shorter than `lookback` the window is clipped to what is available. A zero
// (or empty) baseline yields a spike factor of 0, i.e. "no spike".
// =============================================================================

/// Mean of the `lookback` volumes immediately preceding the last element.
pub fn baseline_volume(volumes: &[f64], lookback: usize) -> f64 {
    let Some((_, history)) = volumes.split_last() else {
        return 0.0;
    };
    let start = history.len().saturating_sub(lookback);
    let window = &history[start..];
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

/// Latest volume relative to its preceding baseline. `None` for an empty
/// series.
pub fn volume_spike_factor(volumes: &[f64], lookback: usize) -> Option<f64> {
    let latest = *volumes.last()?;
    let baseline = baseline_volume(volumes, lookback);
    if baseline > 0.0 {
        Some(latest / baseline)
    } else {
        Some(0.0)
    }
}
