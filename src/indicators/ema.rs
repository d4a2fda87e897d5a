// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_0      = close_0
//   EMA_t      = EMA_{t-1} + multiplier * (close_t - EMA_{t-1})
//
// The series is seeded with the very first close (no SMA warm-up), so the
// output has exactly one value per input close. Written in the
// "previous + multiplier * delta" form, a constant input reproduces the
// constant exactly.
// =============================================================================

/// Compute the EMA series for the given `closes` slice and look-back `period`.
///
/// Returns an empty `Vec` when the input is empty or the period is zero.
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - Non-finite intermediate values end the series early; callers reading
///   `last()` then see the last trustworthy value only if the series is full
///   length, which [`ema_last`] checks.
pub fn calculate_ema(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.is_empty() {
        return Vec::new();
    }

    let multiplier = 2.0 / (period + 1) as f64;

    let seed = closes[0];
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(closes.len());
    result.push(seed);

    let mut prev_ema = seed;
    for &close in &closes[1..] {
        let ema = prev_ema + multiplier * (close - prev_ema);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev_ema = ema;
    }

    result
}

/// Latest EMA value, or `None` unless every close contributed to it.
pub fn ema_last(closes: &[f64], period: usize) -> Option<f64> {
    let series = calculate_ema(closes, period);
    if series.len() != closes.len() {
        return None;
    }
    series.last().copied()
}
