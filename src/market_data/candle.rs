use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle from the futures klines endpoint.
///
/// Series are always ordered oldest first. The final element of a freshly
/// fetched series is the interval still in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

impl Candle {
    pub fn new(
        open_time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        close_time: i64,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time,
        }
    }
}

/// Drop the in-progress candle at the end of a fetched series.
pub fn closed_candles(series: &[Candle]) -> &[Candle] {
    match series.split_last() {
        Some((_, closed)) => closed,
        None => series,
    }
}
