// Shared fixtures for unit tests.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::market_data::{Candle, MarketDataGateway};
use crate::types::GatewayMode;

const HOUR_MS: i64 = 3_600_000;

fn candle_at(i: usize, close: f64, volume: f64) -> Candle {
    let open_time = 1_700_000_000_000 + i as i64 * HOUR_MS;
    Candle::new(open_time, close, close, close, close, volume, open_time + HOUR_MS - 1)
}

/// `len` candles whose closes grow linearly by `growth` (fraction of 100) per
/// candle. Every candle trades `base_volume` except the latest closed one
/// (second to last), which trades `last_closed_volume`.
pub fn rising_series(len: usize, growth: f64, base_volume: f64, last_closed_volume: f64) -> Vec<Candle> {
    (0..len)
        .map(|i| {
            let close = 100.0 * (1.0 + growth * i as f64);
            let volume = if len >= 2 && i == len - 2 {
                last_closed_volume
            } else {
                base_volume
            };
            candle_at(i, close, volume)
        })
        .collect()
}

/// One candle per close, all with the same volume.
pub fn series_from_closes(closes: &[f64], volume: f64) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| candle_at(i, c, volume))
        .collect()
}

// ---------------------------------------------------------------------------
// In-memory gateway
// ---------------------------------------------------------------------------

/// Scripted exchange: a symbol list (or failure) plus per-symbol series.
/// Symbols without a series fail to fetch.
#[derive(Default)]
pub struct FakeGateway {
    pub symbols: Option<Vec<String>>,
    pub series: HashMap<String, Vec<Candle>>,
    pub delays: HashMap<String, Duration>,
    pub requests: Mutex<Vec<(String, String, usize)>>,
}

impl FakeGateway {
    pub fn with_symbols(symbols: &[&str]) -> Self {
        Self {
            symbols: Some(symbols.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn series(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.series.insert(symbol.to_string(), candles);
        self
    }

    pub fn delay(mut self, symbol: &str, delay: Duration) -> Self {
        self.delays.insert(symbol.to_string(), delay);
        self
    }

    pub fn requested_symbols(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(s, _, _)| s.clone()).collect()
    }
}

#[async_trait]
impl MarketDataGateway for FakeGateway {
    async fn list_tradable_symbols(&self) -> Result<Vec<String>> {
        self.symbols
            .clone()
            .ok_or_else(|| anyhow::anyhow!("exchangeInfo unavailable"))
    }

    async fn fetch_candles(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>> {
        self.requests
            .lock()
            .push((symbol.to_string(), interval.to_string(), limit));
        if let Some(d) = self.delays.get(symbol) {
            tokio::time::sleep(*d).await;
        }
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("klines for {symbol} unavailable"))
    }

    fn mode(&self) -> GatewayMode {
        GatewayMode::Public
    }
}
