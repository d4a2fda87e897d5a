// =============================================================================
// Market Data Gateway — read-only exchange capability used by the scanner
// =============================================================================
//
// The scanner only ever needs two calls: the tradable symbol universe and a
// klines series per symbol. Anything implementing this trait can drive a scan,
// which keeps the orchestrator independent of the HTTP client and lets tests
// substitute an in-memory exchange.
// =============================================================================

use anyhow::Result;
use async_trait::async_trait;

use crate::market_data::Candle;
use crate::types::GatewayMode;

#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// All symbols currently in `TRADING` status.
    async fn list_tradable_symbols(&self) -> Result<Vec<String>>;

    /// Up to `limit` most recent candles for `symbol` at `interval`, oldest
    /// first, including the in-progress candle.
    async fn fetch_candles(&self, symbol: &str, interval: &str, limit: usize)
        -> Result<Vec<Candle>>;

    /// Whether the gateway runs with verified credentials.
    fn mode(&self) -> GatewayMode;
}
