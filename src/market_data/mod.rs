pub mod candle;
pub mod gateway;

// Re-export for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle::{closed_candles, Candle};
pub use gateway::MarketDataGateway;
