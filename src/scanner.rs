// =============================================================================
// Scan Orchestrator — one pass over the whole futures universe
// =============================================================================
//
// Pipeline per scan:
//   1. List tradable symbols (failure or empty list => empty result)
//   2. Keep symbols quoted in the configured asset; that count is the
//      universe size reported to callers, fixed before any fetch
//   3. Per symbol: fetch klines -> indicator bundle -> signal rule
//   4. Collect winners in scan order
//
// Nothing a single symbol does can abort the scan. Every outcome is tagged
// and counted in `ScanStats`. Symbols are processed with bounded concurrency
// through an order-preserving stream, so `max_concurrent_fetches = 1` is the
// strictly sequential scan and larger values only change latency.
// =============================================================================

use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::indicators::compute_indicators;
use crate::market_data::MarketDataGateway;
use crate::runtime_config::{IndicatorParams, RuntimeConfig};
use crate::strategy::{Condition, SignalEvaluator, TradeSetup, Verdict};

// =============================================================================
// Outcome types
// =============================================================================

/// Why a symbol contributed nothing to the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// The klines request failed.
    FetchFailed,
    /// Not enough closed candles for the slowest EMA (or unusable prices).
    InsufficientData,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FetchFailed => write!(f, "FetchFailed"),
            Self::InsufficientData => write!(f, "InsufficientData"),
        }
    }
}

/// Result of evaluating one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    Signal(TradeSetup),
    NoSignal(Vec<Condition>),
    Skipped(SkipReason),
}

/// Per-outcome counters for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Tradable symbols listed by the exchange, before the quote filter.
    pub listed: usize,
    pub fetch_failed: usize,
    pub insufficient_data: usize,
    pub no_signal: usize,
    pub signals: usize,
}

impl ScanStats {
    fn record(&mut self, outcome: &SymbolOutcome) {
        match outcome {
            SymbolOutcome::Signal(_) => self.signals += 1,
            SymbolOutcome::NoSignal(_) => self.no_signal += 1,
            SymbolOutcome::Skipped(SkipReason::FetchFailed) => self.fetch_failed += 1,
            SymbolOutcome::Skipped(SkipReason::InsufficientData) => self.insufficient_data += 1,
        }
    }
}

/// Output of one scan. A fresh value every invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanResult {
    /// Winners in scan order.
    pub winning_symbols: Vec<TradeSetup>,
    /// Symbols that passed the quote-asset filter.
    pub total_scanned_count: usize,
    pub stats: ScanStats,
}

// =============================================================================
// Scanner
// =============================================================================

pub struct Scanner {
    gateway: Arc<dyn MarketDataGateway>,
    evaluator: SignalEvaluator,
    indicator_params: IndicatorParams,
    quote_asset: String,
    timeframe: String,
    max_concurrent_fetches: usize,
}

impl Scanner {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, config: &RuntimeConfig) -> Self {
        Self {
            gateway,
            evaluator: SignalEvaluator::new(config.signal_params.clone(), &config.indicator_params),
            indicator_params: config.indicator_params.clone(),
            quote_asset: config.quote_asset.clone(),
            timeframe: config.timeframe.clone(),
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn MarketDataGateway> {
        &self.gateway
    }

    /// Run one full scan. Never fails; problems surface as counters.
    pub async fn run_scan(&self) -> ScanResult {
        info!(timeframe = %self.timeframe, quote = %self.quote_asset, "starting futures scan");

        let listed = match self.gateway.list_tradable_symbols().await {
            Ok(symbols) => symbols,
            Err(e) => {
                warn!(error = %e, "could not retrieve trading symbols");
                return ScanResult::default();
            }
        };
        if listed.is_empty() {
            warn!("exchange returned no trading symbols");
            return ScanResult::default();
        }

        let symbols: Vec<String> = listed
            .iter()
            .filter(|s| s.ends_with(&self.quote_asset))
            .cloned()
            .collect();

        let mut result = ScanResult {
            total_scanned_count: symbols.len(),
            stats: ScanStats {
                listed: listed.len(),
                ..ScanStats::default()
            },
            ..ScanResult::default()
        };
        info!(
            count = result.total_scanned_count,
            quote = %self.quote_asset,
            "pairs to scan"
        );

        let outcomes: Vec<SymbolOutcome> = stream::iter(symbols)
            .map(|symbol| async move { self.scan_symbol(&symbol).await })
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await;

        for outcome in outcomes {
            result.stats.record(&outcome);
            if let SymbolOutcome::Signal(setup) = outcome {
                result.winning_symbols.push(setup);
            }
        }

        let stats = &result.stats;
        info!(
            scanned = result.total_scanned_count,
            signals = stats.signals,
            no_signal = stats.no_signal,
            fetch_failed = stats.fetch_failed,
            insufficient_data = stats.insufficient_data,
            "scan complete"
        );
        result
    }

    /// Fetch, derive and evaluate a single symbol.
    pub async fn scan_symbol(&self, symbol: &str) -> SymbolOutcome {
        let limit = self.indicator_params.candle_limit();

        let series = match self.gateway.fetch_candles(symbol, &self.timeframe, limit).await {
            Ok(series) => series,
            Err(e) => {
                debug!(symbol, error = %e, reason = %SkipReason::FetchFailed, "symbol skipped");
                return SymbolOutcome::Skipped(SkipReason::FetchFailed);
            }
        };

        let Some(bundle) = compute_indicators(&series, &self.indicator_params) else {
            debug!(
                symbol,
                candles = series.len(),
                reason = %SkipReason::InsufficientData,
                "symbol skipped"
            );
            return SymbolOutcome::Skipped(SkipReason::InsufficientData);
        };

        match self.evaluator.evaluate(symbol, &bundle, Utc::now()) {
            Verdict::Signal(setup) => {
                info!(
                    symbol,
                    price = setup.price,
                    spike = setup.spike_factor,
                    sl = setup.sl_price,
                    tp1 = setup.tp1_price,
                    tp2 = setup.tp2_price,
                    "bullish setup found"
                );
                SymbolOutcome::Signal(setup)
            }
            Verdict::NoSignal(failed) => {
                debug!(symbol, failed = ?failed, "no signal");
                SymbolOutcome::NoSignal(failed)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::test_support::{rising_series, FakeGateway};

    const LIMIT: usize = 101;

    fn scanner(gateway: FakeGateway) -> (Scanner, Arc<FakeGateway>) {
        let gateway = Arc::new(gateway);
        let scanner = Scanner::new(gateway.clone(), &RuntimeConfig::default());
        (scanner, gateway)
    }

    /// Gentle uptrend with a 2x volume spike on the last closed candle.
    fn bullish() -> Vec<crate::market_data::Candle> {
        rising_series(LIMIT, 0.0002, 1_000.0, 2_000.0)
    }

    /// Same shape, but the trend is too steep for the ratio band.
    fn extended() -> Vec<crate::market_data::Candle> {
        rising_series(LIMIT, 0.002, 1_000.0, 2_000.0)
    }

    #[tokio::test]
    async fn empty_universe_yields_empty_result() {
        let (s, _) = scanner(FakeGateway::with_symbols(&[]));
        let result = s.run_scan().await;
        assert!(result.winning_symbols.is_empty());
        assert_eq!(result.total_scanned_count, 0);
        assert_eq!(result, ScanResult::default());
    }

    #[tokio::test]
    async fn universe_failure_yields_empty_result() {
        let (s, gw) = scanner(FakeGateway::default());
        let result = s.run_scan().await;
        assert_eq!(result, ScanResult::default());
        assert!(gw.requested_symbols().is_empty());
    }

    #[tokio::test]
    async fn single_bullish_symbol_at_threshold_is_a_winner() {
        let (s, gw) = scanner(FakeGateway::with_symbols(&["SOLUSDT"]).series("SOLUSDT", bullish()));
        let result = s.run_scan().await;

        assert_eq!(result.total_scanned_count, 1);
        assert_eq!(result.winning_symbols.len(), 1);
        let setup = &result.winning_symbols[0];
        assert_eq!(setup.symbol, "SOLUSDT");

        let price = bullish()[LIMIT - 2].close;
        assert_eq!(setup.price, price);
        assert!((setup.sl_price - price * 0.995).abs() < 1e-9);
        let risk = price - setup.sl_price;
        assert!((setup.tp1_price - (price + 3.0 * risk)).abs() < 1e-9);
        assert!((setup.tp2_price - (price + 5.0 * risk)).abs() < 1e-9);
        assert!((setup.spike_factor - 2.0).abs() < 1e-12);
        assert_eq!(setup.scan_time.len(), 8);

        let requests = gw.requests.lock().clone();
        assert_eq!(requests, vec![("SOLUSDT".to_string(), "1h".to_string(), LIMIT)]);
    }

    #[tokio::test]
    async fn extended_trend_is_counted_but_not_a_winner() {
        let (s, _) = scanner(FakeGateway::with_symbols(&["PEPEUSDT"]).series("PEPEUSDT", extended()));
        let result = s.run_scan().await;
        assert!(result.winning_symbols.is_empty());
        assert_eq!(result.total_scanned_count, 1);
        assert_eq!(result.stats.no_signal, 1);
    }

    #[tokio::test]
    async fn failed_fetch_skips_only_that_symbol() {
        let gw = FakeGateway::with_symbols(&["AUSDT", "BUSDT", "CUSDT"])
            .series("AUSDT", bullish())
            .series("CUSDT", bullish());
        let (s, _) = scanner(gw);
        let result = s.run_scan().await;

        assert_eq!(result.total_scanned_count, 3);
        assert!(result.winning_symbols.len() <= 2);
        let winners: Vec<&str> = result.winning_symbols.iter().map(|w| w.symbol.as_str()).collect();
        assert_eq!(winners, vec!["AUSDT", "CUSDT"]);
        assert_eq!(result.stats.fetch_failed, 1);
    }

    #[tokio::test]
    async fn quote_filter_defines_scanned_count() {
        let gw = FakeGateway::with_symbols(&["BTCUSDT", "ETHBUSD", "BTCUSDC", "XRPUSDT", "ETHUSDT_240628"])
            .series("BTCUSDT", bullish());
        let (s, gw) = scanner(gw);
        let result = s.run_scan().await;

        assert_eq!(result.total_scanned_count, 2);
        assert_eq!(result.stats.listed, 5);
        assert_eq!(gw.requested_symbols(), vec!["BTCUSDT", "XRPUSDT"]);
        assert_eq!(result.stats.fetch_failed, 1);
        assert_eq!(result.winning_symbols.len(), 1);
    }

    #[tokio::test]
    async fn new_listing_with_short_history_is_skipped() {
        let gw = FakeGateway::with_symbols(&["NEWUSDT"])
            .series("NEWUSDT", rising_series(40, 0.0002, 1_000.0, 2_000.0));
        let (s, _) = scanner(gw);
        let result = s.run_scan().await;
        assert!(result.winning_symbols.is_empty());
        assert_eq!(result.total_scanned_count, 1);
        assert_eq!(result.stats.insufficient_data, 1);
    }

    #[tokio::test]
    async fn every_outcome_is_counted() {
        let gw = FakeGateway::with_symbols(&["AUSDT", "BUSDT", "CUSDT", "DUSDT", "EBTC"])
            .series("AUSDT", bullish())
            .series("BUSDT", extended())
            .series("DUSDT", rising_series(10, 0.0, 1.0, 1.0));
        let (s, _) = scanner(gw);
        let result = s.run_scan().await;

        let stats = &result.stats;
        assert_eq!(result.total_scanned_count, 4);
        assert_eq!(stats.signals, 1);
        assert_eq!(stats.no_signal, 1);
        assert_eq!(stats.fetch_failed, 1);
        assert_eq!(stats.insufficient_data, 1);
        assert_eq!(
            stats.signals + stats.no_signal + stats.fetch_failed + stats.insufficient_data,
            result.total_scanned_count
        );
    }

    #[tokio::test]
    async fn winners_keep_scan_order_under_concurrency() {
        let gw = FakeGateway::with_symbols(&["AUSDT", "BUSDT", "CUSDT"])
            .series("AUSDT", bullish())
            .series("BUSDT", bullish())
            .series("CUSDT", bullish())
            .delay("AUSDT", Duration::from_millis(60))
            .delay("BUSDT", Duration::from_millis(30));
        let (s, _) = scanner(gw);
        let result = s.run_scan().await;
        let winners: Vec<&str> = result.winning_symbols.iter().map(|w| w.symbol.as_str()).collect();
        assert_eq!(winners, vec!["AUSDT", "BUSDT", "CUSDT"]);
    }

    #[tokio::test]
    async fn sequential_mode_scans_in_order() {
        let gw = Arc::new(
            FakeGateway::with_symbols(&["AUSDT", "BUSDT", "CUSDT"])
                .series("AUSDT", bullish())
                .series("CUSDT", bullish()),
        );
        let config = RuntimeConfig {
            max_concurrent_fetches: 1,
            ..RuntimeConfig::default()
        };
        let s = Scanner::new(gw.clone(), &config);
        let result = s.run_scan().await;
        assert_eq!(gw.requested_symbols(), vec!["AUSDT", "BUSDT", "CUSDT"]);
        assert_eq!(result.winning_symbols.len(), 2);
    }

    #[tokio::test]
    async fn scans_do_not_carry_state() {
        let gw = FakeGateway::with_symbols(&["AUSDT"]).series("AUSDT", bullish());
        let (s, _) = scanner(gw);
        let first = s.run_scan().await;
        let second = s.run_scan().await;
        assert_eq!(first.winning_symbols.len(), 1);
        assert_eq!(second.winning_symbols.len(), 1);
        assert_eq!(first.total_scanned_count, second.total_scanned_count);
    }
}
