// =============================================================================
// Runtime Configuration — scanner settings loaded from JSON
// =============================================================================
//
// Every tunable parameter of the scanner lives here: the symbol universe
// filter, the candle timeframe, indicator periods, the signal thresholds and
// the risk/reward multiples used for stop-loss and take-profit levels.
//
// All fields carry `#[serde(default)]` so that a partial (or empty) config file
// still loads, with missing fields falling back to the stock strategy.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_quote_asset() -> String {
    "USDT".to_string()
}

fn default_timeframe() -> String {
    "1h".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_futures_base_url() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_ema_periods() -> [usize; 3] {
    [7, 25, 99]
}

fn default_volume_lookback() -> usize {
    24
}

fn default_volume_spike_threshold() -> f64 {
    1.5
}

fn default_fast_mid_ratio_max() -> f64 {
    1.005
}

fn default_mid_slow_ratio_max() -> f64 {
    1.01
}

fn default_risk_pct() -> f64 {
    0.005
}

fn default_tp1_reward_multiple() -> f64 {
    3.0
}

fn default_tp2_reward_multiple() -> f64 {
    5.0
}

// =============================================================================
// IndicatorParams
// =============================================================================

/// Inputs to the indicator engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    /// EMA periods, fast / mid / slow.
    #[serde(default = "default_ema_periods")]
    pub ema_periods: [usize; 3],

    /// Number of closed candles preceding the latest one that form the
    /// average-volume baseline.
    #[serde(default = "default_volume_lookback")]
    pub volume_lookback: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ema_periods: default_ema_periods(),
            volume_lookback: default_volume_lookback(),
        }
    }
}

impl IndicatorParams {
    /// Longest EMA period.
    pub fn max_period(&self) -> usize {
        self.ema_periods.iter().copied().max().unwrap_or(0)
    }

    /// Number of candles to request per symbol: the longest period, one
    /// candle for the previous close, and the in-progress candle that is
    /// always discarded.
    pub fn candle_limit(&self) -> usize {
        self.max_period() + 2
    }
}

// =============================================================================
// SignalParams
// =============================================================================

/// Thresholds of the bullish signal rule and the risk/reward layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalParams {
    /// Minimum latest-volume / average-volume ratio.
    #[serde(default = "default_volume_spike_threshold")]
    pub volume_spike_threshold: f64,

    /// Exclusive upper bound of the fast/mid EMA ratio band (lower bound is 1).
    #[serde(default = "default_fast_mid_ratio_max")]
    pub fast_mid_ratio_max: f64,

    /// Exclusive upper bound of the mid/slow EMA ratio band (lower bound is 1).
    #[serde(default = "default_mid_slow_ratio_max")]
    pub mid_slow_ratio_max: f64,

    /// Stop-loss distance as a fraction of entry price (0.005 = 0.5 %).
    #[serde(default = "default_risk_pct")]
    pub risk_pct: f64,

    /// TP1 distance in multiples of the stop-loss distance.
    #[serde(default = "default_tp1_reward_multiple")]
    pub tp1_reward_multiple: f64,

    /// TP2 distance in multiples of the stop-loss distance.
    #[serde(default = "default_tp2_reward_multiple")]
    pub tp2_reward_multiple: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            volume_spike_threshold: default_volume_spike_threshold(),
            fast_mid_ratio_max: default_fast_mid_ratio_max(),
            mid_slow_ratio_max: default_mid_slow_ratio_max(),
            risk_pct: default_risk_pct(),
            tp1_reward_multiple: default_tp1_reward_multiple(),
            tp2_reward_multiple: default_tp2_reward_multiple(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Universe & timing ---------------------------------------------------

    /// Quote-currency suffix a symbol must end with to be scanned.
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,

    /// Kline interval token passed to the exchange (e.g. "1h").
    #[serde(default = "default_timeframe")]
    pub timeframe: String,

    /// Seconds between the start of consecutive scans.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Upper bound on in-flight kline requests during a scan.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    // --- Exchange ------------------------------------------------------------

    /// USD-M futures REST base URL.
    #[serde(default = "default_futures_base_url")]
    pub futures_base_url: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // --- Strategy ------------------------------------------------------------

    #[serde(default)]
    pub indicator_params: IndicatorParams,

    #[serde(default)]
    pub signal_params: SignalParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            quote_asset: default_quote_asset(),
            timeframe: default_timeframe(),
            refresh_interval_secs: default_refresh_interval_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            futures_base_url: default_futures_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            indicator_params: IndicatorParams::default(),
            signal_params: SignalParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A file that cannot be read (usually because it does not exist) yields
    /// the defaults with a warning. A file that is present but malformed or
    /// fails validation is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "runtime config unreadable, using defaults"
                );
                return Ok(Self::default());
            }
        };

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("invalid runtime config in {}", path.display()))?;

        info!(
            path = %path.display(),
            quote_asset = %config.quote_asset,
            timeframe = %config.timeframe,
            ema_periods = ?config.indicator_params.ema_periods,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Reject settings under which the signal rule cannot be evaluated
    /// meaningfully.
    pub fn validate(&self) -> Result<()> {
        let [fast, mid, slow] = self.indicator_params.ema_periods;
        if fast == 0 || mid == 0 || slow == 0 {
            anyhow::bail!("EMA periods must be non-zero, got {:?}", self.indicator_params.ema_periods);
        }
        if !(fast < mid && mid < slow) {
            anyhow::bail!(
                "EMA periods must be strictly increasing (fast < mid < slow), got {:?}",
                self.indicator_params.ema_periods
            );
        }
        if self.indicator_params.volume_lookback == 0 {
            anyhow::bail!("volume_lookback must be at least 1");
        }

        let sp = &self.signal_params;
        if sp.fast_mid_ratio_max <= 1.0 || sp.mid_slow_ratio_max <= 1.0 {
            anyhow::bail!(
                "ratio band upper bounds must exceed 1.0, got {} / {}",
                sp.fast_mid_ratio_max,
                sp.mid_slow_ratio_max
            );
        }
        if !(sp.risk_pct > 0.0 && sp.risk_pct < 1.0) {
            anyhow::bail!("risk_pct must lie in (0, 1), got {}", sp.risk_pct);
        }
        if sp.tp1_reward_multiple <= 0.0 || sp.tp2_reward_multiple < sp.tp1_reward_multiple {
            anyhow::bail!(
                "reward multiples must satisfy 0 < tp1 <= tp2, got {} / {}",
                sp.tp1_reward_multiple,
                sp.tp2_reward_multiple
            );
        }
        if self.quote_asset.is_empty() {
            anyhow::bail!("quote_asset must not be empty");
        }
        if self.max_concurrent_fetches == 0 {
            anyhow::bail!("max_concurrent_fetches must be at least 1");
        }
        if self.refresh_interval_secs == 0 {
            anyhow::bail!("refresh_interval_secs must be at least 1");
        }
        Ok(())
    }
}
