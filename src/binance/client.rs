// =============================================================================
// Binance USD-M Futures REST Client — read-only market data
// =============================================================================
//
// The scanner only reads public market data (exchange info and klines). When
// API credentials are configured the client also sends X-MBX-APIKEY and can
// run a signed account request once at startup to confirm the keys are valid;
// without credentials it runs in public mode.
//
// SECURITY: The secret key is never logged or serialized.
// =============================================================================

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, instrument, warn};

use crate::binance::rate_limit::{klines_weight, RateLimitTracker};
use crate::market_data::{Candle, MarketDataGateway};
use crate::types::GatewayMode;

type HmacSha256 = Hmac<Sha256>;

/// Default recv-window sent with every signed request (milliseconds).
const RECV_WINDOW: u64 = 5000;

/// Weight of `GET /fapi/v1/exchangeInfo`.
const EXCHANGE_INFO_WEIGHT: u32 = 1;

/// API key + secret pair.
#[derive(Clone)]
struct Credentials {
    api_key: String,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    status: String,
}

/// Binance futures REST client.
#[derive(Clone)]
pub struct BinanceClient {
    credentials: Option<Credentials>,
    base_url: String,
    client: reqwest::Client,
    rate_limit: Arc<RateLimitTracker>,
}

impl BinanceClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Unauthenticated client for public endpoints only.
    pub fn public(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::build(base_url.into(), None, timeout)
    }

    /// Client that attaches `X-MBX-APIKEY` to every request and can sign.
    ///
    /// # Arguments
    /// * `api_key` — Binance API key (sent as a header, never in query params).
    /// * `secret`  — Binance secret key used exclusively for HMAC signing.
    pub fn with_credentials(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let credentials = Credentials {
            api_key: api_key.into(),
            secret: secret.into(),
        };
        Self::build(base_url.into(), Some(credentials), timeout)
    }

    fn build(base_url: String, credentials: Option<Credentials>, timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        if let Some(creds) = &credentials {
            let val = HeaderValue::from_str(&creds.api_key)
                .context("API key contains characters not allowed in a header")?;
            default_headers.insert("X-MBX-APIKEY", val);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        debug!(
            base_url = %base_url,
            authenticated = credentials.is_some(),
            "BinanceClient initialised"
        );

        Ok(Self {
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            rate_limit: Arc::new(RateLimitTracker::new()),
        })
    }

    /// Shared handle to the request-weight tracker fed by this client.
    pub fn rate_limit_tracker(&self) -> Arc<RateLimitTracker> {
        self.rate_limit.clone()
    }

    // -------------------------------------------------------------------------
    // Signing helpers
    // -------------------------------------------------------------------------

    /// Produce an HMAC-SHA256 hex signature of `query`.
    fn sign(secret: &str, query: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("HMAC key rejected: {e}"))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Current UNIX timestamp in milliseconds.
    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Build the full query string for a signed request (appends timestamp,
    /// recvWindow, and signature).
    fn signed_query(secret: &str, params: &str, ts: u64) -> Result<String> {
        let base = if params.is_empty() {
            format!("timestamp={ts}&recvWindow={RECV_WINDOW}")
        } else {
            format!("{params}&timestamp={ts}&recvWindow={RECV_WINDOW}")
        };
        let sig = Self::sign(secret, &base)?;
        Ok(format!("{base}&signature={sig}"))
    }

    // -------------------------------------------------------------------------
    // Account
    // -------------------------------------------------------------------------

    /// GET /fapi/v2/account (signed). Succeeds only if the exchange accepts
    /// the configured key and signature.
    #[instrument(skip(self), name = "binance::verify_credentials")]
    pub async fn verify_credentials(&self) -> Result<()> {
        let creds = self
            .credentials
            .as_ref()
            .context("no API credentials configured")?;

        let qs = Self::signed_query(&creds.secret, "", Self::timestamp_ms())?;
        let url = format!("{}/fapi/v2/account?{}", self.base_url, qs);

        self.get_json(&url, "GET /fapi/v2/account").await?;
        debug!("futures account credentials accepted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /fapi/v1/exchangeInfo, keeping only symbols in `TRADING` status.
    #[instrument(skip(self), name = "binance::get_trading_symbols")]
    pub async fn get_trading_symbols(&self) -> Result<Vec<String>> {
        if !self.rate_limit.can_send_request(EXCHANGE_INFO_WEIGHT) {
            anyhow::bail!("exchangeInfo skipped: request weight budget exhausted");
        }

        let url = format!("{}/fapi/v1/exchangeInfo", self.base_url);
        let body = self.get_json(&url, "GET /fapi/v1/exchangeInfo").await?;

        let info: ExchangeInfo =
            serde_json::from_value(body).context("unexpected exchangeInfo payload")?;

        let symbols: Vec<String> = info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| s.symbol)
            .collect();

        debug!(count = symbols.len(), "trading symbols retrieved");
        Ok(symbols)
    }

    /// GET /fapi/v1/klines (public — no signature required).
    ///
    /// Array indices:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
    ///   [6] closeTime, [7] quoteAssetVolume, [8] numberOfTrades,
    ///   [9] takerBuyBaseVolume, [10] takerBuyQuoteVolume, [11] ignore
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        if !self.rate_limit.can_send_request(klines_weight(limit)) {
            anyhow::bail!("klines for {symbol} skipped: request weight budget exhausted");
        }

        let url = format!(
            "{}/fapi/v1/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );
        let body = self.get_json(&url, "GET /fapi/v1/klines").await?;

        let candles = parse_klines(&body)?;
        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    async fn get_json(&self, url: &str, what: &str) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("{what} request failed"))?;

        self.rate_limit.update_from_headers(resp.headers());

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {what} response"))?;

        if !status.is_success() {
            anyhow::bail!("Binance {} returned {}: {}", what, status, body);
        }
        Ok(body)
    }
}

/// Parse the array-of-arrays klines payload into candles, skipping rows that
/// are too short to hold the OHLCV fields.
fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body
        .as_array()
        .context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());

    for entry in raw {
        let arr = entry
            .as_array()
            .context("kline entry is not an array")?;

        if arr.len() < 7 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }

        let open_time = arr[0].as_i64().unwrap_or(0);
        let open = parse_str_f64(&arr[1])?;
        let high = parse_str_f64(&arr[2])?;
        let low = parse_str_f64(&arr[3])?;
        let close = parse_str_f64(&arr[4])?;
        let volume = parse_str_f64(&arr[5])?;
        let close_time = arr[6].as_i64().unwrap_or(0);

        candles.push(Candle::new(open_time, open, high, low, close, volume, close_time));
    }

    Ok(candles)
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}

#[async_trait]
impl MarketDataGateway for BinanceClient {
    async fn list_tradable_symbols(&self) -> Result<Vec<String>> {
        self.get_trading_symbols().await
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        self.get_klines(symbol, interval, limit).await
    }

    fn mode(&self) -> GatewayMode {
        if self.credentials.is_some() {
            GatewayMode::Live
        } else {
            GatewayMode::Public
        }
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = self.credentials.as_ref().map(|_| "<redacted>");
        f.debug_struct("BinanceClient")
            .field("api_key", &redacted)
            .field("secret", &redacted)
            .field("base_url", &self.base_url)
            .finish()
    }
}
