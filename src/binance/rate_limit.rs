// =============================================================================
// Rate-Limit Tracker — monitors USD-M futures request weight to avoid 429s
// =============================================================================
//
// Binance futures enforce a request-weight budget of 2400 per minute per IP.
// A full scan touches every USDT perpetual once, so a fast refresh interval
// combined with a wide universe can get close to it. We hard-cap ourselves
// below the exchange limit.
//
// The tracker reads the `X-MBX-USED-WEIGHT-1M` response header after every
// request and keeps an atomic counter that any task may query lock-free.
// The exchange resets the counter at each minute boundary, so a reading only
// counts within the minute it was reported in; after that the budget is
// considered fresh again.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, warn};

/// Hard ceiling at which we refuse to send additional requests.
const WEIGHT_HARD_LIMIT: u32 = 2000;
/// Soft warning threshold.
const WEIGHT_WARN_THRESHOLD: u32 = 1600;
/// Length of the exchange's weight window.
const WINDOW_MS: u64 = 60_000;

/// Request weight of `GET /fapi/v1/klines` for a given `limit`.
pub fn klines_weight(limit: usize) -> u32 {
    match limit {
        0..=99 => 1,
        100..=499 => 2,
        500..=1000 => 5,
        _ => 10,
    }
}

fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

fn minute_of(ms: u64) -> u64 {
    ms / WINDOW_MS
}

/// Thread-safe rate-limit tracker backed by atomic counters.
pub struct RateLimitTracker {
    used_weight_1m: AtomicU32,
    /// Minute index (epoch ms / 60 000) of the last header reading.
    window_minute: AtomicU64,
}

/// Immutable snapshot of the current rate-limit state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub used_weight_1m: u32,
    pub hard_limit: u32,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            used_weight_1m: AtomicU32::new(0),
            window_minute: AtomicU64::new(0),
        }
    }

    /// Update the weight counter from the HTTP response headers.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let Some(w) = headers
            .get("X-MBX-USED-WEIGHT-1M")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok())
        else {
            return;
        };
        self.record_weight_at(w, now_ms());
    }

    /// Store a weight reading taken at `now_ms`.
    pub fn record_weight_at(&self, weight: u32, now_ms: u64) {
        let prev = self.used_weight_at(now_ms);
        self.window_minute.store(minute_of(now_ms), Ordering::Relaxed);
        self.used_weight_1m.store(weight, Ordering::Relaxed);

        if weight >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "rate-limit weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = weight, "rate-limit weight updated from header");
    }

    /// Weight spent in the minute containing `now_ms`. A reading from an
    /// earlier minute no longer applies.
    fn used_weight_at(&self, now_ms: u64) -> u32 {
        if self.window_minute.load(Ordering::Relaxed) != minute_of(now_ms) {
            return 0;
        }
        self.used_weight_1m.load(Ordering::Relaxed)
    }

    /// Return `true` if we can afford to spend `weight` more request weight
    /// without exceeding the hard limit.
    pub fn can_send_request(&self, weight: u32) -> bool {
        self.can_send_request_at(weight, now_ms())
    }

    pub fn can_send_request_at(&self, weight: u32, now_ms: u64) -> bool {
        let current = self.used_weight_at(now_ms);
        let allowed = current.saturating_add(weight) <= WEIGHT_HARD_LIMIT;
        if !allowed {
            warn!(
                current_weight = current,
                requested_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "request blocked — would exceed rate-limit"
            );
        }
        allowed
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            used_weight_1m: self.used_weight_at(now_ms()),
            hard_limit: WEIGHT_HARD_LIMIT,
        }
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("used_weight_1m", &self.used_weight_1m.load(Ordering::Relaxed))
            .field("window_minute", &self.window_minute.load(Ordering::Relaxed))
            .finish()
    }
}
