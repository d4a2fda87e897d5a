// =============================================================================
// Scan Report — a scan result plus the timing metadata around it
// =============================================================================
//
// The scanner itself knows nothing about wall-clock scheduling. The driver
// wraps each `run_scan` call, measures it, and stamps when the next refresh is
// due. This is the payload served by `GET /api/v1/scan`.
// =============================================================================

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::scanner::{ScanResult, Scanner};
use crate::types::GatewayMode;

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Unique identifier for this scan (UUID v4), for log correlation.
    pub scan_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the scan, rounded to centiseconds.
    pub scan_duration_secs: f64,
    pub next_refresh_at: DateTime<Utc>,
    pub refresh_interval_secs: u64,
    pub gateway_mode: GatewayMode,
    #[serde(flatten)]
    pub result: ScanResult,
}

impl ScanReport {
    /// Run one scan and wrap it with timing metadata.
    pub async fn capture(scanner: &Scanner, refresh_interval: Duration) -> Self {
        let scan_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();

        let result = scanner.run_scan().await;

        let elapsed = clock.elapsed();
        let finished_at = Utc::now();
        let next_refresh_at = next_refresh(started_at, finished_at, refresh_interval);

        Self {
            scan_id,
            started_at,
            scan_duration_secs: (elapsed.as_secs_f64() * 100.0).round() / 100.0,
            next_refresh_at,
            refresh_interval_secs: refresh_interval.as_secs(),
            gateway_mode: scanner.gateway().mode(),
            result,
        }
    }
}

/// Scans start on a fixed cadence. A scan that overruns its interval is
/// followed immediately by the next one.
fn next_refresh(
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    interval: Duration,
) -> DateTime<Utc> {
    let scheduled = chrono::Duration::from_std(interval)
        .ok()
        .and_then(|d| started_at.checked_add_signed(d))
        .unwrap_or(finished_at);
    scheduled.max(finished_at)
}
