// =============================================================================
// Central Application State — shared between the scan loop and the API
// =============================================================================
//
// The scan loop is the only writer: it replaces the latest report wholesale
// after every scan. API handlers only read.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock around the latest report.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::binance::rate_limit::{RateLimitSnapshot, RateLimitTracker};
use crate::runtime_config::RuntimeConfig;
use crate::scan_report::ScanReport;
use crate::types::GatewayMode;

/// Application state shared across tasks via `Arc<AppState>`.
pub struct AppState {
    /// Incremented every time a new report is published.
    pub state_version: AtomicU64,

    pub runtime_config: RuntimeConfig,
    pub gateway_mode: GatewayMode,
    rate_limit: Option<Arc<RateLimitTracker>>,

    latest_report: RwLock<Option<ScanReport>>,

    /// Instant when the process started. Used for uptime.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(runtime_config: RuntimeConfig, gateway_mode: GatewayMode) -> Self {
        Self {
            state_version: AtomicU64::new(0),
            runtime_config,
            gateway_mode,
            rate_limit: None,
            latest_report: RwLock::new(None),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_rate_limit(mut self, tracker: Arc<RateLimitTracker>) -> Self {
        self.rate_limit = Some(tracker);
        self
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Reports ─────────────────────────────────────────────────────────

    /// Replace the latest report. Previous results are discarded.
    pub fn publish_report(&self, report: ScanReport) -> u64 {
        *self.latest_report.write() = Some(report);
        self.state_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest_report(&self) -> Option<ScanReport> {
        self.latest_report.read().clone()
    }

    pub fn rate_limit(&self) -> Option<RateLimitSnapshot> {
        self.rate_limit.as_ref().map(|t| t.snapshot())
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::scanner::Scanner;
    use crate::test_support::FakeGateway;

    async fn empty_report() -> ScanReport {
        let scanner = Scanner::new(Arc::new(FakeGateway::with_symbols(&[])), &RuntimeConfig::default());
        ScanReport::capture(&scanner, Duration::from_secs(60)).await
    }

    #[test]
    fn fresh_state_has_no_report() {
        let state = AppState::new(RuntimeConfig::default(), GatewayMode::Public);
        assert!(state.latest_report().is_none());
        assert_eq!(state.current_state_version(), 0);
        assert!(state.rate_limit().is_none());
    }

    #[tokio::test]
    async fn publishing_replaces_report_and_bumps_version() {
        let state = AppState::new(RuntimeConfig::default(), GatewayMode::Public);

        let first = empty_report().await;
        let first_id = first.scan_id;
        assert_eq!(state.publish_report(first), 1);

        let second = empty_report().await;
        let second_id = second.scan_id;
        assert_eq!(state.publish_report(second), 2);

        let latest = state.latest_report().unwrap();
        assert_eq!(latest.scan_id, second_id);
        assert_ne!(latest.scan_id, first_id);
    }

    #[test]
    fn rate_limit_snapshot_is_exposed_when_attached() {
        let state = AppState::new(RuntimeConfig::default(), GatewayMode::Live)
            .with_rate_limit(Arc::new(RateLimitTracker::new()));
        assert_eq!(state.rate_limit().unwrap().used_weight_1m, 0);
    }
}
