//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path counters to avoid mutex contention. All atomics
//! use Relaxed ordering intentionally: these are statistical counters only,
//! never used for coordination or logic decisions.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Lock-free metrics collector.
///
/// All recording operations are atomic increments; `report()` swaps the
/// periodic counters to get a consistent snapshot while updates continue.
pub struct Metrics {
    /// Total poll cycles completed (monotonic)
    poll_cycles_total: AtomicU64,
    /// Snapshots successfully read since last report
    snapshots_since_report: AtomicU64,
    /// Sensor read errors (monotonic)
    read_errors_total: AtomicU64,
    /// Intrusion classifications, anything but false_alarm (monotonic)
    intrusions_total: AtomicU64,
    /// Beam-loss escalations (monotonic)
    beam_losses_total: AtomicU64,
    /// Alarm sessions started (monotonic)
    alarms_started_total: AtomicU64,
    /// Alarm sessions cancelled (monotonic)
    alarms_cancelled_total: AtomicU64,
    /// Relay sends carried by the primary channel (monotonic)
    relay_primary_total: AtomicU64,
    /// Relay sends that fell back to the secondary channel (monotonic)
    relay_fallback_total: AtomicU64,
    /// Relay sends where both channels failed (monotonic)
    relay_failed_total: AtomicU64,
    /// Route recomputations (monotonic)
    route_recomputes_total: AtomicU64,
    /// Recomputations that found the ring partitioned (monotonic)
    route_partitions_total: AtomicU64,
    /// Last report time for rate calculation
    last_report_time: Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            poll_cycles_total: AtomicU64::new(0),
            snapshots_since_report: AtomicU64::new(0),
            read_errors_total: AtomicU64::new(0),
            intrusions_total: AtomicU64::new(0),
            beam_losses_total: AtomicU64::new(0),
            alarms_started_total: AtomicU64::new(0),
            alarms_cancelled_total: AtomicU64::new(0),
            relay_primary_total: AtomicU64::new(0),
            relay_fallback_total: AtomicU64::new(0),
            relay_failed_total: AtomicU64::new(0),
            route_recomputes_total: AtomicU64::new(0),
            route_partitions_total: AtomicU64::new(0),
            last_report_time: Mutex::new(Instant::now()),
        }
    }

    pub fn record_poll_cycle(&self) {
        self.poll_cycles_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_read(&self) {
        self.snapshots_since_report.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_error(&self) {
        self.read_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_intrusion(&self) {
        self.intrusions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_beam_loss(&self) {
        self.beam_losses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alarm_started(&self) {
        self.alarms_started_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alarm_cancelled(&self) {
        self.alarms_cancelled_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_relay_primary(&self) {
        self.relay_primary_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_relay_fallback(&self) {
        self.relay_fallback_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_relay_failed(&self) {
        self.relay_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_route_recompute(&self) {
        self.route_recomputes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_route_partition(&self) {
        self.route_partitions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn poll_cycles_total(&self) -> u64 {
        self.poll_cycles_total.load(Ordering::Relaxed)
    }

    pub fn relay_failed_total(&self) -> u64 {
        self.relay_failed_total.load(Ordering::Relaxed)
    }

    /// Calculate and return a metrics summary, resetting the periodic counters
    pub fn report(&self) -> MetricsSummary {
        let snapshots = self.snapshots_since_report.swap(0, Ordering::Relaxed);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let snapshots_per_sec = if elapsed.as_secs_f64() > 0.0 {
            snapshots as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        MetricsSummary {
            poll_cycles: self.poll_cycles_total.load(Ordering::Relaxed),
            snapshots_per_sec,
            read_errors: self.read_errors_total.load(Ordering::Relaxed),
            intrusions: self.intrusions_total.load(Ordering::Relaxed),
            beam_losses: self.beam_losses_total.load(Ordering::Relaxed),
            alarms_started: self.alarms_started_total.load(Ordering::Relaxed),
            alarms_cancelled: self.alarms_cancelled_total.load(Ordering::Relaxed),
            relay_primary: self.relay_primary_total.load(Ordering::Relaxed),
            relay_fallback: self.relay_fallback_total.load(Ordering::Relaxed),
            relay_failed: self.relay_failed_total.load(Ordering::Relaxed),
            route_recomputes: self.route_recomputes_total.load(Ordering::Relaxed),
            route_partitions: self.route_partitions_total.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counters for the periodic reporter
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub poll_cycles: u64,
    pub snapshots_per_sec: f64,
    pub read_errors: u64,
    pub intrusions: u64,
    pub beam_losses: u64,
    pub alarms_started: u64,
    pub alarms_cancelled: u64,
    pub relay_primary: u64,
    pub relay_fallback: u64,
    pub relay_failed: u64,
    pub route_recomputes: u64,
    pub route_partitions: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            poll_cycles = %self.poll_cycles,
            snapshots_per_sec = format!("{:.1}", self.snapshots_per_sec),
            read_errors = %self.read_errors,
            intrusions = %self.intrusions,
            beam_losses = %self.beam_losses,
            alarms_started = %self.alarms_started,
            alarms_cancelled = %self.alarms_cancelled,
            relay_primary = %self.relay_primary,
            relay_fallback = %self.relay_fallback,
            relay_failed = %self.relay_failed,
            route_recomputes = %self.route_recomputes,
            route_partitions = %self.route_partitions,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.poll_cycles_total(), 0);
        assert_eq!(metrics.relay_failed_total(), 0);
    }

    #[test]
    fn test_record_and_report() {
        let metrics = Metrics::new();

        metrics.record_poll_cycle();
        metrics.record_snapshot_read();
        metrics.record_snapshot_read();
        metrics.record_intrusion();
        metrics.record_relay_primary();
        metrics.record_relay_failed();

        let summary = metrics.report();
        assert_eq!(summary.poll_cycles, 1);
        assert_eq!(summary.intrusions, 1);
        assert_eq!(summary.relay_primary, 1);
        assert_eq!(summary.relay_failed, 1);

        // Periodic counter resets, monotonic ones do not
        let summary = metrics.report();
        assert_eq!(summary.snapshots_per_sec, 0.0);
        assert_eq!(summary.poll_cycles, 1);
    }
}
