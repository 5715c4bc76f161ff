//! Dispatch loop metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters maintained by the dispatch loop.
#[derive(Debug, Default)]
pub struct LoopMetrics {
    /// Completed scan passes.
    pub scans: AtomicU64,

    /// Messages processed at kernel scope.
    pub messages_drained: AtomicU64,

    /// Idle waits cut short by a notification.
    pub wakeups: AtomicU64,

    /// Time spent parked between passes (microseconds).
    pub idle_time_us: AtomicU64,

    start_time: parking_lot::RwLock<Option<Instant>>,
}

impl LoopMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of the loop.
    pub fn mark_start(&self) {
        *self.start_time.write() = Some(Instant::now());
    }

    /// Uptime in milliseconds, zero if never started.
    pub fn uptime_ms(&self) -> u64 {
        self.start_time
            .read()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    pub fn record_scan(&self, drained: u64) {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.messages_drained.fetch_add(drained, Ordering::Relaxed);
    }

    pub fn record_wakeup(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_idle_time(&self, idle: Duration) {
        self.idle_time_us
            .fetch_add(idle.as_micros() as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of the metrics.
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        LoopMetricsSnapshot {
            uptime_ms: self.uptime_ms(),
            scans: self.scans.load(Ordering::Relaxed),
            messages_drained: self.messages_drained.load(Ordering::Relaxed),
            wakeups: self.wakeups.load(Ordering::Relaxed),
            idle_time_us: self.idle_time_us.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LoopMetrics`].
#[derive(Debug, Clone, Serialize)]
pub struct LoopMetricsSnapshot {
    pub uptime_ms: u64,
    pub scans: u64,
    pub messages_drained: u64,
    pub wakeups: u64,
    pub idle_time_us: u64,
}

impl LoopMetricsSnapshot {
    /// Average messages drained per scan pass.
    pub fn messages_per_scan(&self) -> f64 {
        if self.scans == 0 {
            return 0.0;
        }
        self.messages_drained as f64 / self.scans as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let snapshot = LoopMetrics::new().snapshot();
        assert_eq!(snapshot.scans, 0);
        assert_eq!(snapshot.messages_drained, 0);
        assert_eq!(snapshot.uptime_ms, 0);
    }

    #[test]
    fn test_record_scan() {
        let metrics = LoopMetrics::new();
        metrics.record_scan(3);
        metrics.record_scan(0);
        metrics.record_scan(5);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.scans, 3);
        assert_eq!(snapshot.messages_drained, 8);
    }

    #[test]
    fn test_record_wakeup_and_idle() {
        let metrics = LoopMetrics::new();
        metrics.record_wakeup();
        metrics.record_idle_time(Duration::from_millis(2));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.wakeups, 1);
        assert_eq!(snapshot.idle_time_us, 2000);
    }

    #[test]
    fn test_messages_per_scan() {
        let metrics = LoopMetrics::new();
        assert_eq!(metrics.snapshot().messages_per_scan(), 0.0);
        metrics.record_scan(4);
        metrics.record_scan(2);
        assert!((metrics.snapshot().messages_per_scan() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = LoopMetrics::new();
        metrics.record_scan(1);
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["messages_drained"], 1);
        assert_eq!(json["scans"], 1);
    }
}
