use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;

/// Daemon counters shared between the scheduler and the status endpoint.
#[derive(Debug)]
pub struct Metrics {
    started_at: i64,
    passes_completed: AtomicU64,
    passes_failed: AtomicU64,
    alerts_raised: AtomicU64,
    // epoch seconds of the last persisted sample, 0 = never
    last_sample_at: AtomicI64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now().timestamp(),
            passes_completed: AtomicU64::new(0),
            passes_failed: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            last_sample_at: AtomicI64::new(0),
        }
    }

    pub fn record_pass(&self, alerts_raised: u64) {
        self.passes_completed.fetch_add(1, Ordering::Relaxed);
        self.alerts_raised.fetch_add(alerts_raised, Ordering::Relaxed);
        self.last_sample_at
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn record_failed_pass(&self) {
        self.passes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let last = self.last_sample_at.load(Ordering::Relaxed);
        MetricsSnapshot {
            version: env!("CARGO_PKG_VERSION"),
            uptime_s: (Utc::now().timestamp() - self.started_at).max(0) as u64,
            passes_completed: self.passes_completed.load(Ordering::Relaxed),
            passes_failed: self.passes_failed.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            last_sample_at: (last > 0).then_some(last),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub version: &'static str,
    pub uptime_s: u64,
    pub passes_completed: u64,
    pub passes_failed: u64,
    pub alerts_raised: u64,
    pub last_sample_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_pass(0);
        metrics.record_pass(2);
        metrics.record_failed_pass();

        let snap = metrics.snapshot();
        assert_eq!(snap.passes_completed, 2);
        assert_eq!(snap.passes_failed, 1);
        assert_eq!(snap.alerts_raised, 2);
        assert!(snap.last_sample_at.is_some());
    }

    #[test]
    fn fresh_metrics_have_no_sample() {
        let snap = Metrics::new().snapshot();
        assert_eq!(snap.passes_completed, 0);
        assert_eq!(snap.last_sample_at, None);
        assert_eq!(snap.version, env!("CARGO_PKG_VERSION"));
    }
}
