//! Threshold evaluation over host snapshots.
//!
//! Pure decision logic: the engine never touches the store or the clock. The
//! scheduler feeds it the snapshot plus the open alerts already on record and
//! persists whatever comes back.

use chrono::{DateTime, Duration, Utc};

use crate::config::AlertsConfig;
use crate::types::{Alert, NewAlert, ServerStats};

pub const KIND_CPU: &str = "CPU";
pub const KIND_MEMORY: &str = "Memory";
pub const KIND_DISK: &str = "Disk";

pub struct AlertEngine {
    cpu_threshold: f64,
    memory_threshold: f64,
    disk_threshold: f64,
    suppression: Duration,
}

impl AlertEngine {
    pub fn new(cfg: &AlertsConfig) -> Self {
        Self {
            cpu_threshold: cfg.cpu_threshold,
            memory_threshold: cfg.memory_threshold,
            disk_threshold: cfg.disk_threshold,
            suppression: Duration::seconds(cfg.suppression_secs as i64),
        }
    }

    pub fn suppression(&self) -> Duration {
        self.suppression
    }

    /// Decide which alerts a snapshot raises. A metric strictly above its
    /// threshold raises one alert of its kind unless an unresolved alert of
    /// that kind already sits inside the suppression window. The window
    /// slides against the snapshot timestamp, not the wall clock.
    pub fn evaluate(&self, stats: &ServerStats, open_alerts: &[Alert]) -> Vec<NewAlert> {
        let checks = [
            (
                KIND_CPU,
                stats.cpu_usage_percent,
                self.cpu_threshold,
                "High CPU usage",
            ),
            (
                KIND_MEMORY,
                stats.memory_usage_percent,
                self.memory_threshold,
                "High memory usage",
            ),
            (
                KIND_DISK,
                stats.disk_usage_percent,
                self.disk_threshold,
                "High disk usage",
            ),
        ];

        let mut raised = Vec::new();
        for (kind, value, threshold, label) in checks {
            if value <= threshold {
                continue;
            }
            if self.suppressed(kind, stats.timestamp, open_alerts) {
                continue;
            }
            raised.push(NewAlert {
                kind,
                message: format!("{label}: {value:.1}%"),
                created_at: stats.timestamp,
            });
        }
        raised
    }

    fn suppressed(&self, kind: &str, at: DateTime<Utc>, open_alerts: &[Alert]) -> bool {
        let window_start = at - self.suppression;
        open_alerts
            .iter()
            .any(|a| !a.is_resolved && a.kind == kind && a.created_at > window_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn engine() -> AlertEngine {
        AlertEngine::new(&AlertsConfig::default())
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 21, hour, minute, 0).unwrap()
    }

    fn stats(cpu: f64, memory: f64, disk: f64, timestamp: DateTime<Utc>) -> ServerStats {
        ServerStats {
            timestamp,
            cpu_usage_percent: cpu,
            memory_total_gb: 32.0,
            memory_used_gb: 16.0,
            memory_usage_percent: memory,
            disk_total_gb: 500.0,
            disk_used_gb: 250.0,
            disk_usage_percent: disk,
            process_count: 200,
            uptime_days: 3.0,
        }
    }

    fn open_alert(kind: &str, created_at: DateTime<Utc>) -> Alert {
        Alert {
            id: 1,
            kind: kind.to_string(),
            message: String::new(),
            created_at,
            is_resolved: false,
            resolved_at: None,
        }
    }

    #[test]
    fn high_cpu_raises_one_alert() {
        let raised = engine().evaluate(&stats(95.0, 50.0, 50.0, at(12, 0)), &[]);
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].kind, KIND_CPU);
        assert_eq!(raised[0].message, "High CPU usage: 95.0%");
    }

    #[test]
    fn threshold_is_strict() {
        assert!(engine()
            .evaluate(&stats(90.0, 90.0, 90.0, at(12, 0)), &[])
            .is_empty());
    }

    #[test]
    fn each_metric_raises_independently() {
        let raised = engine().evaluate(&stats(95.0, 96.0, 97.0, at(12, 0)), &[]);
        let kinds: Vec<&str> = raised.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![KIND_CPU, KIND_MEMORY, KIND_DISK]);
        assert_eq!(raised[2].message, "High disk usage: 97.0%");
    }

    #[test]
    fn open_alert_inside_window_suppresses() {
        let open = [open_alert(KIND_CPU, at(11, 30))];
        let raised = engine().evaluate(&stats(95.0, 50.0, 50.0, at(12, 0)), &open);
        assert!(raised.is_empty());
    }

    #[test]
    fn alert_older_than_window_does_not_suppress() {
        let open = [open_alert(KIND_CPU, at(10, 30))];
        let raised = engine().evaluate(&stats(95.0, 50.0, 50.0, at(12, 0)), &open);
        assert_eq!(raised.len(), 1);
    }

    #[test]
    fn resolved_alert_never_suppresses() {
        let mut resolved = open_alert(KIND_CPU, at(11, 55));
        resolved.is_resolved = true;
        resolved.resolved_at = Some(at(11, 58));
        let raised = engine().evaluate(&stats(95.0, 50.0, 50.0, at(12, 0)), &[resolved]);
        assert_eq!(raised.len(), 1);
    }

    #[test]
    fn suppression_is_per_kind() {
        let open = [open_alert(KIND_CPU, at(11, 55))];
        let raised = engine().evaluate(&stats(95.0, 96.0, 50.0, at(12, 0)), &open);
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].kind, KIND_MEMORY);
    }

    #[test]
    fn window_slides_with_snapshot_time() {
        // open alert is 59 minutes before the snapshot: still suppressing
        let open = [open_alert(KIND_DISK, at(11, 1))];
        assert!(engine()
            .evaluate(&stats(50.0, 50.0, 95.0, at(12, 0)), &open)
            .is_empty());
        // the same alert against a snapshot an hour later is stale
        let raised = engine().evaluate(&stats(50.0, 50.0, 95.0, at(13, 0)), &open);
        assert_eq!(raised.len(), 1);
    }

    #[test]
    fn alerts_carry_snapshot_timestamp() {
        let ts = at(12, 0);
        let raised = engine().evaluate(&stats(95.0, 50.0, 50.0, ts), &[]);
        assert_eq!(raised[0].created_at, ts);
    }
}
