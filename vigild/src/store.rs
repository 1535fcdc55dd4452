//! SQLite-backed history for snapshots and alerts.
//!
//! Two append-mostly tables: `server_stats` rows are immutable once written,
//! `alerts` rows flip `is_resolved` exactly once. Timestamps are stored as
//! epoch seconds.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::scheduler::SampleSink;
use crate::types::{Alert, NewAlert, ServerStats};

pub struct MonitorStore {
    pool: SqlitePool,
}

impl MonitorStore {
    /// Open (or create) the database at the given path and ensure the schema
    /// exists.
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, sqlx::Error> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS server_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                cpu_usage_percent REAL NOT NULL,
                memory_total_gb REAL NOT NULL,
                memory_used_gb REAL NOT NULL,
                memory_usage_percent REAL NOT NULL,
                disk_total_gb REAL NOT NULL,
                disk_used_gb REAL NOT NULL,
                disk_usage_percent REAL NOT NULL,
                process_count INTEGER NOT NULL,
                uptime_days REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_stats_timestamp ON server_stats(timestamp);

            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                is_resolved INTEGER NOT NULL DEFAULT 0,
                resolved_at INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_alerts_created ON alerts(created_at);
            CREATE INDEX IF NOT EXISTS idx_alerts_open ON alerts(is_resolved, created_at);
            "#,
        )
        .execute(&pool)
        .await?;

        info!("[store] opened {}", db_path.as_ref().display());
        Ok(Self { pool })
    }

    /// Append one snapshot, returning its row id.
    pub async fn record_stats(&self, stats: &ServerStats) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO server_stats (
                timestamp, cpu_usage_percent,
                memory_total_gb, memory_used_gb, memory_usage_percent,
                disk_total_gb, disk_used_gb, disk_usage_percent,
                process_count, uptime_days
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(stats.timestamp.timestamp())
        .bind(stats.cpu_usage_percent)
        .bind(stats.memory_total_gb)
        .bind(stats.memory_used_gb)
        .bind(stats.memory_usage_percent)
        .bind(stats.disk_total_gb)
        .bind(stats.disk_used_gb)
        .bind(stats.disk_usage_percent)
        .bind(stats.process_count as i64)
        .bind(stats.uptime_days)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Most recent snapshots, newest first.
    pub async fn recent_stats(&self, limit: i64) -> Result<Vec<ServerStats>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, cpu_usage_percent,
                   memory_total_gb, memory_used_gb, memory_usage_percent,
                   disk_total_gb, disk_used_gb, disk_usage_percent,
                   process_count, uptime_days
            FROM server_stats
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(stats_from_row).collect())
    }

    /// Append one alert, returning its row id.
    ///
    /// The suppression read and this insert are serialized only by the
    /// single scheduler loop; concurrent collectors would need both in one
    /// transaction keyed by alert kind.
    pub async fn record_alert(&self, alert: &NewAlert) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO alerts (kind, message, created_at) VALUES (?, ?, ?)")
                .bind(alert.kind)
                .bind(&alert.message)
                .bind(alert.created_at.timestamp())
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Alerts newest first, unresolved only unless `include_resolved`.
    pub async fn alerts(
        &self,
        include_resolved: bool,
        limit: i64,
    ) -> Result<Vec<Alert>, sqlx::Error> {
        let sql = if include_resolved {
            "SELECT id, kind, message, created_at, is_resolved, resolved_at
             FROM alerts ORDER BY created_at DESC LIMIT ?"
        } else {
            "SELECT id, kind, message, created_at, is_resolved, resolved_at
             FROM alerts WHERE is_resolved = 0 ORDER BY created_at DESC LIMIT ?"
        };
        let rows = sqlx::query(sql).bind(limit).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(alert_from_row).collect())
    }

    /// Unresolved alerts created at or after the cutoff, any kind.
    pub async fn unresolved_alerts_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Alert>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, kind, message, created_at, is_resolved, resolved_at
             FROM alerts WHERE is_resolved = 0 AND created_at >= ?
             ORDER BY created_at DESC",
        )
        .bind(cutoff.timestamp())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(alert_from_row).collect())
    }

    /// Mark an alert resolved. Returns false when the id is unknown or the
    /// alert was already resolved; resolution happens at most once.
    pub async fn resolve_alert(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE alerts SET is_resolved = 1, resolved_at = ? WHERE id = ? AND is_resolved = 0",
        )
        .bind(Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl SampleSink for MonitorStore {
    async fn persist_stats(&self, stats: &ServerStats) -> Result<()> {
        self.record_stats(stats).await?;
        Ok(())
    }

    async fn open_alerts_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Alert>> {
        Ok(self.unresolved_alerts_since(cutoff).await?)
    }

    async fn persist_alert(&self, alert: &NewAlert) -> Result<()> {
        self.record_alert(alert).await?;
        Ok(())
    }
}

fn epoch_to_utc(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

fn stats_from_row(row: &SqliteRow) -> ServerStats {
    ServerStats {
        timestamp: epoch_to_utc(row.get(0)),
        cpu_usage_percent: row.get(1),
        memory_total_gb: row.get(2),
        memory_used_gb: row.get(3),
        memory_usage_percent: row.get(4),
        disk_total_gb: row.get(5),
        disk_used_gb: row.get(6),
        disk_usage_percent: row.get(7),
        process_count: row.get::<i64, _>(8) as u64,
        uptime_days: row.get(9),
    }
}

fn alert_from_row(row: &SqliteRow) -> Alert {
    Alert {
        id: row.get(0),
        kind: row.get(1),
        message: row.get(2),
        created_at: epoch_to_utc(row.get(3)),
        is_resolved: row.get(4),
        resolved_at: row.get::<Option<i64>, _>(5).map(epoch_to_utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn test_store() -> (TempDir, MonitorStore) {
        let dir = TempDir::new().unwrap();
        let store = MonitorStore::new(dir.path().join("vigil.db")).await.unwrap();
        (dir, store)
    }

    fn sample_stats(ts: DateTime<Utc>) -> ServerStats {
        ServerStats {
            timestamp: ts,
            cpu_usage_percent: 12.5,
            memory_total_gb: 32.0,
            memory_used_gb: 8.0,
            memory_usage_percent: 25.0,
            disk_total_gb: 457.0,
            disk_used_gb: 234.0,
            disk_usage_percent: 54.0,
            process_count: 312,
            uptime_days: 5.2,
        }
    }

    fn alert_at(ts: DateTime<Utc>) -> NewAlert {
        NewAlert {
            kind: "CPU",
            message: "High CPU usage: 95.0%".to_string(),
            created_at: ts,
        }
    }

    #[tokio::test]
    async fn stats_round_trip() {
        let (_dir, store) = test_store().await;
        let now = epoch_to_utc(Utc::now().timestamp());

        store.record_stats(&sample_stats(now)).await.unwrap();
        store
            .record_stats(&sample_stats(now - Duration::minutes(1)))
            .await
            .unwrap();

        let recent = store.recent_stats(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        // newest first
        assert_eq!(recent[0].timestamp, now);
        assert_eq!(recent[0].cpu_usage_percent, 12.5);
        assert_eq!(recent[0].process_count, 312);

        let limited = store.recent_stats(1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn alert_round_trip_and_filtering() {
        let (_dir, store) = test_store().await;
        let now = epoch_to_utc(Utc::now().timestamp());

        let first = store.record_alert(&alert_at(now)).await.unwrap();
        store
            .record_alert(&alert_at(now - Duration::minutes(5)))
            .await
            .unwrap();

        let open = store.alerts(false, 10).await.unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].id, first);
        assert_eq!(open[0].kind, "CPU");
        assert_eq!(open[0].message, "High CPU usage: 95.0%");
        assert!(!open[0].is_resolved);
        assert_eq!(open[0].resolved_at, None);

        assert!(store.resolve_alert(first).await.unwrap());

        let open = store.alerts(false, 10).await.unwrap();
        assert_eq!(open.len(), 1);
        let all = store.alerts(true, 10).await.unwrap();
        assert_eq!(all.len(), 2);
        let resolved = all.iter().find(|a| a.id == first).unwrap();
        assert!(resolved.is_resolved);
        assert!(resolved.resolved_at.is_some());
    }

    #[tokio::test]
    async fn resolve_happens_at_most_once() {
        let (_dir, store) = test_store().await;
        let id = store.record_alert(&alert_at(Utc::now())).await.unwrap();

        assert!(store.resolve_alert(id).await.unwrap());
        assert!(!store.resolve_alert(id).await.unwrap());
        assert!(!store.resolve_alert(99999).await.unwrap());
    }

    #[tokio::test]
    async fn cutoff_excludes_old_and_resolved() {
        let (_dir, store) = test_store().await;
        let now = epoch_to_utc(Utc::now().timestamp());

        store
            .record_alert(&alert_at(now - Duration::hours(2)))
            .await
            .unwrap();
        let recent = store
            .record_alert(&alert_at(now - Duration::minutes(10)))
            .await
            .unwrap();
        let resolved = store
            .record_alert(&alert_at(now - Duration::minutes(5)))
            .await
            .unwrap();
        store.resolve_alert(resolved).await.unwrap();

        let open = store
            .unresolved_alerts_since(now - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, recent);
    }
}
