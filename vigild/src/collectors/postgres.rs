//! On-demand PostgreSQL introspection.
//!
//! Each call opens a fresh connection, runs its statistics queries and
//! closes it again; nothing is pooled, so a flapping database never wedges
//! the daemon. The same fail-soft contract as the host probes applies: an
//! unreachable server yields the zeroed [`DatabaseStats`] shape and a failed
//! sub-query zeroes only the fields it covers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{Connection, PgConnection, Row};
use tokio::time::timeout;

use crate::config::PostgresConfig;
use crate::types::{DatabaseConnection, DatabaseStats};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const ACTIVITY_SQL: &str = "\
SELECT pid,
       COALESCE(usename::text, '') AS username,
       COALESCE(datname::text, '') AS database,
       COALESCE(client_addr::text, 'localhost') AS client_address,
       COALESCE(state, '') AS state,
       COALESCE(query, '') AS query,
       query_start,
       COALESCE(EXTRACT(EPOCH FROM (now() - query_start)), 0)::float8 AS duration_secs,
       wait_event_type IS NOT NULL AS waiting
FROM pg_stat_activity
WHERE state IS NOT NULL AND datname = current_database()
ORDER BY query_start DESC";

const CACHE_HIT_SQL: &str = "\
SELECT CASE WHEN sum(heap_blks_hit) + sum(heap_blks_read) = 0 THEN 0
            ELSE sum(heap_blks_hit)::float8 / (sum(heap_blks_hit) + sum(heap_blks_read)) * 100
       END
FROM pg_statio_user_tables";

pub struct PostgresCollector {
    options: PgConnectOptions,
}

impl PostgresCollector {
    pub fn new(cfg: &PostgresConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.username)
            .password(&cfg.password)
            .database(&cfg.database);
        Self { options }
    }

    /// One statistics pass over the configured database.
    pub async fn stats(&self) -> DatabaseStats {
        let mut stats = DatabaseStats::unreachable();
        let Some(mut conn) = self.connect().await else {
            return stats;
        };

        stats.active_connections = scalar_i64(
            &mut conn,
            "SELECT count(*) FROM pg_stat_activity WHERE state = 'active'",
            "active connections",
        )
        .await;
        stats.idle_connections = scalar_i64(
            &mut conn,
            "SELECT count(*) FROM pg_stat_activity WHERE state = 'idle'",
            "idle connections",
        )
        .await;
        stats.waiting_connections = scalar_i64(
            &mut conn,
            "SELECT count(*) FROM pg_stat_activity WHERE wait_event_type IS NOT NULL",
            "waiting connections",
        )
        .await;
        stats.max_connections = scalar_i64(
            &mut conn,
            "SELECT setting::bigint FROM pg_settings WHERE name = 'max_connections'",
            "max connections",
        )
        .await;
        stats.database_size_gb = scalar_f64(
            &mut conn,
            "SELECT (pg_database_size(current_database()) / (1024.0 * 1024 * 1024))::float8",
            "database size",
        )
        .await;

        match sqlx::query(
            "SELECT xact_commit, xact_rollback, tup_inserted, tup_updated, tup_deleted \
             FROM pg_stat_database WHERE datname = current_database()",
        )
        .fetch_optional(&mut conn)
        .await
        {
            Ok(Some(row)) => {
                stats.transactions_committed = row.try_get(0).unwrap_or(0);
                stats.transactions_rolled_back = row.try_get(1).unwrap_or(0);
                stats.tuples_inserted = row.try_get(2).unwrap_or(0);
                stats.tuples_updated = row.try_get(3).unwrap_or(0);
                stats.tuples_deleted = row.try_get(4).unwrap_or(0);
            }
            Ok(None) => {}
            Err(err) => warn!("[postgres] pg_stat_database query failed: {err}"),
        }

        stats.cache_hit_ratio = scalar_f64(&mut conn, CACHE_HIT_SQL, "cache hit ratio").await;
        stats.active_locks = scalar_i64(
            &mut conn,
            "SELECT count(*) FROM pg_locks WHERE granted",
            "active locks",
        )
        .await;
        stats.is_replica = scalar_bool(&mut conn, "SELECT pg_is_in_recovery()", "recovery state").await;
        if stats.is_replica {
            stats.replication_lag_bytes = scalar_i64(
                &mut conn,
                "SELECT pg_wal_lsn_diff(pg_last_wal_receive_lsn(), pg_last_wal_replay_lsn())::bigint",
                "replication lag",
            )
            .await;
        }

        close_quietly(conn).await;
        stats
    }

    /// Live sessions against the configured database, newest first.
    pub async fn active_connections(&self) -> Vec<DatabaseConnection> {
        let Some(mut conn) = self.connect().await else {
            return Vec::new();
        };
        let connections = match sqlx::query(ACTIVITY_SQL).fetch_all(&mut conn).await {
            Ok(rows) => rows.iter().map(connection_from_row).collect(),
            Err(err) => {
                warn!("[postgres] pg_stat_activity query failed: {err}");
                Vec::new()
            }
        };
        close_quietly(conn).await;
        connections
    }

    /// True when a connection can be opened at all.
    pub async fn healthy(&self) -> bool {
        match self.connect().await {
            Some(conn) => {
                close_quietly(conn).await;
                true
            }
            None => false,
        }
    }

    async fn connect(&self) -> Option<PgConnection> {
        match timeout(CONNECT_TIMEOUT, PgConnection::connect_with(&self.options)).await {
            Ok(Ok(conn)) => Some(conn),
            Ok(Err(err)) => {
                warn!("[postgres] connect failed: {err}");
                None
            }
            Err(_) => {
                warn!("[postgres] connect timed out after {CONNECT_TIMEOUT:?}");
                None
            }
        }
    }
}

async fn close_quietly(conn: PgConnection) {
    if let Err(err) = conn.close().await {
        debug!("[postgres] close failed: {err}");
    }
}

async fn scalar_i64(conn: &mut PgConnection, sql: &str, what: &str) -> i64 {
    match sqlx::query_scalar::<_, Option<i64>>(sql)
        .fetch_optional(&mut *conn)
        .await
    {
        Ok(value) => value.flatten().unwrap_or(0),
        Err(err) => {
            warn!("[postgres] {what} query failed: {err}");
            0
        }
    }
}

async fn scalar_f64(conn: &mut PgConnection, sql: &str, what: &str) -> f64 {
    match sqlx::query_scalar::<_, Option<f64>>(sql)
        .fetch_optional(&mut *conn)
        .await
    {
        Ok(value) => value.flatten().unwrap_or(0.0),
        Err(err) => {
            warn!("[postgres] {what} query failed: {err}");
            0.0
        }
    }
}

async fn scalar_bool(conn: &mut PgConnection, sql: &str, what: &str) -> bool {
    match sqlx::query_scalar::<_, Option<bool>>(sql)
        .fetch_optional(&mut *conn)
        .await
    {
        Ok(value) => value.flatten().unwrap_or(false),
        Err(err) => {
            warn!("[postgres] {what} query failed: {err}");
            false
        }
    }
}

fn connection_from_row(row: &PgRow) -> DatabaseConnection {
    DatabaseConnection {
        pid: row.try_get(0).unwrap_or(0),
        username: row.try_get(1).unwrap_or_default(),
        database: row.try_get(2).unwrap_or_default(),
        client_address: row.try_get(3).unwrap_or_default(),
        state: row.try_get(4).unwrap_or_default(),
        query: row.try_get(5).unwrap_or_default(),
        query_start: row.try_get::<Option<DateTime<Utc>>, _>(6).unwrap_or(None),
        duration_secs: row.try_get(7).unwrap_or(0.0),
        waiting: row.try_get(8).unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_collector() -> PostgresCollector {
        // port 1 refuses immediately on loopback
        PostgresCollector::new(&PostgresConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
        })
    }

    #[tokio::test]
    async fn stats_degrade_to_zero_when_unreachable() {
        let stats = unreachable_collector().stats().await;
        assert_eq!(stats.active_connections, 0);
        assert_eq!(stats.max_connections, 0);
        assert_eq!(stats.database_size_gb, 0.0);
        assert_eq!(stats.transactions_committed, 0);
        assert!(!stats.is_replica);
    }

    #[tokio::test]
    async fn connections_empty_when_unreachable() {
        assert!(unreachable_collector().active_connections().await.is_empty());
    }

    #[tokio::test]
    async fn health_false_when_unreachable() {
        assert!(!unreachable_collector().healthy().await);
    }
}
