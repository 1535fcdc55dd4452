use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known services keyed by listening port.
///
/// The mapping is a fixed table; any port not listed renders as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    #[serde(rename = "PostgreSQL")]
    Postgres,
    #[serde(rename = "SSH")]
    Ssh,
    #[serde(rename = "MySQL")]
    Mysql,
    #[serde(rename = "HTTP/HTTPS")]
    Http,
    #[serde(rename = "WebApp")]
    WebApp,
    Unknown,
}

impl ServiceKind {
    pub fn from_port(port: u16) -> Self {
        match port {
            5432 => Self::Postgres,
            22 => Self::Ssh,
            3306 => Self::Mysql,
            80 | 443 => Self::Http,
            8080 => Self::WebApp,
            _ => Self::Unknown,
        }
    }

    /// Service for an `ss`-style socket address such as `0.0.0.0:5432`,
    /// `[::]:22` or `*:443`.
    pub fn from_local_address(addr: &str) -> Self {
        match local_port(addr) {
            Some(port) => Self::from_port(port),
            None => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::Ssh => "SSH",
            Self::Mysql => "MySQL",
            Self::Http => "HTTP/HTTPS",
            Self::WebApp => "WebApp",
            Self::Unknown => "Unknown",
        }
    }
}

/// Port component of a socket address, if one is present.
pub fn local_port(addr: &str) -> Option<u16> {
    let (_, port) = addr.rsplit_once(':')?;
    port.parse().ok()
}

/// One host sampling pass. A fresh value is assembled per pass and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub timestamp: DateTime<Utc>,
    pub cpu_usage_percent: f64,
    pub memory_total_gb: f64,
    pub memory_used_gb: f64,
    pub memory_usage_percent: f64,
    pub disk_total_gb: f64,
    pub disk_used_gb: f64,
    pub disk_usage_percent: f64,
    pub process_count: u64,
    pub uptime_days: f64,
}

/// One row of `ps aux` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: i32,
    pub user: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub command: String,
}

/// One listening socket, service label derived from the local port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConnection {
    pub protocol: String,
    pub state: String,
    pub local_address: String,
    pub remote_address: String,
    pub process: String,
    pub service: ServiceKind,
}

/// Activation state of one monitored systemd unit. `is_active` is true iff
/// the raw status string is exactly "active".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub status: String,
    pub is_active: bool,
}

/// Established-connection count for one monitored port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkTraffic {
    pub port: u16,
    pub service: ServiceKind,
    pub connection_count: u64,
    pub timestamp: DateTime<Utc>,
}

/// A stored threshold alert. Raised by the alert engine, resolved only
/// through the store; the collector path never mutates one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// An alert the engine decided to raise in the current pass, before it has
/// been persisted and assigned an id.
#[derive(Debug, Clone, Serialize)]
pub struct NewAlert {
    pub kind: &'static str,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// One PostgreSQL sampling pass. Every numeric field defaults to zero when
/// the server is unreachable; callers distinguish "down" from "idle" via the
/// health probe, not via sentinel values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub timestamp: DateTime<Utc>,
    pub active_connections: i64,
    pub idle_connections: i64,
    pub waiting_connections: i64,
    pub max_connections: i64,
    pub database_size_gb: f64,
    pub transactions_committed: i64,
    pub transactions_rolled_back: i64,
    pub tuples_inserted: i64,
    pub tuples_updated: i64,
    pub tuples_deleted: i64,
    pub cache_hit_ratio: f64,
    pub active_locks: i64,
    pub is_replica: bool,
    pub replication_lag_bytes: i64,
}

impl DatabaseStats {
    /// The degraded shape: a fresh timestamp over all-zero fields.
    pub fn unreachable() -> Self {
        Self {
            timestamp: Utc::now(),
            active_connections: 0,
            idle_connections: 0,
            waiting_connections: 0,
            max_connections: 0,
            database_size_gb: 0.0,
            transactions_committed: 0,
            transactions_rolled_back: 0,
            tuples_inserted: 0,
            tuples_updated: 0,
            tuples_deleted: 0,
            cache_hit_ratio: 0.0,
            active_locks: 0,
            is_replica: false,
            replication_lag_bytes: 0,
        }
    }
}

/// One live backend session from pg_stat_activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConnection {
    pub pid: i32,
    pub username: String,
    pub database: String,
    pub client_address: String,
    pub state: String,
    pub query: String,
    pub query_start: Option<DateTime<Utc>>,
    pub duration_secs: f64,
    pub waiting: bool,
}
