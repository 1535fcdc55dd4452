use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;

/// Daemon configuration, loaded from a TOML file. Every field has a default
/// so a missing file or an empty file yields a working config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("[config] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config =
            toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP API binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path, created on first open.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between sampling passes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// systemd units polled for activation state.
    #[serde(default = "default_services")]
    pub services: Vec<String>,
    /// Ports polled for established-connection counts.
    #[serde(default = "default_ports")]
    pub ports: Vec<u16>,
    /// Default row count for the top-processes read path.
    #[serde(default = "default_top_processes")]
    pub top_processes: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            services: default_services(),
            ports: default_ports(),
            top_processes: default_top_processes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_threshold")]
    pub cpu_threshold: f64,
    #[serde(default = "default_threshold")]
    pub memory_threshold: f64,
    #[serde(default = "default_threshold")]
    pub disk_threshold: f64,
    /// Window during which an open alert of the same kind suppresses a new one.
    #[serde(default = "default_suppression_secs")]
    pub suppression_secs: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: default_threshold(),
            memory_threshold: default_threshold(),
            disk_threshold: default_threshold(),
            suppression_secs: default_suppression_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    #[serde(default = "default_pg_host")]
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    #[serde(default = "default_pg_user")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_pg_database")]
    pub database: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: default_pg_host(),
            port: default_pg_port(),
            username: default_pg_user(),
            password: String::new(),
            database: default_pg_database(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:9600".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("vigil.db")
}

fn default_interval_secs() -> u64 {
    60
}

fn default_services() -> Vec<String> {
    ["nginx", "postgresql", "mysql", "ssh", "cloudflared"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_ports() -> Vec<u16> {
    vec![5432, 22, 3306, 8080, 80, 443]
}

fn default_top_processes() -> usize {
    15
}

fn default_threshold() -> f64 {
    90.0
}

fn default_suppression_secs() -> u64 {
    3600
}

fn default_pg_host() -> String {
    "localhost".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

fn default_pg_user() -> String {
    "postgres".to_string()
}

fn default_pg_database() -> String {
    "postgres".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9600");
        assert_eq!(config.storage.path, PathBuf::from("vigil.db"));
        assert_eq!(config.monitor.interval_secs, 60);
        assert_eq!(config.monitor.top_processes, 15);
        assert_eq!(config.alerts.cpu_threshold, 90.0);
        assert_eq!(config.alerts.suppression_secs, 3600);
        assert_eq!(config.postgres.host, "localhost");
        assert_eq!(config.postgres.port, 5432);
        assert_eq!(config.postgres.database, "postgres");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [monitor]
            interval_secs = 10

            [alerts]
            disk_threshold = 95.0
            "#,
        )
        .unwrap();
        assert_eq!(config.monitor.interval_secs, 10);
        // untouched fields of a present section still default
        assert_eq!(config.monitor.top_processes, 15);
        assert_eq!(config.alerts.disk_threshold, 95.0);
        assert_eq!(config.alerts.cpu_threshold, 90.0);
        assert_eq!(config.server.bind, "127.0.0.1:9600");
    }

    #[test]
    fn full_config_parses() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind = "0.0.0.0:8080"

            [storage]
            path = "/var/lib/vigil/vigil.db"

            [monitor]
            interval_secs = 30
            services = ["nginx"]
            ports = [80, 443]
            top_processes = 5

            [alerts]
            cpu_threshold = 80.0
            memory_threshold = 85.0
            disk_threshold = 95.0
            suppression_secs = 600

            [postgres]
            host = "db.internal"
            port = 5433
            username = "monitor"
            password = "secret"
            database = "app"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.monitor.services, vec!["nginx".to_string()]);
        assert_eq!(config.monitor.ports, vec![80, 443]);
        assert_eq!(config.alerts.suppression_secs, 600);
        assert_eq!(config.postgres.host, "db.internal");
        assert_eq!(config.postgres.port, 5433);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let config = Config::load(Path::new("/nonexistent/vigil.toml")).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9600");
    }

    #[test]
    fn packaged_sample_matches_defaults() {
        let sample: Config = toml::from_str(include_str!("../../configs/vigil.toml")).unwrap();
        let defaults = Config::default();

        // the one deliberate deviation: the packaged path targets the
        // systemd StateDirectory
        assert_eq!(
            sample.storage.path,
            PathBuf::from("/var/lib/vigil/vigil.db")
        );

        assert_eq!(sample.server.bind, defaults.server.bind);
        assert_eq!(sample.monitor.interval_secs, defaults.monitor.interval_secs);
        assert_eq!(sample.monitor.services, defaults.monitor.services);
        assert_eq!(sample.monitor.ports, defaults.monitor.ports);
        assert_eq!(sample.monitor.top_processes, defaults.monitor.top_processes);
        assert_eq!(sample.alerts.cpu_threshold, defaults.alerts.cpu_threshold);
        assert_eq!(
            sample.alerts.memory_threshold,
            defaults.alerts.memory_threshold
        );
        assert_eq!(sample.alerts.disk_threshold, defaults.alerts.disk_threshold);
        assert_eq!(
            sample.alerts.suppression_secs,
            defaults.alerts.suppression_secs
        );
        assert_eq!(sample.postgres.host, defaults.postgres.host);
        assert_eq!(sample.postgres.port, defaults.postgres.port);
        assert_eq!(sample.postgres.username, defaults.postgres.username);
        assert_eq!(sample.postgres.password, defaults.postgres.password);
        assert_eq!(sample.postgres.database, defaults.postgres.database);
    }
}
