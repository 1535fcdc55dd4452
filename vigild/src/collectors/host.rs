use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::collectors::probe;
use crate::scheduler::MetricsSource;
use crate::types::{
    NetworkConnection, NetworkTraffic, ProcessInfo, ServerStats, ServiceKind, ServiceStatus,
};

/// Assembles host snapshots and serves the host read path. Holds no mutable
/// state; every call is a fresh read.
pub struct HostCollector {
    services: Vec<String>,
    ports: Vec<u16>,
    top_default: usize,
}

impl HostCollector {
    pub fn new(services: Vec<String>, ports: Vec<u16>, top_default: usize) -> Self {
        Self {
            services,
            ports,
            top_default,
        }
    }

    pub fn default_process_count(&self) -> usize {
        self.top_default
    }

    /// One full sampling pass. The 1-second gap between the two CPU counter
    /// reads is the measurement window, so the pass deliberately takes that
    /// long.
    pub async fn server_stats(&self) -> ServerStats {
        let before = probe::sample_cpu();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let after = probe::sample_cpu();

        let memory = probe::read_memory();
        let disk = probe::read_root_disk().await;

        ServerStats {
            timestamp: Utc::now(),
            cpu_usage_percent: probe::cpu_usage_between(&before, &after),
            memory_total_gb: memory.total_gb,
            memory_used_gb: memory.used_gb,
            memory_usage_percent: memory.usage_percent,
            disk_total_gb: disk.total_gb,
            disk_used_gb: disk.used_gb,
            disk_usage_percent: disk.usage_percent,
            process_count: probe::count_processes(),
            uptime_days: probe::read_uptime_days(),
        }
    }

    pub async fn top_processes(&self, count: usize) -> Vec<ProcessInfo> {
        probe::top_processes(count).await
    }

    pub async fn network_connections(&self) -> Vec<NetworkConnection> {
        probe::listening_sockets().await
    }

    /// Activation state of every monitored unit, in configured order.
    pub async fn service_status(&self) -> Vec<ServiceStatus> {
        let mut statuses = Vec::with_capacity(self.services.len());
        for name in &self.services {
            statuses.push(probe::service_active(name).await);
        }
        statuses
    }

    /// Established-connection counts for every monitored port.
    pub async fn service_traffic(&self) -> BTreeMap<u16, NetworkTraffic> {
        let mut traffic = BTreeMap::new();
        for &port in &self.ports {
            let connection_count = probe::port_connection_count(port).await;
            traffic.insert(
                port,
                NetworkTraffic {
                    port,
                    service: ServiceKind::from_port(port),
                    connection_count,
                    timestamp: Utc::now(),
                },
            );
        }
        traffic
    }
}

#[async_trait]
impl MetricsSource for HostCollector {
    async fn sample(&self) -> Result<ServerStats> {
        Ok(self.server_stats().await)
    }
}
