use colored::*;
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;

#[derive(Debug, Deserialize)]
pub struct DatabaseStats {
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

#[derive(Debug, Deserialize)]
struct HealthResponse {
    healthy: bool,
}

pub async fn run_postgres(client: &Client, url: &str) -> Result<(), Box<dyn Error>> {
    let health: HealthResponse = client
        .get(format!("{}/api/monitoring/postgres/health", url))
        .send()
        .await?
        .json()
        .await?;

    if !health.healthy {
        println!("{}", "PostgreSQL: UNREACHABLE".red().bold());
        return Ok(());
    }
    println!("{}", "PostgreSQL: healthy".green().bold());

    let stats: DatabaseStats = client
        .get(format!("{}/api/monitoring/postgres/stats", url))
        .send()
        .await?
        .json()
        .await?;

    println!(
        "Connections: {} active, {} idle, {} waiting (max {})",
        stats.active_connections,
        stats.idle_connections,
        stats.waiting_connections,
        stats.max_connections
    );
    println!("Database size: {:.2} GB", stats.database_size_gb);
    println!(
        "Transactions: {} committed, {} rolled back",
        stats.transactions_committed, stats.transactions_rolled_back
    );
    println!(
        "Tuples: {} inserted, {} updated, {} deleted",
        stats.tuples_inserted, stats.tuples_updated, stats.tuples_deleted
    );
    println!("Cache hit ratio: {:.1}%", stats.cache_hit_ratio);
    println!("Active locks: {}", stats.active_locks);
    if stats.is_replica {
        println!(
            "Replica: yes ({} bytes behind)",
            stats.replication_lag_bytes
        );
    }

    Ok(())
}
