use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;

mod alerts;
mod doctor;
mod postgres;
mod processes;
mod services;

#[derive(clap::Parser, Debug)]
struct Args {
    /// Base URL of the vigild service
    #[clap(long, default_value = "http://127.0.0.1:9600")]
    url: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current host snapshot
    Status,
    /// List top processes by CPU
    Processes {
        /// Number of rows to show
        #[clap(long, default_value_t = 15)]
        count: usize,
    },
    /// Show monitored service states
    Services,
    /// List alerts
    Alerts {
        /// Include resolved alerts
        #[clap(long)]
        all: bool,
    },
    /// Mark an alert resolved
    Resolve {
        /// Alert id
        id: i64,
    },
    /// Show PostgreSQL statistics
    Postgres,
    /// Check daemon and database health
    Doctor,
}

#[derive(Deserialize, Debug)]
struct CurrentStats {
    timestamp: String,
    cpu_usage_percent: f64,
    memory_used_gb: f64,
    memory_total_gb: f64,
    memory_usage_percent: f64,
    disk_used_gb: f64,
    disk_total_gb: f64,
    disk_usage_percent: f64,
    process_count: u64,
    uptime_days: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let client = Client::new();

    match args.command {
        Command::Status => {
            let stats: CurrentStats = client
                .get(format!("{}/api/monitoring/current", args.url))
                .send()
                .await?
                .json()
                .await?;
            println!("Host snapshot at {}", stats.timestamp);
            println!(
                "{:<8} {:<20} {:<20} {:<8} {}",
                "cpu%", "memory", "disk", "procs", "uptime_days"
            );
            println!(
                "{:<8.1} {:<20} {:<20} {:<8} {:.1}",
                stats.cpu_usage_percent,
                format!(
                    "{:.1}/{:.1} GB ({:.0}%)",
                    stats.memory_used_gb, stats.memory_total_gb, stats.memory_usage_percent
                ),
                format!(
                    "{:.1}/{:.1} GB ({:.0}%)",
                    stats.disk_used_gb, stats.disk_total_gb, stats.disk_usage_percent
                ),
                stats.process_count,
                stats.uptime_days
            );
        }
        Command::Processes { count } => {
            processes::run_processes(&client, &args.url, count).await?;
        }
        Command::Services => {
            services::run_services(&client, &args.url).await?;
        }
        Command::Alerts { all } => {
            alerts::run_alerts(&client, &args.url, all).await?;
        }
        Command::Resolve { id } => {
            let resp = client
                .post(format!("{}/api/monitoring/alerts/{}/resolve", args.url, id))
                .send()
                .await?;
            if resp.status().is_success() {
                println!("Alert {id} resolved.");
            } else if resp.status() == reqwest::StatusCode::NOT_FOUND {
                eprintln!("Alert {id} not found or already resolved.");
            } else {
                eprintln!("Failed to resolve alert: {}", resp.status());
            }
        }
        Command::Postgres => {
            postgres::run_postgres(&client, &args.url).await?;
        }
        Command::Doctor => {
            doctor::run_doctor(&args.url).await?;
        }
    }

    Ok(())
}
