use reqwest::Client;
use serde::Deserialize;
use std::error::Error;

#[derive(Debug, Deserialize)]
pub struct ProcessInfo {
    pub pid: i32,
    pub user: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub command: String,
}

pub async fn run_processes(client: &Client, url: &str, count: usize) -> Result<(), Box<dyn Error>> {
    let processes: Vec<ProcessInfo> = client
        .get(format!("{}/api/monitoring/processes?count={}", url, count))
        .send()
        .await?
        .json()
        .await?;

    println!(
        "{:<8} {:<12} {:<6} {:<6} COMMAND",
        "PID", "USER", "CPU%", "MEM%"
    );

    for p in processes {
        println!(
            "{:<8} {:<12} {:<6.1} {:<6.1} {}",
            p.pid,
            truncate(&p.user, 12),
            p.cpu_usage,
            p.memory_usage,
            p.command
        );
    }

    Ok(())
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let cut: String = value.chars().take(max - 1).collect();
        format!("{cut}+")
    }
}
