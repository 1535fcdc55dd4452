use chrono::{DateTime, Utc};
use colored::*;
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;

#[derive(Debug, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_resolved: bool,
}

pub async fn run_alerts(client: &Client, url: &str, all: bool) -> Result<(), Box<dyn Error>> {
    let alerts: Vec<Alert> = client
        .get(format!(
            "{}/api/monitoring/alerts?include_resolved={}",
            url, all
        ))
        .send()
        .await?
        .json()
        .await?;

    if alerts.is_empty() {
        println!("No alerts.");
        return Ok(());
    }

    println!(
        "{:<6} {:<8} {:<10} {:<20} MESSAGE",
        "ID", "KIND", "STATE", "CREATED"
    );
    for alert in alerts {
        let state = if alert.is_resolved {
            "resolved".green()
        } else {
            "open".red()
        };
        println!(
            "{:<6} {:<8} {:<10} {:<20} {}",
            alert.id,
            alert.kind,
            state,
            alert.created_at.format("%Y-%m-%d %H:%M:%S"),
            alert.message
        );
    }

    Ok(())
}
