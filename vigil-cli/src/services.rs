use colored::*;
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;

#[derive(Debug, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub status: String,
    pub is_active: bool,
}

pub async fn run_services(client: &Client, url: &str) -> Result<(), Box<dyn Error>> {
    let services: Vec<ServiceStatus> = client
        .get(format!("{}/api/monitoring/services", url))
        .send()
        .await?
        .json()
        .await?;

    println!("{:<16} STATE", "SERVICE");
    for service in services {
        let state = if service.is_active {
            service.status.green()
        } else if service.status == "unknown" {
            service.status.dimmed()
        } else {
            service.status.red()
        };
        println!("{:<16} {}", service.name, state);
    }

    Ok(())
}
