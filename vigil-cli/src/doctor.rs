use colored::*;
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;

#[derive(Deserialize, Debug)]
struct HealthResponse {
    #[allow(dead_code)]
    status: String,
}

#[derive(Deserialize, Debug)]
struct StatusResponse {
    version: String,
    uptime_s: u64,
    passes_completed: u64,
    passes_failed: u64,
    #[allow(dead_code)]
    alerts_raised: u64,
    last_sample_at: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct AlertEntry {
    #[allow(dead_code)]
    id: i64,
}

#[derive(Deserialize, Debug)]
struct PgHealthResponse {
    healthy: bool,
}

pub async fn run_doctor(url: &str) -> Result<(), Box<dyn Error>> {
    println!("{}", "🩺 Vigil Doctor".bold().cyan());
    println!("{}", "Checking daemon health...".dimmed());
    println!();

    let client = Client::new();
    let mut all_good = true;

    // 1. Check Connectivity & Health
    print!("• Daemon Connectivity: ");
    match client.get(format!("{}/health", url)).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                if resp.json::<HealthResponse>().await.is_ok() {
                    println!("{}", "OK".green());
                } else {
                    println!("{}", "OK (Invalid JSON)".yellow());
                }
            } else {
                println!("{}", format!("FAIL (Status {})", resp.status()).red());
                all_good = false;
            }
        }
        Err(e) => {
            println!("{}", format!("FAIL ({})", e).red());
            println!("  → Is vigild running? Try 'systemctl status vigild'");
            return Ok(()); // Stop here if we can't connect
        }
    }

    // 2. Fetch Status for deeper checks
    print!("• Daemon Status:       ");
    let status: StatusResponse = match client
        .get(format!("{}/api/monitoring/status", url))
        .send()
        .await
    {
        Ok(resp) => resp.json().await?,
        Err(e) => {
            println!("{}", format!("FAIL ({})", e).red());
            return Ok(());
        }
    };
    println!("{}", format!("OK (v{})", status.version).green());

    // 3. Check Uptime
    print!("• Uptime:              ");
    if status.uptime_s < 60 {
        println!(
            "{}",
            format!("{}s (Just started)", status.uptime_s).yellow()
        );
    } else {
        println!("{}", format!("{}s", status.uptime_s).green());
    }

    // 4. Check Sampling
    print!("• Sampling:            ");
    if status.passes_completed > 0 && status.last_sample_at.is_some() {
        println!(
            "{}",
            format!("Active ({} passes)", status.passes_completed).green()
        );
    } else {
        println!("{}", "Idle (no samples yet)".yellow());
    }

    // 5. Check Pass Failures
    print!("• Pass Failures:       ");
    if status.passes_failed > 0 {
        println!("{}", format!("{} (Warning)", status.passes_failed).yellow());
    } else {
        println!("{}", "0".green());
    }

    // 6. Check Open Alerts
    print!("• Open Alerts:         ");
    match client
        .get(format!("{}/api/monitoring/alerts", url))
        .send()
        .await
    {
        Ok(resp) => match resp.json::<Vec<AlertEntry>>().await {
            Ok(alerts) if alerts.is_empty() => println!("{}", "0".green()),
            Ok(alerts) => println!("{}", format!("{} (Attention)", alerts.len()).yellow()),
            Err(e) => println!("{}", format!("FAIL ({})", e).red()),
        },
        Err(e) => println!("{}", format!("FAIL ({})", e).red()),
    }

    // 7. Check PostgreSQL
    print!("• PostgreSQL:          ");
    match client
        .get(format!("{}/api/monitoring/postgres/health", url))
        .send()
        .await
    {
        Ok(resp) => match resp.json::<PgHealthResponse>().await {
            Ok(health) if health.healthy => println!("{}", "Healthy".green()),
            Ok(_) => {
                println!("{}", "UNREACHABLE".red());
                println!("  → Check the [postgres] section of /etc/vigil/vigil.toml");
                all_good = false;
            }
            Err(e) => {
                println!("{}", format!("FAIL ({})", e).red());
                all_good = false;
            }
        },
        Err(e) => {
            println!("{}", format!("FAIL ({})", e).red());
            all_good = false;
        }
    }

    println!();
    if all_good {
        println!("{}", "✅ Vigil is healthy.".bold().green());
    } else {
        println!("{}", "⚠️  Vigil has issues. See above.".bold().yellow());
    }

    Ok(())
}
