use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use tokio::sync::watch;

use vigild::alerts::AlertEngine;
use vigild::api::{self, AppState};
use vigild::collectors::{HostCollector, PostgresCollector};
use vigild::config::Config;
use vigild::metrics::Metrics;
use vigild::scheduler::Scheduler;
use vigild::store::MonitorStore;

#[derive(Parser, Debug)]
#[command(name = "vigild", about = "Host and PostgreSQL monitoring daemon")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = "/etc/vigil/vigil.toml")]
    config: PathBuf,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the SQLite database path
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db) = args.db {
        config.storage.path = db;
    }

    info!("[daemon] vigild {} starting", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(MonitorStore::new(&config.storage.path).await?);
    let host = Arc::new(HostCollector::new(
        config.monitor.services.clone(),
        config.monitor.ports.clone(),
        config.monitor.top_processes,
    ));
    let postgres = Arc::new(PostgresCollector::new(&config.postgres));
    let metrics = Arc::new(Metrics::new());

    let engine = AlertEngine::new(&config.alerts);
    let scheduler = Scheduler::new(
        host.clone(),
        store.clone(),
        engine,
        metrics.clone(),
        Duration::from_secs(config.monitor.interval_secs),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    let state = AppState {
        store,
        host,
        postgres,
        metrics,
    };
    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("[api] listening on {}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // the API is down; stop the sampling loop and let the last pass finish
    shutdown_tx.send(true).ok();
    scheduler_handle.await?;
    info!("[daemon] shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("[daemon] failed to install ctrl-c handler: {err}");
            std::future::pending::<()>().await;
        }
    };
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!("[daemon] failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("[daemon] received ctrl-c"),
        _ = terminate => info!("[daemon] received SIGTERM"),
    }
}
