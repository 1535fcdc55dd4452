//! The sampling loop: collect, persist, evaluate, repeat.
//!
//! One pass failing must never take the loop down; the error is logged and
//! counted, and the next pass starts on schedule.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use tokio::sync::watch;

use crate::alerts::AlertEngine;
use crate::metrics::Metrics;
use crate::types::{Alert, NewAlert, ServerStats};

/// Source of host snapshots, one per pass.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn sample(&self) -> Result<ServerStats>;
}

/// Persistence for snapshots and the alerts raised from them.
#[async_trait]
pub trait SampleSink: Send + Sync {
    async fn persist_stats(&self, stats: &ServerStats) -> Result<()>;
    async fn open_alerts_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Alert>>;
    async fn persist_alert(&self, alert: &NewAlert) -> Result<()>;
}

pub struct Scheduler {
    source: Arc<dyn MetricsSource>,
    sink: Arc<dyn SampleSink>,
    engine: AlertEngine,
    metrics: Arc<Metrics>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        sink: Arc<dyn SampleSink>,
        engine: AlertEngine,
        metrics: Arc<Metrics>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            sink,
            engine,
            metrics,
            interval,
        }
    }

    /// Run until the shutdown channel flips to true. Shutdown is checked
    /// both before each pass and during the sleep between passes.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("[scheduler] sampling every {:?}", self.interval);
        loop {
            if *shutdown.borrow() {
                break;
            }
            match self.run_once().await {
                Ok(raised) => self.metrics.record_pass(raised as u64),
                Err(err) => {
                    warn!("[scheduler] pass failed: {err:#}");
                    self.metrics.record_failed_pass();
                }
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("[scheduler] stopped");
    }

    async fn run_once(&self) -> Result<usize> {
        let stats = self.source.sample().await?;
        self.sink.persist_stats(&stats).await?;

        let cutoff = stats.timestamp - self.engine.suppression();
        let open = self.sink.open_alerts_since(cutoff).await?;
        let raised = self.engine.evaluate(&stats, &open);
        for alert in &raised {
            self.sink.persist_alert(alert).await?;
            info!("[scheduler] raised {} alert: {}", alert.kind, alert.message);
        }
        Ok(raised.len())
    }
}
