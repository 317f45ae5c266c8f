//! Collection loops
//!
//! Two independent tickers:
//!
//! - [`Collector`]: fetch a snapshot, stamp it, append it to the history
//! - [`SchemaRefresher`]: fetch the table list, replace the catalog
//!
//! Each is the only writer of its store. Both record per-cycle outcomes in a
//! [`CollectorStatus`] and stop when their `running` flag is cleared.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{CollectError, SchemaSource, SnapshotSource};
use crate::catalog::TableCatalog;
use crate::history::SnapshotHistory;
use crate::keyspace::TimestampedSnapshot;

/// Outcome bookkeeping for one background loop
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectorStatus {
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    /// Successful cycles since start
    pub snapshots_collected: u64,
    pub last_duration_ms: u64,
}

impl CollectorStatus {
    fn record_success(&mut self, elapsed: Duration) {
        self.last_success = Some(Utc::now());
        self.consecutive_failures = 0;
        self.snapshots_collected += 1;
        self.last_duration_ms = elapsed.as_millis() as u64;
    }

    fn record_failure(&mut self, err: &CollectError, elapsed: Duration) {
        self.last_error = Some(err.to_string());
        self.last_error_at = Some(Utc::now());
        self.consecutive_failures += 1;
        self.last_duration_ms = elapsed.as_millis() as u64;
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Periodically samples the keyspace into the history
pub struct Collector {
    source: Arc<dyn SnapshotSource>,
    history: Arc<SnapshotHistory>,
    interval: Duration,
    status: RwLock<CollectorStatus>,
    running: RwLock<bool>,
}

impl Collector {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        history: Arc<SnapshotHistory>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            history,
            interval,
            status: RwLock::new(CollectorStatus::default()),
            running: RwLock::new(false),
        }
    }

    pub async fn status(&self) -> CollectorStatus {
        self.status.read().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Run one collection cycle
    ///
    /// On failure the history is left untouched.
    pub async fn collect_once(&self) -> Result<Arc<TimestampedSnapshot>, CollectError> {
        let started = Instant::now();

        match self.source.fetch().await {
            Ok(snapshot) => {
                let regions = snapshot.len();
                let snapshot = self.history.append(TimestampedSnapshot::now(snapshot)).await;
                self.status.write().await.record_success(started.elapsed());

                tracing::info!(
                    source = self.source.name(),
                    regions,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Collected keyspace snapshot"
                );
                Ok(snapshot)
            }
            Err(e) => {
                let mut status = self.status.write().await;
                status.record_failure(&e, started.elapsed());

                tracing::error!(
                    source = self.source.name(),
                    error = %e,
                    consecutive_failures = status.consecutive_failures,
                    "Snapshot collection failed, skipping cycle"
                );
                Err(e)
            }
        }
    }

    /// Start the collection loop
    ///
    /// The first sample is taken immediately, then one per interval.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            *self.running.write().await = true;
            tracing::info!(
                source = self.source.name(),
                interval_secs = self.interval.as_secs(),
                "Starting snapshot collector"
            );

            let mut ticker = ticker(self.interval);
            loop {
                ticker.tick().await;
                if !*self.running.read().await {
                    break;
                }
                // Errors are recorded in the status and logged
                let _ = self.collect_once().await;
            }

            tracing::info!("Snapshot collector stopped");
        })
    }

    /// Stop the loop after the current tick
    pub async fn stop(&self) {
        *self.running.write().await = false;
    }
}

/// Periodically refreshes the table catalog
pub struct SchemaRefresher {
    source: Arc<dyn SchemaSource>,
    catalog: Arc<TableCatalog>,
    interval: Duration,
    status: RwLock<CollectorStatus>,
    running: RwLock<bool>,
}

impl SchemaRefresher {
    pub fn new(
        source: Arc<dyn SchemaSource>,
        catalog: Arc<TableCatalog>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            catalog,
            interval,
            status: RwLock::new(CollectorStatus::default()),
            running: RwLock::new(false),
        }
    }

    pub async fn status(&self) -> CollectorStatus {
        self.status.read().await.clone()
    }

    /// Run one refresh; the catalog is kept on failure
    pub async fn refresh_once(&self) -> Result<usize, CollectError> {
        let started = Instant::now();

        match self.source.fetch_tables().await {
            Ok(tables) => {
                let count = tables.len();
                self.catalog.replace(tables).await;
                self.status.write().await.record_success(started.elapsed());

                tracing::info!(source = self.source.name(), tables = count, "Refreshed table catalog");
                Ok(count)
            }
            Err(e) => {
                self.status.write().await.record_failure(&e, started.elapsed());
                tracing::warn!(
                    source = self.source.name(),
                    error = %e,
                    "Schema refresh failed, keeping previous catalog"
                );
                Err(e)
            }
        }
    }

    /// Start the refresh loop, refreshing immediately
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            *self.running.write().await = true;
            tracing::info!(
                source = self.source.name(),
                interval_secs = self.interval.as_secs(),
                "Starting schema refresher"
            );

            let mut ticker = ticker(self.interval);
            loop {
                ticker.tick().await;
                if !*self.running.read().await {
                    break;
                }
                let _ = self.refresh_once().await;
            }

            tracing::info!("Schema refresher stopped");
        })
    }

    pub async fn stop(&self) {
        *self.running.write().await = false;
    }
}
