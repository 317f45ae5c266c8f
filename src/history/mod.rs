//! Snapshot history
//!
//! The process-lifetime store of recent snapshots. One collector task appends,
//! any number of request handlers read windows. Readers copy `Arc`s out under
//! the read lock and build heatmaps after releasing it.

pub mod ring;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::keyspace::TimestampedSnapshot;

pub use ring::{TimeSeriesRing, Timestamped};

/// Ring occupancy and time span
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    pub len: usize,
    pub capacity: usize,
    pub interval_secs: i64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Lock-guarded ring of timestamped snapshots
#[derive(Debug)]
pub struct SnapshotHistory {
    ring: RwLock<TimeSeriesRing<Arc<TimestampedSnapshot>>>,
    interval: Duration,
}

impl SnapshotHistory {
    /// Create a history of `capacity` samples taken every `interval`
    pub fn new(capacity: usize, interval: std::time::Duration) -> Self {
        Self {
            ring: RwLock::new(TimeSeriesRing::new(capacity)),
            interval: Duration::milliseconds(interval.as_millis() as i64),
        }
    }

    /// Sampling interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Append a snapshot, evicting the oldest when full
    pub async fn append(&self, snapshot: TimestampedSnapshot) -> Arc<TimestampedSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.ring.write().await.append(Arc::clone(&snapshot));
        snapshot
    }

    /// Snapshots covering `[start, end)`; empty when nothing was collected
    pub async fn window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Arc<TimestampedSnapshot>> {
        self.ring.read().await.window(start, end, self.interval)
    }

    pub async fn latest(&self) -> Option<Arc<TimestampedSnapshot>> {
        self.ring.read().await.newest().cloned()
    }

    pub async fn len(&self) -> usize {
        self.ring.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ring.read().await.is_empty()
    }

    pub async fn stats(&self) -> HistoryStats {
        let ring = self.ring.read().await;
        HistoryStats {
            len: ring.len(),
            capacity: ring.capacity(),
            interval_secs: self.interval.num_seconds(),
            oldest: ring.oldest().map(|s| s.time),
            newest: ring.newest().map(|s| s.time),
        }
    }
}
