//! # keyviz
//!
//! Key visualizer for a range-partitioned key-value store. Samples per-region
//! read/write statistics on a fixed interval and renders them as
//! time × keyspace heatmaps.
//!
//! ## Features
//!
//! - **Reconciliation**: snapshots with different split points mapped onto one grid
//! - **Resolution control**: adjacent buckets merged down to a fixed budget
//! - **Bounded history**: fixed-capacity ring with interval-aligned windows
//! - **Key decoding**: table, record and index keys rendered readably
//!
//! ## Modules
//!
//! - [`keyspace`]: Partition types, reconciliation, squashing and heatmap building
//! - [`history`]: Time-series ring of snapshots
//! - [`codec`]: Memcomparable key codec and table key decoding
//! - [`catalog`]: Table catalog heatmaps are scoped to
//! - [`collector`]: PD and TiDB sampling loops
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keyviz::keyspace::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let snapshot = Snapshot::new(vec![
//!     RegionInfo::new(1, PartitionRange::new(Key::empty(), RangeEnd::Bounded(Key::new(b"m".to_vec()))))
//!         .written_bytes(40),
//!     RegionInfo::new(2, PartitionRange::new(b"m".to_vec(), RangeEnd::Unbounded))
//!         .written_bytes(10),
//! ]);
//! snapshot.validate()?;
//!
//! let history = vec![std::sync::Arc::new(TimestampedSnapshot::now(snapshot))];
//! let heatmap = HeatmapBuilder::new(256).build(&history, Metric::WrittenBytes, None)?;
//!
//! println!("{} buckets", heatmap.ranges.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod catalog;
pub mod codec;
pub mod collector;
pub mod config;
pub mod history;
pub mod keyspace;

// Re-export commonly used types
pub use keyspace::{
    reconcile, squash, Heatmap, HeatmapBuilder, Key, KeyRange, KeyRangeLocator, KeyspaceError,
    KeyspaceResult, Metric, PartitionRange, RangeEnd, RegionInfo, Snapshot, TimestampedSnapshot,
};

pub use history::{SnapshotHistory, TimeSeriesRing};

pub use codec::{KeyDecoder, KeyDescriptor, RawKeyDecoder, TableKeyDecoder};

pub use catalog::{Table, TableCatalog};

pub use collector::{CollectError, Collector, PdClient, SchemaRefresher, TidbSchemaClient};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{generate_default_config, Config, ConfigError};
