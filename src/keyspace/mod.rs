//! Keyspace sampling core
//!
//! Pure computations over snapshots of the keyspace partitioning. Nothing
//! here holds shared state; callers copy snapshots out of the history first.
//!
//! ## Components
//!
//! - [`types`]: keys, ranges, regions, snapshots, metrics
//! - [`locator`]: binary search for the partitions under a key or scope
//! - [`reconcile`]: common grid across snapshots with disagreeing partitions
//! - [`squash`]: resolution limit on the reconciled grid
//! - [`heatmap`]: the full scope/reconcile/squash/decode pipeline

pub mod error;
pub mod heatmap;
pub mod locator;
pub mod reconcile;
pub mod squash;
pub mod types;

pub use error::{KeyspaceError, KeyspaceResult};
pub use heatmap::{Heatmap, HeatmapBuilder, KeyRange, DEFAULT_MAX_BUCKETS};
pub use locator::KeyRangeLocator;
pub use reconcile::{reconcile, Reconciled, ValueMatrix};
pub use squash::squash;
pub use types::{Key, Metric, PartitionRange, RangeEnd, RegionInfo, Snapshot, TimestampedSnapshot};
