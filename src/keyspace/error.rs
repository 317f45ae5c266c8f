//! Keyspace error types
//!
//! Every variant here is an invariant violation: a snapshot that is not
//! partition-complete or a partition the reconciler could not place on the
//! grid. They indicate a broken producer or a logic bug, never bad user input.

use thiserror::Error;

use super::types::{Key, RangeEnd};

/// Errors raised by the keyspace algorithms
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyspaceError {
    /// A snapshot with no partitions at all
    #[error("Snapshot has no partitions")]
    EmptySnapshot,

    /// The first partition does not start at the minimum key
    #[error("Snapshot does not start at the minimum key (first start: {start})")]
    MissingLowerBound { start: Key },

    /// The last partition has a bounded end
    #[error("Snapshot does not reach the end of the keyspace (last end: {end})")]
    MissingUpperBound { end: RangeEnd },

    /// Two neighbouring partitions leave a gap or overlap
    #[error("Partitions {index} and {next} are not contiguous: {end} != {next_start}")]
    NonContiguous {
        index: usize,
        next: usize,
        end: RangeEnd,
        next_start: Key,
    },

    /// A partition is empty or inverted
    #[error("Partition {index} is empty or inverted: [{start}, {end})")]
    EmptyPartition {
        index: usize,
        start: Key,
        end: RangeEnd,
    },

    /// No run of grid cells matches a partition
    #[error("Partition [{start}, {end}) of snapshot {column} does not align with the grid")]
    UnmatchedPartition {
        column: usize,
        start: Key,
        end: RangeEnd,
    },

    /// A key lies outside the keyspace covered by a snapshot
    #[error("Key {key} is outside the snapshot's keyspace")]
    KeyOutOfRange { key: Key },
}

/// Result type alias for keyspace operations
pub type KeyspaceResult<T> = Result<T, KeyspaceError>;
