//! Key Range Locator
//!
//! Binary search over one sorted, partition-complete snapshot.
//!
//! - `locate(key)`: index of the partition containing `key`
//! - `overlap(start, end)`: half-open index span of the partitions that
//!   intersect `[start, end)`, suitable for slicing the snapshot; a bound
//!   outside the snapshot is a `KeyOutOfRange` invariant violation
//!
//! # Performance
//! - locate: O(log n)
//! - overlap: two locates

use std::ops::Range;

use super::error::{KeyspaceError, KeyspaceResult};
use super::types::{Key, PartitionRange, RangeEnd, RegionInfo};

/// Binary-search index over the partitions of one snapshot
#[derive(Debug, Clone, Copy)]
pub struct KeyRangeLocator<'a> {
    regions: &'a [RegionInfo],
}

impl<'a> KeyRangeLocator<'a> {
    /// Create a locator over partitions sorted by start key
    pub fn new(regions: &'a [RegionInfo]) -> Self {
        Self { regions }
    }

    /// Find the partition containing `key`
    ///
    /// Returns `None` when the key lies outside the covered keyspace, which
    /// cannot happen for a partition-complete snapshot.
    pub fn locate(&self, key: &Key) -> Option<usize> {
        let regions = self.regions;
        let i = regions.partition_point(|r| r.start() < key);

        if i < regions.len() && regions[i].start() == key {
            return Some(i);
        }
        if i > 0 && regions[i - 1].end().exceeds(key) {
            return Some(i - 1);
        }

        // An open-ended last partition matches any key at or after its start
        let last = regions.last()?;
        if last.end().is_unbounded() && key >= last.start() {
            return Some(regions.len() - 1);
        }

        None
    }

    /// Find the partitions overlapping `[start, end)`
    ///
    /// Fails with `KeyOutOfRange` when either bound lies outside the
    /// snapshot.
    pub fn overlap(&self, start: &Key, end: &RangeEnd) -> KeyspaceResult<Range<usize>> {
        let i = self.locate_or_err(start)?;

        let end = match end {
            RangeEnd::Bounded(end) => end,
            RangeEnd::Unbounded => return Ok(i..self.regions.len()),
        };

        let mut j = self.locate_or_err(end)?;

        // The partition holding `end` is only partially covered unless it
        // starts exactly at `end`
        let region = &self.regions[j];
        if region.end().is_unbounded() || (region.end().exceeds(end) && region.start() != end) {
            j += 1;
        }

        // Inverted scope
        if j < i {
            return Ok(i..i);
        }

        Ok(i..j)
    }

    /// Slice the partitions overlapping `scope`
    pub fn scope(&self, scope: &PartitionRange) -> KeyspaceResult<&'a [RegionInfo]> {
        let span = self.overlap(&scope.start, &scope.end)?;
        Ok(&self.regions[span])
    }

    fn locate_or_err(&self, key: &Key) -> KeyspaceResult<usize> {
        self.locate(key).ok_or_else(|| {
            tracing::error!(key = %key, partitions = self.regions.len(), "Key outside snapshot keyspace");
            KeyspaceError::KeyOutOfRange { key: key.clone() }
        })
    }
}
