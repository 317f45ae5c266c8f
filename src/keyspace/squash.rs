//! Bucket Squasher
//!
//! Bounds heatmap size by merging consecutive grid cells into at most
//! `max_buckets` buckets. Chunk sizes differ by at most one cell, so the
//! output always has exactly `min(cells, max_buckets)` buckets and column
//! sums are preserved exactly.

use super::reconcile::{Reconciled, ValueMatrix};
use super::types::PartitionRange;

/// Merge consecutive cells into at most `max_buckets` buckets
///
/// `max_buckets == 0` is treated as 1.
pub fn squash(
    grid: Vec<PartitionRange>,
    values: ValueMatrix,
    max_buckets: usize,
) -> (Vec<PartitionRange>, ValueMatrix) {
    let cells = grid.len();
    let buckets = max_buckets.max(1);
    if cells <= buckets {
        return (grid, values);
    }

    let base = cells / buckets;
    let extra = cells % buckets;

    let mut ranges = Vec::with_capacity(buckets);
    let mut sums = Vec::with_capacity(buckets);
    let mut cell = 0;

    for bucket in 0..buckets {
        let size = base + usize::from(bucket < extra);
        let chunk = cell..cell + size;

        let start = grid[chunk.start].start.clone();
        let end = grid[chunk.end - 1].end.clone();
        ranges.push(PartitionRange { start, end });

        let mut sum = values[chunk.start].clone();
        for row in &values[chunk.start + 1..chunk.end] {
            for (total, value) in sum.iter_mut().zip(row) {
                *total += value;
            }
        }
        sums.push(sum);

        cell = chunk.end;
    }

    (ranges, sums)
}

impl Reconciled {
    /// Squash this grid to at most `max_buckets` buckets
    pub fn squash(self, max_buckets: usize) -> Reconciled {
        let (grid, values) = squash(self.grid, self.values, max_buckets);
        Reconciled { grid, values }
    }
}
