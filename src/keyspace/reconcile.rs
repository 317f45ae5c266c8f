//! Range Reconciler
//!
//! Merges snapshots whose partitionings disagree onto one common grid.
//!
//! # Algorithm
//!
//! ```text
//! 1. Boundaries = every partition start of every snapshot
//!                 + every snapshot's outer end (when bounded)
//! 2. Grid       = consecutive boundaries, closed by the greatest outer end
//! 3. For each snapshot column, walk partitions and grid cells together:
//!      partition P covers cells [i, j) where grid[i].start == P.start
//!                                      and grid[j-1].end == P.end
//!      every cell in [i, j) receives P.counter / (j - i)
//! ```
//!
//! The even split in step 3 is an approximation: a coarse partition's
//! activity is spread uniformly over the finer cells other snapshots
//! revealed inside it. Integer division loses at most `j - i - 1` per
//! partition.
//!
//! # Performance
//! O(B log B + R), B = distinct boundaries, R = partitions across snapshots.

use super::error::{KeyspaceError, KeyspaceResult};
use super::types::{Key, Metric, PartitionRange, RangeEnd, RegionInfo};

/// Values indexed as `values[cell][column]`
pub type ValueMatrix = Vec<Vec<u64>>;

/// A common grid and the counters redistributed onto it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciled {
    pub grid: Vec<PartitionRange>,
    pub values: ValueMatrix,
}

impl Reconciled {
    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Sum of one snapshot column across the grid
    pub fn column_total(&self, column: usize) -> u64 {
        self.values.iter().map(|row| row[column]).sum()
    }
}

/// Reconcile several snapshots (or scoped slices of them) onto one grid
pub fn reconcile(columns: &[&[RegionInfo]], metric: Metric) -> KeyspaceResult<Reconciled> {
    let grid = build_grid(columns);
    let mut values = vec![vec![0u64; columns.len()]; grid.len()];

    for (column, regions) in columns.iter().enumerate() {
        redistribute(&grid, &mut values, column, regions, metric)?;
    }

    Ok(Reconciled { grid, values })
}

/// Build the finest grid every partition of every column aligns with
pub fn build_grid(columns: &[&[RegionInfo]]) -> Vec<PartitionRange> {
    let mut boundaries: Vec<Key> = Vec::new();
    let mut outer_end: Option<&RangeEnd> = None;

    for regions in columns {
        boundaries.extend(regions.iter().map(|r| r.start().clone()));

        if let Some(last) = regions.last() {
            if let RangeEnd::Bounded(end) = last.end() {
                boundaries.push(end.clone());
            }
            if outer_end.map_or(true, |current| last.end() > current) {
                outer_end = Some(last.end());
            }
        }
    }

    let Some(outer_end) = outer_end else {
        return Vec::new();
    };

    boundaries.sort_unstable();
    boundaries.dedup();

    let mut grid: Vec<PartitionRange> = boundaries
        .windows(2)
        .map(|pair| PartitionRange::new(pair[0].clone(), RangeEnd::Bounded(pair[1].clone())))
        .collect();

    // A bounded outer end is already the greatest boundary
    if outer_end.is_unbounded() {
        if let Some(last) = boundaries.pop() {
            grid.push(PartitionRange::new(last, RangeEnd::Unbounded));
        }
    }

    grid
}

/// Spread one column's counters over the grid cells each partition covers
///
/// Fails when a partition does not line up with a run of cells or leaves a
/// gap after the previous one, which means the column's partitions are not
/// sorted and contiguous.
pub fn redistribute(
    grid: &[PartitionRange],
    values: &mut ValueMatrix,
    column: usize,
    regions: &[RegionInfo],
    metric: Metric,
) -> KeyspaceResult<()> {
    let mut cell = 0;
    let mut first_partition = true;

    for region in regions {
        let unmatched = || {
            tracing::error!(
                column,
                region_id = region.id,
                start = %region.start(),
                end = %region.end(),
                "Partition does not align with reconciled grid"
            );
            KeyspaceError::UnmatchedPartition {
                column,
                start: region.start().clone(),
                end: region.end().clone(),
            }
        };

        // Only a scoped slice's first partition may begin past the grid start;
        // every later one must begin where its predecessor ended
        if first_partition {
            while cell < grid.len() && &grid[cell].start < region.start() {
                cell += 1;
            }
            first_partition = false;
        }
        if cell == grid.len() || &grid[cell].start != region.start() {
            return Err(unmatched());
        }

        let first = cell;
        loop {
            let Some(current) = grid.get(cell) else {
                return Err(unmatched());
            };
            if &current.end > region.end() {
                return Err(unmatched());
            }
            cell += 1;
            if &current.end == region.end() {
                break;
            }
        }

        let share = metric.value(region) / (cell - first) as u64;
        for row in &mut values[first..cell] {
            row[column] += share;
        }
    }

    Ok(())
}
