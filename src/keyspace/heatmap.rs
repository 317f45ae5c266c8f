//! Heatmap Builder
//!
//! Validate → scope → reconcile → squash → decode.
//!
//! ```text
//! snapshots ──scope──▶ per-snapshot partition slices
//!           ──reconcile──▶ common grid + values[cell][snapshot]
//!           ──squash──▶ ≤ max_buckets buckets
//!           ──decode──▶ KeyRange { start, end } descriptors
//! ```

use std::sync::Arc;

use serde::Serialize;

use super::error::KeyspaceResult;
use super::locator::KeyRangeLocator;
use super::reconcile::{reconcile, ValueMatrix};
use super::types::{Metric, PartitionRange, RegionInfo, TimestampedSnapshot};
use crate::catalog::Table;
use crate::codec::{KeyDecoder, KeyDescriptor, TableKeyDecoder};

/// Default bucket limit
pub const DEFAULT_MAX_BUCKETS: usize = 256;

/// Decoded bounds of one heatmap bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRange {
    pub start: KeyDescriptor,
    pub end: KeyDescriptor,
}

/// One heatmap: buckets down the key axis, one column per snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heatmap {
    /// `[db, table, index]`; empty for an unscoped keyspace heatmap
    pub labels: Vec<String>,
    pub ranges: Vec<KeyRange>,
    /// `values[bucket][snapshot]`
    pub values: ValueMatrix,
}

impl Heatmap {
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Builds resolution-limited heatmaps from a window of snapshots
#[derive(Clone)]
pub struct HeatmapBuilder {
    max_buckets: usize,
    decoder: Arc<dyn KeyDecoder>,
}

impl HeatmapBuilder {
    /// Create a builder that decodes table keys
    pub fn new(max_buckets: usize) -> Self {
        Self {
            max_buckets,
            decoder: Arc::new(TableKeyDecoder),
        }
    }

    /// Builder: replace the key decoder
    pub fn decoder(mut self, decoder: Arc<dyn KeyDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn max_buckets(&self) -> usize {
        self.max_buckets
    }

    /// Build one heatmap, optionally restricted to `scope`
    ///
    /// Every snapshot must be partition-complete; the first one that is not
    /// fails the build.
    pub fn build(
        &self,
        snapshots: &[Arc<TimestampedSnapshot>],
        metric: Metric,
        scope: Option<&PartitionRange>,
    ) -> KeyspaceResult<Heatmap> {
        validate_all(snapshots)?;
        self.build_validated(snapshots, metric, scope)
    }

    fn build_validated(
        &self,
        snapshots: &[Arc<TimestampedSnapshot>],
        metric: Metric,
        scope: Option<&PartitionRange>,
    ) -> KeyspaceResult<Heatmap> {
        let columns = snapshots
            .iter()
            .map(|s| {
                let regions = s.snapshot.regions();
                match scope {
                    Some(scope) => KeyRangeLocator::new(regions).scope(scope),
                    None => Ok(regions),
                }
            })
            .collect::<KeyspaceResult<Vec<&[RegionInfo]>>>()?;

        let reconciled = reconcile(&columns, metric)?.squash(self.max_buckets);

        let ranges = reconciled
            .grid
            .iter()
            .map(|range| KeyRange {
                start: self.decoder.decode(&range.start),
                end: self.decoder.decode_end(&range.end),
            })
            .collect();

        Ok(Heatmap {
            labels: Vec::new(),
            ranges,
            values: reconciled.values,
        })
    }

    /// Build a record heatmap and one heatmap per index for every table
    ///
    /// Output follows table order, then index id order.
    pub fn table_heatmaps(
        &self,
        tables: &[Table],
        snapshots: &[Arc<TimestampedSnapshot>],
        metric: Metric,
    ) -> KeyspaceResult<Vec<Heatmap>> {
        validate_all(snapshots)?;
        let mut heatmaps = Vec::with_capacity(tables.iter().map(|t| t.indices.len() + 1).sum());

        for table in tables {
            let heatmap = self.build_validated(snapshots, metric, Some(&table.record_range()))?;
            heatmaps.push(heatmap.with_labels(vec![
                table.db.clone(),
                table.name.clone(),
                String::new(),
            ]));

            for (&index_id, index_name) in &table.indices {
                let heatmap = self.build_validated(snapshots, metric, Some(&table.index_range(index_id)))?;
                heatmaps.push(heatmap.with_labels(vec![
                    table.db.clone(),
                    table.name.clone(),
                    index_name.clone(),
                ]));
            }
        }

        tracing::debug!(
            tables = tables.len(),
            heatmaps = heatmaps.len(),
            snapshots = snapshots.len(),
            metric = %metric,
            "Built table heatmaps"
        );

        Ok(heatmaps)
    }
}

fn validate_all(snapshots: &[Arc<TimestampedSnapshot>]) -> KeyspaceResult<()> {
    for (column, timestamped) in snapshots.iter().enumerate() {
        if let Err(err) = timestamped.snapshot.validate() {
            tracing::error!(column, time = %timestamped.time, error = %err, "Snapshot is not partition-complete");
            return Err(err);
        }
    }
    Ok(())
}

impl Default for HeatmapBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUCKETS)
    }
}

impl std::fmt::Debug for HeatmapBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeatmapBuilder")
            .field("max_buckets", &self.max_buckets)
            .finish_non_exhaustive()
    }
}
