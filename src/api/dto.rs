//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::{CatalogStats, Table};
use crate::collector::CollectorStatus;
use crate::history::HistoryStats;
use crate::keyspace::{Heatmap, Metric, TimestampedSnapshot};

// ============================================
// HEATMAP DTOs
// ============================================

/// Heatmap query parameters
///
/// `start` and `end` are signed offsets from now (`-60m`, `-1h30m`).
#[derive(Debug, Default, Deserialize)]
pub struct HeatmapQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    /// Counter to plot, defaults to `written_bytes`
    #[serde(default)]
    pub tag: Option<String>,
    /// Only tables of this database
    #[serde(default)]
    pub db: Option<String>,
    /// Only tables with this name
    #[serde(default)]
    pub table: Option<String>,
}

/// Keyspace heatmap query parameters
#[derive(Debug, Default, Deserialize)]
pub struct KeyspaceQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    /// Hex scope start, defaults to the minimum key
    #[serde(default)]
    pub start_key: Option<String>,
    /// Hex scope end, defaults to the end of the keyspace
    #[serde(default)]
    pub end_key: Option<String>,
}

/// Heatmaps over one time window
#[derive(Debug, Serialize)]
pub struct HeatmapResponse {
    /// Time of the first snapshot in the window
    pub start_time: Option<DateTime<Utc>>,
    /// Time of the last snapshot in the window
    pub end_time: Option<DateTime<Utc>>,
    pub interval_secs: i64,
    pub tag: Metric,
    /// Number of snapshot columns
    pub snapshots: usize,
    pub heatmaps: Vec<Heatmap>,
}

impl HeatmapResponse {
    pub fn new(
        snapshots: &[Arc<TimestampedSnapshot>],
        interval_secs: i64,
        tag: Metric,
        heatmaps: Vec<Heatmap>,
    ) -> Self {
        Self {
            start_time: snapshots.first().map(|s| s.time),
            end_time: snapshots.last().map(|s| s.time),
            interval_secs,
            tag,
            snapshots: snapshots.len(),
            heatmaps,
        }
    }
}

// ============================================
// CATALOG DTOs
// ============================================

/// Table list query parameters
#[derive(Debug, Default, Deserialize)]
pub struct TableQuery {
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
}

/// Table list response
#[derive(Debug, Serialize)]
pub struct TableListResponse {
    pub tables: Vec<Table>,
    pub total: usize,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================
// STATUS DTOs
// ============================================

/// Service status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub history: HistoryStats,
    pub max_buckets: usize,
    /// Region collector, absent when not running in this process
    pub collector: Option<CollectorStatus>,
    /// Schema refresher, absent when schema loading is disabled
    pub schema: Option<CollectorStatus>,
    pub catalog: CatalogStats,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded" or "unhealthy"
    pub status: String,
    /// "ok" once at least one snapshot was collected, otherwise "empty"
    pub history: String,
    /// "ok", "failing" or "disabled"
    pub collector: String,
    pub uptime_seconds: u64,
    pub version: String,
}
