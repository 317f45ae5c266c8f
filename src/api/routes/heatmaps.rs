//! Heatmap Routes
//!
//! - GET /api/v1/heatmaps - Per-table record and index heatmaps
//! - GET /heatmaps - Same, at the path the bundled frontend requests
//! - GET /api/v1/heatmaps/keyspace - One heatmap over a raw key range

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{HeatmapQuery, HeatmapResponse, KeyspaceQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::api::window::resolve_window;
use crate::keyspace::{Key, Metric, PartitionRange, RangeEnd};

/// GET /api/v1/heatmaps?start=-60m&end=&tag=written_bytes&db=&table=
///
/// One heatmap for each table's rows and one per declared index, in
/// (db, table) order.
pub async fn table_heatmaps(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HeatmapQuery>,
) -> ApiResult<Json<HeatmapResponse>> {
    let metric = parse_tag(query.tag.as_deref())?;
    let interval = state.history.interval();
    let (start, end) = resolve_window(
        Utc::now(),
        query.start.as_deref(),
        query.end.as_deref(),
        interval,
    );

    let snapshots = state.history.window(start, end).await;
    let tables = state
        .catalog
        .filter(query.db.as_deref(), query.table.as_deref())
        .await;

    let heatmaps = if snapshots.is_empty() {
        Vec::new()
    } else {
        state.builder.table_heatmaps(&tables, &snapshots, metric)?
    };

    tracing::debug!(
        %start,
        %end,
        snapshots = snapshots.len(),
        tables = tables.len(),
        metric = %metric,
        "Served table heatmaps"
    );

    Ok(Json(HeatmapResponse::new(
        &snapshots,
        interval.num_seconds(),
        metric,
        heatmaps,
    )))
}

/// GET /api/v1/heatmaps/keyspace?start=-60m&tag=read_bytes&start_key=&end_key=
///
/// A single unlabelled heatmap, over the whole keyspace unless hex
/// `start_key`/`end_key` narrow it.
pub async fn keyspace_heatmap(
    State(state): State<Arc<AppState>>,
    Query(query): Query<KeyspaceQuery>,
) -> ApiResult<Json<HeatmapResponse>> {
    let metric = parse_tag(query.tag.as_deref())?;
    let scope = parse_scope(query.start_key.as_deref(), query.end_key.as_deref())?;
    let interval = state.history.interval();
    let (start, end) = resolve_window(
        Utc::now(),
        query.start.as_deref(),
        query.end.as_deref(),
        interval,
    );

    let snapshots = state.history.window(start, end).await;

    let heatmaps = if snapshots.is_empty() {
        Vec::new()
    } else {
        vec![state.builder.build(&snapshots, metric, scope.as_ref())?]
    };

    Ok(Json(HeatmapResponse::new(
        &snapshots,
        interval.num_seconds(),
        metric,
        heatmaps,
    )))
}

/// Resolve the counter selector, defaulting to written bytes
fn parse_tag(tag: Option<&str>) -> ApiResult<Metric> {
    match tag {
        None | Some("") => Ok(Metric::default()),
        Some(tag) => tag.parse().map_err(ApiError::Validation),
    }
}

/// Build a scope from optional hex bounds
fn parse_scope(start: Option<&str>, end: Option<&str>) -> ApiResult<Option<PartitionRange>> {
    let start = start.filter(|s| !s.is_empty());
    let end = end.filter(|s| !s.is_empty());
    if start.is_none() && end.is_none() {
        return Ok(None);
    }

    let decode = |hex: &str| {
        Key::from_hex(hex).map_err(|e| ApiError::Validation(format!("Invalid hex key '{}': {}", hex, e)))
    };

    let scope = PartitionRange::new(
        start.map(decode).transpose()?.unwrap_or_default(),
        match end {
            Some(end) => RangeEnd::Bounded(decode(end)?),
            None => RangeEnd::Unbounded,
        },
    );

    if !scope.is_valid() {
        return Err(ApiError::Validation(format!(
            "Empty key scope {}",
            scope
        )));
    }

    Ok(Some(scope))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag(None).unwrap(), Metric::WrittenBytes);
        assert_eq!(parse_tag(Some("")).unwrap(), Metric::WrittenBytes);
        assert_eq!(parse_tag(Some("read_keys")).unwrap(), Metric::ReadKeys);
        assert!(matches!(parse_tag(Some("cpu")), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_parse_scope() {
        assert!(parse_scope(None, Some("")).unwrap().is_none());

        let scope = parse_scope(Some("74"), None).unwrap().unwrap();
        assert_eq!(scope.start, Key::new(vec![0x74]));
        assert!(scope.end.is_unbounded());

        let scope = parse_scope(None, Some("75")).unwrap().unwrap();
        assert!(scope.start.is_empty());

        assert!(parse_scope(Some("zz"), None).is_err());
        assert!(parse_scope(Some("75"), Some("74")).is_err());
    }
}
