//! Table Routes
//!
//! - GET /api/v1/tables - List the table catalog

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{TableListResponse, TableQuery};
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/v1/tables?db=&table=
///
/// Tables in heatmap order, optionally filtered by database or name.
pub async fn list_tables(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TableQuery>,
) -> ApiResult<Json<TableListResponse>> {
    let tables = state
        .catalog
        .filter(query.db.as_deref(), query.table.as_deref())
        .await;
    let stats = state.catalog.stats().await;

    Ok(Json(TableListResponse {
        total: tables.len(),
        tables,
        updated_at: stats.updated_at,
    }))
}
