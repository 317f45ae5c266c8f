//! Status Routes
//!
//! - GET /api/v1/status - History, collector and catalog status

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::StatusResponse;
use crate::api::state::AppState;

/// GET /api/v1/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let collector = match &state.collector {
        Some(collector) => Some(collector.status().await),
        None => None,
    };
    let schema = match &state.schema {
        Some(schema) => Some(schema.status().await),
        None => None,
    };

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        history: state.history.stats().await,
        max_buckets: state.builder.max_buckets(),
        collector,
        schema,
        catalog: state.catalog.stats().await,
    })
}
