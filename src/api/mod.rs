//! keyviz REST API
//!
//! HTTP API layer, built with Axum.
//!
//! # Endpoints
//!
//! ## Heatmaps
//! - `GET /api/v1/heatmaps` - Per-table record and index heatmaps
//! - `GET /api/v1/heatmaps/keyspace` - One heatmap over a raw key range
//! - `GET /heatmaps` - Alias used by the bundled frontend
//!
//! ## Catalog
//! - `GET /api/v1/tables` - Table catalog
//!
//! ## Status
//! - `GET /api/v1/status` - History, collector and catalog status
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use keyviz::api::{serve, ApiConfig, AppState};
//! use keyviz::catalog::TableCatalog;
//! use keyviz::history::SnapshotHistory;
//! use keyviz::keyspace::HeatmapBuilder;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let history = Arc::new(SnapshotHistory::new(1024, Duration::from_secs(60)));
//!     let catalog = Arc::new(TableCatalog::new());
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(history, catalog, HeatmapBuilder::new(256), config.clone());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;
pub mod window;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    let api_routes = Router::new()
        // Heatmap routes
        .route("/heatmaps", get(routes::heatmaps::table_heatmaps))
        .route("/heatmaps/keyspace", get(routes::heatmaps::keyspace_heatmap))
        // Catalog routes
        .route("/tables", get(routes::tables::list_tables))
        // Status routes
        .route("/status", get(routes::status::get_status));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .route("/heatmaps", get(routes::heatmaps::table_heatmaps))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("keyviz API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("keyviz API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Table, TableCatalog};
    use crate::codec::table::{index_prefix, record_prefix, region_key, table_prefix};
    use crate::history::SnapshotHistory;
    use crate::keyspace::{
        HeatmapBuilder, Key, PartitionRange, RangeEnd, RegionInfo, Snapshot, TimestampedSnapshot,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn region(id: u64, start: Key, end: RangeEnd, written: u64) -> RegionInfo {
        RegionInfo::new(id, PartitionRange::new(start, end))
            .written_bytes(written)
            .read_bytes(written / 2)
    }

    /// `""`, t45, t45_i1, t45_r, t46, t47, +inf
    fn table_snapshot(rows: u64) -> Snapshot {
        let t45 = region_key(&table_prefix(45));
        let idx = region_key(&index_prefix(45, 1));
        let rec = region_key(&record_prefix(45));
        let t46 = region_key(&table_prefix(46));
        let t47 = region_key(&table_prefix(47));

        Snapshot::new(vec![
            region(1, Key::empty(), t45.clone().into(), 1),
            region(2, t45, idx.clone().into(), 2),
            region(3, idx, rec.clone().into(), 30),
            region(4, rec, t46.clone().into(), rows),
            region(5, t46, t47.clone().into(), 5),
            region(6, t47, RangeEnd::Unbounded, 6),
        ])
    }

    async fn create_test_app(snapshots: Vec<Snapshot>) -> Router {
        let history = Arc::new(SnapshotHistory::new(16, Duration::from_secs(60)));
        for snapshot in snapshots {
            history.append(TimestampedSnapshot::now(snapshot)).await;
        }

        let catalog = Arc::new(TableCatalog::new());
        catalog
            .replace(vec![Table::new(45, "shop", "orders").index(1, "idx_user")])
            .await;

        let state = AppState::new(history, catalog, HeatmapBuilder::new(8), ApiConfig::default());
        build_router(state)
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let app = create_test_app(Vec::new()).await;
        let response = get(app, "/health/live").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready_waits_for_first_snapshot() {
        let app = create_test_app(Vec::new()).await;
        let response = get(app, "/health/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let app = create_test_app(vec![table_snapshot(100)]).await;
        let response = get(app, "/health/ready").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let app = create_test_app(Vec::new()).await;
        let response = get(app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["history"], "empty");
        assert_eq!(body["collector"], "disabled");
    }

    #[tokio::test]
    async fn test_table_heatmaps() {
        let app = create_test_app(vec![table_snapshot(100), table_snapshot(300)]).await;

        let response = get(app, "/api/v1/heatmaps?start=-60m").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["tag"], "written_bytes");
        assert_eq!(body["snapshots"], 2);
        assert_eq!(body["interval_secs"], 60);

        let heatmaps = body["heatmaps"].as_array().unwrap();
        assert_eq!(heatmaps.len(), 2);
        assert_eq!(heatmaps[0]["labels"], serde_json::json!(["shop", "orders", ""]));
        assert_eq!(heatmaps[0]["values"], serde_json::json!([[100, 300]]));
        assert_eq!(heatmaps[0]["ranges"][0]["start"]["table_id"], 45);
        assert_eq!(heatmaps[1]["labels"][2], "idx_user");
        assert_eq!(heatmaps[1]["values"], serde_json::json!([[30, 30]]));
    }

    #[tokio::test]
    async fn test_frontend_alias_and_tag() {
        let app = create_test_app(vec![table_snapshot(100)]).await;

        let response = get(app, "/heatmaps?start=-60m&tag=read_bytes").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["heatmaps"][0]["values"], serde_json::json!([[50]]));
    }

    #[tokio::test]
    async fn test_unknown_tag_is_rejected() {
        let app = create_test_app(vec![table_snapshot(100)]).await;

        let response = get(app, "/api/v1/heatmaps?tag=cpu").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_empty_window() {
        let app = create_test_app(Vec::new()).await;

        let response = get(app, "/api/v1/heatmaps").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert!(body["heatmaps"].as_array().unwrap().is_empty());
        assert!(body["start_time"].is_null());
    }

    #[tokio::test]
    async fn test_keyspace_heatmap() {
        let app = create_test_app(vec![table_snapshot(100)]).await;

        let response = get(app, "/api/v1/heatmaps/keyspace?start=-10m").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let heatmaps = body["heatmaps"].as_array().unwrap();
        assert_eq!(heatmaps.len(), 1);
        assert_eq!(heatmaps[0]["ranges"].as_array().unwrap().len(), 6);
        assert_eq!(heatmaps[0]["ranges"][0]["start"]["desc"], "");
        assert_eq!(heatmaps[0]["ranges"][5]["end"]["desc"], "");
    }

    #[tokio::test]
    async fn test_keyspace_heatmap_rejects_bad_key() {
        let app = create_test_app(vec![table_snapshot(100)]).await;
        let response = get(app, "/api/v1/heatmaps/keyspace?start_key=xyz").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_broken_snapshot_is_invariant_violation() {
        let overlapping = Snapshot::new(vec![
            region(1, Key::empty(), Key::from("c").into(), 1),
            region(2, Key::from("b"), RangeEnd::Unbounded, 1),
        ]);
        let app = create_test_app(vec![overlapping]).await;

        let response = get(app, "/api/v1/heatmaps/keyspace").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INVARIANT_VIOLATION");
    }

    #[tokio::test]
    async fn test_list_tables() {
        let app = create_test_app(Vec::new()).await;

        let response = get(app, "/api/v1/tables?db=shop").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["tables"][0]["name"], "orders");
        assert_eq!(body["tables"][0]["indices"]["1"], "idx_user");
    }

    #[tokio::test]
    async fn test_status() {
        let app = create_test_app(vec![table_snapshot(1)]).await;

        let response = get(app, "/api/v1/status").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["history"]["len"], 1);
        assert_eq!(body["history"]["capacity"], 16);
        assert_eq!(body["max_buckets"], 8);
        assert!(body["collector"].is_null());
        assert_eq!(body["catalog"]["tables"], 1);
    }
}
