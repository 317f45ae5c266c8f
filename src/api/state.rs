//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::catalog::TableCatalog;
use crate::collector::{Collector, SchemaRefresher};
use crate::history::SnapshotHistory;
use crate::keyspace::HeatmapBuilder;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Snapshot history written by the collector
    pub history: Arc<SnapshotHistory>,
    /// Tables heatmaps are scoped to
    pub catalog: Arc<TableCatalog>,
    /// Heatmap pipeline settings (bucket limit, key decoder)
    pub builder: HeatmapBuilder,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// Region collector, for status reporting
    pub collector: Option<Arc<Collector>>,
    /// Schema refresher, for status reporting
    pub schema: Option<Arc<SchemaRefresher>>,
}

impl AppState {
    /// Create state over existing stores without background loops
    pub fn new(
        history: Arc<SnapshotHistory>,
        catalog: Arc<TableCatalog>,
        builder: HeatmapBuilder,
        config: ApiConfig,
    ) -> Self {
        Self {
            history,
            catalog,
            builder,
            config: Arc::new(config),
            start_time: Instant::now(),
            collector: None,
            schema: None,
        }
    }

    /// Attach the region collector
    pub fn with_collector(mut self, collector: Arc<Collector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Attach the schema refresher
    pub fn with_schema(mut self, schema: Arc<SchemaRefresher>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
