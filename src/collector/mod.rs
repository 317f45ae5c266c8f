//! Collectors
//!
//! Background loops that feed the shared stores:
//!
//! - **regions**: [`SnapshotSource`] → validate → [`SnapshotHistory`](crate::history::SnapshotHistory)
//! - **schema**: [`SchemaSource`] → [`TableCatalog`](crate::catalog::TableCatalog)
//!
//! A failed fetch skips the cycle and leaves the stores untouched; the next
//! tick starts over.

pub mod pd;
pub mod scheduler;
pub mod tidb;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::catalog::Table;
use crate::keyspace::{KeyspaceError, Snapshot};

pub use pd::{PdClient, PdConfig};
pub use scheduler::{Collector, CollectorStatus, SchemaRefresher};
pub use tidb::{TidbConfig, TidbSchemaClient};

/// Produces partition-complete snapshots
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &str;

    /// Fetch and validate the current partitioning
    async fn fetch(&self) -> Result<Snapshot, CollectError>;
}

/// Produces the current table list
#[async_trait]
pub trait SchemaSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_tables(&self) -> Result<Vec<Table>, CollectError>;
}

/// Errors from the external sources
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Request timeout")]
    Timeout,

    #[error("Source unavailable")]
    Unavailable,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[from] KeyspaceError),
}

impl CollectError {
    fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CollectError::Timeout
        } else if err.is_connect() {
            CollectError::Unavailable
        } else {
            CollectError::Request(err)
        }
    }
}

/// GET a JSON document, mapping transport and status failures
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
) -> Result<T, CollectError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(CollectError::from_request)?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(CollectError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.bytes().await.map_err(CollectError::from_request)?;
    serde_json::from_slice(&body).map_err(|e| CollectError::Decode(e.to_string()))
}

/// Build an HTTP client with a request timeout
pub(crate) fn http_client(timeout_ms: u64) -> Result<Client, CollectError> {
    Client::builder()
        .timeout(std::time::Duration::from_millis(timeout_ms))
        .build()
        .map_err(CollectError::Request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CollectError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "API error 500: boom");

        let err = CollectError::from(KeyspaceError::EmptySnapshot);
        assert_eq!(err.to_string(), "Invalid snapshot: Snapshot has no partitions");
    }
}
