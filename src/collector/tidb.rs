//! TiDB schema client
//!
//! ```text
//! GET {tidb}/schema       → [ { db_name: {O, L}, state } ]
//! GET {tidb}/schema/{db}  → [ { id, name: {O, L}, index_info: [ { id, idx_name: {O, L} } ] } ]
//! ```
//!
//! Databases in state 0 (not yet public) are skipped.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{get_json, http_client, CollectError, SchemaSource};
use crate::catalog::Table;

/// TiDB status-port settings
#[derive(Debug, Clone)]
pub struct TidbConfig {
    /// TiDB status URL, e.g. `http://127.0.0.1:10080`
    pub url: String,
    pub request_timeout_ms: u64,
}

impl Default for TidbConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:10080".to_string(),
            request_timeout_ms: 5000,
        }
    }
}

/// Original-case / lower-case name pair
#[derive(Debug, Deserialize)]
struct CiName {
    #[serde(rename = "O")]
    original: String,
}

#[derive(Debug, Deserialize)]
struct DbInfo {
    db_name: CiName,
    #[serde(default)]
    state: i64,
}

#[derive(Debug, Deserialize)]
struct IndexInfo {
    id: i64,
    idx_name: CiName,
}

#[derive(Debug, Deserialize)]
struct TableInfo {
    id: i64,
    name: CiName,
    #[serde(default)]
    index_info: Option<Vec<IndexInfo>>,
}

/// Schema source backed by the TiDB status API
pub struct TidbSchemaClient {
    client: Client,
    config: TidbConfig,
}

impl TidbSchemaClient {
    pub fn new(config: TidbConfig) -> Result<Self, CollectError> {
        let client = http_client(config.request_timeout_ms)?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }
}

#[async_trait]
impl SchemaSource for TidbSchemaClient {
    fn name(&self) -> &str {
        "tidb"
    }

    async fn fetch_tables(&self) -> Result<Vec<Table>, CollectError> {
        let databases: Vec<DbInfo> =
            get_json(&self.client, &format!("{}/schema", self.base_url())).await?;

        let mut tables = Vec::new();
        for db in databases.into_iter().filter(|db| db.state != 0) {
            let url = format!(
                "{}/schema/{}",
                self.base_url(),
                urlencoding::encode(&db.db_name.original)
            );
            let infos: Vec<TableInfo> = get_json(&self.client, &url).await?;

            tables.extend(infos.into_iter().map(|info| {
                let table = Table::new(info.id, db.db_name.original.clone(), info.name.original);
                info.index_info
                    .unwrap_or_default()
                    .into_iter()
                    .fold(table, |table, index| table.index(index.id, index.idx_name.original))
            }));
        }

        tracing::debug!(tables = tables.len(), "Fetched table schema");
        Ok(tables)
    }
}
