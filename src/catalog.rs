//! Table catalog
//!
//! The logical tables and indexes heatmaps are scoped to. Refreshed in the
//! background from the schema source and read by request handlers; the two
//! may briefly disagree with the region history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::codec::{table_index_range, table_record_range};
use crate::keyspace::PartitionRange;

/// A table and its declared indexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: i64,
    pub db: String,
    pub name: String,
    /// Index id to index name
    #[serde(default)]
    pub indices: BTreeMap<i64, String>,
}

impl Table {
    pub fn new(id: i64, db: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            db: db.into(),
            name: name.into(),
            indices: BTreeMap::new(),
        }
    }

    /// Builder: declare an index
    pub fn index(mut self, id: i64, name: impl Into<String>) -> Self {
        self.indices.insert(id, name.into());
        self
    }

    /// Region keys holding this table's rows
    pub fn record_range(&self) -> PartitionRange {
        table_record_range(self.id)
    }

    /// Region keys holding one index's entries
    pub fn index_range(&self, index_id: i64) -> PartitionRange {
        table_index_range(self.id, index_id)
    }
}

/// Snapshot of the catalog for listings
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub tables: usize,
    pub indices: usize,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct CatalogState {
    tables: Vec<Table>,
    updated_at: Option<DateTime<Utc>>,
}

/// Shared, lock-guarded table list ordered by (db, name)
#[derive(Debug, Default)]
pub struct TableCatalog {
    state: RwLock<CatalogState>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole catalog
    pub async fn replace(&self, mut tables: Vec<Table>) {
        tables.sort_by(|a, b| (&a.db, &a.name, a.id).cmp(&(&b.db, &b.name, b.id)));

        let mut state = self.state.write().await;
        state.tables = tables;
        state.updated_at = Some(Utc::now());
    }

    /// All tables in catalog order
    pub async fn tables(&self) -> Vec<Table> {
        self.state.read().await.tables.clone()
    }

    /// Tables matching optional database and table names (case-insensitive)
    pub async fn filter(&self, db: Option<&str>, table: Option<&str>) -> Vec<Table> {
        let matches = |want: Option<&str>, have: &str| {
            want.map_or(true, |w| w.is_empty() || w.eq_ignore_ascii_case(have))
        };

        self.state
            .read()
            .await
            .tables
            .iter()
            .filter(|t| matches(db, &t.db) && matches(table, &t.name))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.tables.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CatalogStats {
        let state = self.state.read().await;
        CatalogStats {
            tables: state.tables.len(),
            indices: state.tables.iter().map(|t| t.indices.len()).sum(),
            updated_at: state.updated_at,
        }
    }
}
