//! PD region client
//!
//! Scans the whole keyspace page by page:
//!
//! ```text
//! GET {pd}/pd/api/v1/regions/key?key=<raw key>&limit=<n>
//!   → { "regions": [ { id, start_key, end_key, written_bytes, ... } ] }
//! ```
//!
//! Keys in responses are hex; the `key` parameter is the raw key,
//! percent-encoded. Scanning stops at an empty page or an open end key.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{get_json, http_client, CollectError, SnapshotSource};
use crate::keyspace::{Key, RangeEnd, RegionInfo, Snapshot};

/// PD connection settings
#[derive(Debug, Clone)]
pub struct PdConfig {
    /// PD base URL, e.g. `http://127.0.0.1:2379`
    pub url: String,
    /// Regions per page
    pub page_limit: usize,
    pub request_timeout_ms: u64,
}

impl Default for PdConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:2379".to_string(),
            page_limit: 1024,
            request_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegionsPage {
    #[serde(default)]
    regions: Vec<RegionInfo>,
}

/// Snapshot source backed by the PD HTTP API
pub struct PdClient {
    client: Client,
    config: PdConfig,
}

impl PdClient {
    pub fn new(config: PdConfig) -> Result<Self, CollectError> {
        let client = http_client(config.request_timeout_ms)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PdConfig {
        &self.config
    }

    fn page_url(&self, key: &Key) -> String {
        format!(
            "{}/pd/api/v1/regions/key?key={}&limit={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode_binary(key.as_bytes()),
            self.config.page_limit
        )
    }

    /// Fetch every region without validating the result
    pub async fn scan_regions(&self) -> Result<Vec<RegionInfo>, CollectError> {
        let mut key = Key::empty();
        let mut regions = Vec::with_capacity(self.config.page_limit);

        loop {
            let page: RegionsPage = get_json(&self.client, &self.page_url(&key)).await?;
            let Some(last) = page.regions.last() else {
                break;
            };

            let next = match last.end() {
                RangeEnd::Unbounded => None,
                RangeEnd::Bounded(end) if end > &key => Some(end.clone()),
                RangeEnd::Bounded(end) => {
                    return Err(CollectError::Decode(format!(
                        "Region scan did not advance past key {}",
                        end
                    )));
                }
            };

            tracing::trace!(page = page.regions.len(), from = %key, "Fetched region page");
            regions.extend(page.regions);

            match next {
                Some(next) => key = next,
                None => break,
            }
        }

        Ok(regions)
    }
}

#[async_trait]
impl SnapshotSource for PdClient {
    fn name(&self) -> &str {
        "pd"
    }

    async fn fetch(&self) -> Result<Snapshot, CollectError> {
        let snapshot = Snapshot::new(self.scan_regions().await?);
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde::Deserialize;
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[derive(Deserialize)]
    struct PageParams {
        key: String,
        limit: usize,
    }

    /// Serves `regions` (start hex, end hex) the way PD pages them
    async fn fake_pd(regions: Vec<(&'static str, &'static str)>) -> String {
        let regions = Arc::new(regions);

        let app = Router::new()
            .route(
                "/pd/api/v1/regions/key",
                get(
                    |State(regions): State<Arc<Vec<(&'static str, &'static str)>>>,
                     Query(params): Query<PageParams>| async move {
                        let from = hex::encode(params.key.as_bytes());
                        let page: Vec<Value> = regions
                            .iter()
                            .enumerate()
                            .skip_while(|(_, (start, _))| *start != from)
                            .take(params.limit)
                            .map(|(i, (start, end))| {
                                json!({
                                    "id": i + 1,
                                    "start_key": start,
                                    "end_key": end,
                                    "written_bytes": 10 * (i + 1),
                                    "approximate_size": 96,
                                })
                            })
                            .collect();
                        Json(json!({ "count": page.len(), "regions": page }))
                    },
                ),
            )
            .with_state(regions);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    fn client(url: String, page_limit: usize) -> PdClient {
        PdClient::new(PdConfig {
            url,
            page_limit,
            request_timeout_ms: 2000,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_pages_through_keyspace() {
        // "", a, b, c, d
        let url = fake_pd(vec![
            ("", "61"),
            ("61", "62"),
            ("62", "63"),
            ("63", "64"),
            ("64", ""),
        ])
        .await;

        let snapshot = client(url, 2).fetch().await.unwrap();

        assert_eq!(snapshot.len(), 5);
        let ids: Vec<u64> = snapshot.regions().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(snapshot.regions()[4].written_bytes, 50);
        assert!(snapshot.regions()[4].end().is_unbounded());
    }

    #[tokio::test]
    async fn test_fetch_rejects_incomplete_keyspace() {
        let url = fake_pd(vec![("", "61"), ("61", "62")]).await;

        let err = client(url, 16).fetch().await.unwrap_err();
        assert!(matches!(err, CollectError::InvalidSnapshot(_)));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_pd() {
        // Port 9 (discard) is not listening in test environments
        let err = client("http://127.0.0.1:9".to_string(), 16)
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CollectError::Unavailable | CollectError::Timeout | CollectError::Request(_)
        ));
    }

    #[test]
    fn test_page_url_encodes_raw_key() {
        let pd = client("http://pd:2379/".to_string(), 1024);
        let key = Key::new(vec![0x74, 0x80, 0x00, 0x2f]);
        assert_eq!(
            pd.page_url(&key),
            "http://pd:2379/pd/api/v1/regions/key?key=t%80%00%2F&limit=1024"
        );
        assert_eq!(
            pd.page_url(&Key::empty()),
            "http://pd:2379/pd/api/v1/regions/key?key=&limit=1024"
        );
    }
}
