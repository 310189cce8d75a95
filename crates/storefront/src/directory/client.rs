//! HTTP directory client with response caching.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{DirectoryEntry, DirectoryError, DirectoryProvider};

/// How long directory listings are reused.
const CACHE_TTL: Duration = Duration::from_secs(600);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Directory API client.
///
/// Reads `GET {base_url}/regions` and `GET {base_url}/regions/{id}/sub-regions`
/// with a bearer token.
#[derive(Clone)]
pub struct HttpDirectoryClient {
    inner: Arc<HttpDirectoryClientInner>,
}

struct HttpDirectoryClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: SecretString,
    cache: Cache<String, Arc<Vec<DirectoryEntry>>>,
}

impl std::fmt::Debug for HttpDirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDirectoryClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Listing envelope; some providers wrap entries in `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing {
    Wrapped { data: Vec<DirectoryEntryResponse> },
    Bare(Vec<DirectoryEntryResponse>),
}

#[derive(Debug, Deserialize)]
struct DirectoryEntryResponse {
    id: serde_json::Value,
    name: String,
}

impl From<Listing> for Vec<DirectoryEntry> {
    fn from(listing: Listing) -> Self {
        let entries = match listing {
            Listing::Wrapped { data } => data,
            Listing::Bare(entries) => entries,
        };
        entries
            .into_iter()
            .map(|e| DirectoryEntry {
                // ids come back as numbers or strings depending on the endpoint
                id: match e.id {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                },
                name: e.name,
            })
            .collect()
    }
}

impl HttpDirectoryClient {
    /// Create a new directory client.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Config` if the HTTP client cannot be built.
    pub fn new(base_url: Url, token: SecretString) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::Config(e.to_string()))?;

        let cache = Cache::builder()
            .max_capacity(256)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(HttpDirectoryClientInner {
                client,
                base_url,
                token,
                cache,
            }),
        })
    }

    async fn listing(&self, path: &str) -> Result<Arc<Vec<DirectoryEntry>>, DirectoryError> {
        if let Some(hit) = self.inner.cache.get(path).await {
            debug!(path, "Directory cache hit");
            return Ok(hit);
        }

        let url = format!(
            "{}/{path}",
            self.inner.base_url.as_str().trim_end_matches('/')
        );
        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(self.inner.token.expose_secret())
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status(status.as_u16()));
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| DirectoryError::Response(e.to_string()))?;
        let entries = Arc::new(Vec::from(listing));

        self.inner
            .cache
            .insert(path.to_string(), Arc::clone(&entries))
            .await;
        Ok(entries)
    }
}

#[async_trait]
impl DirectoryProvider for HttpDirectoryClient {
    #[instrument(skip(self))]
    async fn regions(&self) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        Ok(self.listing("regions").await?.as_ref().clone())
    }

    #[instrument(skip(self))]
    async fn sub_regions(&self, region_id: &str) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let path = format!("regions/{region_id}/sub-regions");
        Ok(self.listing(&path).await?.as_ref().clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_listing_accepts_wrapped_and_bare() {
        let wrapped: Listing =
            serde_json::from_value(json!({"data": [{"id": 16, "name": "Alger"}]})).unwrap();
        let bare: Listing =
            serde_json::from_value(json!([{"id": "16", "name": "Alger"}])).unwrap();

        let expected = vec![DirectoryEntry {
            id: "16".to_string(),
            name: "Alger".to_string(),
        }];
        assert_eq!(Vec::from(wrapped), expected);
        assert_eq!(Vec::from(bare), expected);
    }
}
