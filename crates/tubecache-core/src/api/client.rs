//! HTTP client for the tubecache collection API.
//!
//! Endpoints, relative to the configured base URL:
//! - `GET {base}/{collection}?ownerId=…` for the full set
//! - `GET {base}/{collection}/changes?ownerId=…&since=<rfc3339>` for deltas
//! - `GET {base}/{collection}/page?ownerId=…&limit=…[&cursor=…]` for paging

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::ApiError;
use crate::sync::{RemoteApi, RemotePage};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for transient failures (429, 5xx, network).
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds between retries.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the collection endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpRemoteApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemoteApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a new client with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, collection: &str, suffix: Option<&str>) -> String {
        match suffix {
            Some(suffix) => format!("{}/{}/{}", self.base_url, collection, suffix),
            None => format!("{}/{}", self.base_url, collection),
        }
    }

    /// Send one GET. Non-success statuses become an `ApiError`.
    async fn send_once(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response, ApiError> {
        let mut request = self.client.get(url).query(query);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            match self.send_once(url, query).await {
                Ok(response) => {
                    debug!(url = url, "GET succeeded");
                    return response
                        .json()
                        .await
                        .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url, e)));
                }
                Err(e) if should_retry(&e, retries) => {
                    retries += 1;
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, error = %e, "Transient failure, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn should_retry(error: &ApiError, retries: u32) -> bool {
    error.is_transient() && retries < MAX_RETRIES
}

fn page_query(owner_id: &str, cursor: Option<&str>, limit: usize) -> Vec<(&'static str, String)> {
    let mut query = vec![("ownerId", owner_id.to_string()), ("limit", limit.to_string())];
    if let Some(cursor) = cursor {
        query.push(("cursor", cursor.to_string()));
    }
    query
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn list_all(&self, collection: &str, owner_id: &str) -> Result<Vec<Value>, ApiError> {
        let url = self.endpoint(collection, None);
        self.get(&url, &[("ownerId", owner_id.to_string())]).await
    }

    async fn list_changed_since(
        &self,
        collection: &str,
        owner_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Value>, ApiError> {
        let url = self.endpoint(collection, Some("changes"));
        let query = [
            ("ownerId", owner_id.to_string()),
            ("since", since.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ];
        self.get(&url, &query).await
    }

    async fn list_page(
        &self,
        collection: &str,
        owner_id: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<RemotePage, ApiError> {
        let url = self.endpoint(collection, Some("page"));
        self.get(&url, &page_query(owner_id, cursor, limit)).await
    }
}
