use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::api::ApiError;

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemotePage {
    pub records: Vec<Value>,
    /// `None` once the server has no further pages.
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
}

/// Server-side source of truth for cached collections.
///
/// Records come back as raw JSON; the coordinator validates them into typed
/// records before merging.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// The complete set of records the owner has in `collection`.
    async fn list_all(&self, collection: &str, owner_id: &str) -> Result<Vec<Value>, ApiError>;

    /// Records created or updated after `since`.
    async fn list_changed_since(
        &self,
        collection: &str,
        owner_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Value>, ApiError>;

    /// The page after `cursor` (the first page when `None`).
    async fn list_page(
        &self,
        collection: &str,
        _owner_id: &str,
        _cursor: Option<&str>,
        _limit: usize,
    ) -> Result<RemotePage, ApiError> {
        Err(ApiError::Unsupported(format!("{} is not paginated", collection)))
    }
}
