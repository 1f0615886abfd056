use thiserror::Error;

use crate::api::ApiError;
use crate::cache::CacheError;
use crate::recovery::RecoveryError;
use crate::store::StoreError;
use crate::transaction::TransactionError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote fetch failed: {0}")]
    Remote(#[from] ApiError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to write synced data: {0}")]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache unusable: {0}")]
    Degraded(String),
}
