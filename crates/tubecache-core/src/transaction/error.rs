use thiserror::Error;

use super::TransactionStatus;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum TransactionError {
    /// Programmer error: the transaction was already committed or rolled back.
    #[error("Transaction {id} is {status}, expected pending")]
    InvalidState {
        id: String,
        status: TransactionStatus,
    },

    /// A write failed during commit. The transaction has been rolled back.
    #[error("Transaction {id} failed to commit: {source}")]
    CommitFailed { id: String, source: StoreError },

    #[error("Transaction {id} rolled back but {} keys could not be restored", failed_keys.len())]
    RollbackIncomplete { id: String, failed_keys: Vec<String> },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TransactionError {
    /// True for misuse of the transaction API rather than a storage failure.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, TransactionError::InvalidState { .. })
    }
}
