//! Keeping cached collections in step with the server.
//!
//! A `SyncCoordinator` owns one collection. Each call picks a tier from the
//! cache's age (cold, stale, fresh), fetches accordingly, merges by id and
//! recency, and writes the result back in a single transaction. Remote
//! failures never escape: the caller always gets the cached records plus the
//! error that prevented refreshing them.

pub mod coordinator;
pub mod error;
pub mod merge;
pub mod remote;

pub use coordinator::{SyncCoordinator, SyncOutcome, SyncTier};
pub use error::SyncError;
pub use merge::{cap_entries, merge_entries, MergeStats};
pub use remote::{RemoteApi, RemotePage};
