//! Core library for tubecache.
//!
//! tubecache keeps a persistent, process-local copy of server-owned
//! collections (video summaries, channel subscriptions) consistent on top of
//! a key-value store that only guarantees single-key atomicity.
//!
//! The pieces compose bottom-up:
//! - `store`: the `KeyValueStore` seam plus memory and file backends
//! - `transaction`: all-or-nothing groups of store writes with rollback
//! - `validation`: read-only integrity scan producing `ValidationIssue`s
//! - `recovery`: risk-classified repair plans, backups and auto-recovery
//! - `sync`: age-gated full/incremental sync against a `RemoteApi`
//!
//! `CacheEngine` wires them together over one store and clock.

pub mod api;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod engine;
pub mod models;
pub mod recovery;
pub mod store;
pub mod sync;
pub mod transaction;
pub mod utils;
pub mod validation;

pub use api::{ApiError, HttpRemoteApi};
pub use auth::{IdentityProvider, Session, SessionData, StaticIdentity};
pub use cache::{CollectionKeys, Entry, Metadata};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CollectionConfig, Config, EngineConfig};
pub use engine::CacheEngine;
pub use models::{ChannelSubscription, Record, RecordError, VideoSummary};
pub use recovery::{AutoRecoverOutcome, RecoveryError, RecoveryManager, RecoveryPlan, RecoveryResult};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use sync::{RemoteApi, RemotePage, SyncCoordinator, SyncError, SyncOutcome, SyncTier};
pub use transaction::{Transaction, TransactionError, TransactionManager};
pub use validation::{CacheValidator, ValidationIssue, ValidationReport};
