//! Persistent key-value storage.
//!
//! The engine talks to storage only through the async `KeyValueStore` trait.
//! A store guarantees that a single `set`/`remove` lands atomically; it makes
//! no promise across keys. Multi-key atomicity is layered on top by
//! `crate::transaction`.
//!
//! Backends:
//! - `MemoryStore`: in-process map, used by tests and ephemeral caches
//! - `FileStore`: one file per key under a cache directory

pub mod backend;
pub mod file;
pub mod memory;

pub use backend::{KeyValueStore, StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
