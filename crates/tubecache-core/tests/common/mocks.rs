use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tubecache_core::api::ApiError;
use tubecache_core::store::{KeyValueStore, MemoryStore, StoreError, StoreResult};
use tubecache_core::sync::{RemoteApi, RemotePage};

/// Store wrapper that can be told to fail a specific upcoming write or read,
/// reads of one key, or all reads.
///
/// Batch operations go through the trait defaults, so every key in a batch
/// counts as its own write.
#[allow(dead_code)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    writes: AtomicUsize,
    fail_at: Mutex<Option<usize>>,
    reads: AtomicUsize,
    fail_read_at: Mutex<Option<usize>>,
    fail_reads: AtomicBool,
    failing_read_key: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
            fail_at: Mutex::new(None),
            reads: AtomicUsize::new(0),
            fail_read_at: Mutex::new(None),
            fail_reads: AtomicBool::new(false),
            failing_read_key: Mutex::new(None),
        }
    }

    /// Fail the `k`-th write from now (1-based), once.
    pub fn fail_nth_write(&self, k: usize) {
        let seen = self.writes.load(Ordering::SeqCst);
        *self.fail_at.lock() = Some(seen + k);
    }

    /// Fail the `k`-th single-key read from now (1-based), once.
    pub fn fail_nth_read(&self, k: usize) {
        let seen = self.reads.load(Ordering::SeqCst);
        *self.fail_read_at.lock() = Some(seen + k);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Fail every read of `key` until cleared with `None`.
    pub fn fail_reads_of(&self, key: Option<&str>) {
        *self.failing_read_key.lock() = key.map(str::to_string);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Single-key reads so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> StoreResult<()> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        let mut fail_at = self.fail_at.lock();
        if *fail_at == Some(n) {
            *fail_at = None;
            return Err(StoreError::Unavailable(format!("injected failure at write {}", n)));
        }
        Ok(())
    }

    fn check_read(&self, key: Option<&str>) -> StoreResult<()> {
        if key.is_some() {
            let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            let mut fail_read_at = self.fail_read_at.lock();
            if *fail_read_at == Some(n) {
                *fail_read_at = None;
                return Err(StoreError::Unavailable(format!("injected failure at read {}", n)));
            }
        }
        let targeted = key.is_some() && self.failing_read_key.lock().as_deref() == key;
        if targeted || self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FaultyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_read(Some(key))?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check_write()?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.check_write()?;
        self.inner.remove(key).await
    }

    async fn list_keys(&self) -> StoreResult<Vec<String>> {
        self.check_read(None)?;
        self.inner.list_keys().await
    }
}

/// Remote API answering from per-endpoint queues.
///
/// An empty queue answers with no records (and no further pages).
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedRemote {
    all: Mutex<VecDeque<Result<Vec<Value>, ApiError>>>,
    changes: Mutex<VecDeque<Result<Vec<Value>, ApiError>>>,
    pages: Mutex<VecDeque<Result<RemotePage, ApiError>>>,
    pub calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_all(&self, response: Result<Vec<Value>, ApiError>) {
        self.all.lock().push_back(response);
    }

    pub fn push_changes(&self, response: Result<Vec<Value>, ApiError>) {
        self.changes.lock().push_back(response);
    }

    pub fn push_page(&self, response: Result<RemotePage, ApiError>) {
        self.pages.lock().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RemoteApi for ScriptedRemote {
    async fn list_all(&self, collection: &str, owner_id: &str) -> Result<Vec<Value>, ApiError> {
        self.calls.lock().push(format!("all:{}:{}", collection, owner_id));
        self.all.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_changed_since(
        &self,
        collection: &str,
        owner_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Value>, ApiError> {
        self.calls
            .lock()
            .push(format!("changes:{}:{}:{}", collection, owner_id, since.timestamp_millis()));
        self.changes.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_page(
        &self,
        collection: &str,
        owner_id: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<RemotePage, ApiError> {
        self.calls.lock().push(format!(
            "page:{}:{}:{}:{}",
            collection,
            owner_id,
            cursor.unwrap_or("-"),
            limit
        ));
        self.pages.lock().pop_front().unwrap_or_else(|| Ok(RemotePage::default()))
    }
}
