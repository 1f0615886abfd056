use std::sync::Arc;

use chrono::{DateTime, Duration};
use serde_json::{json, Value};
use tubecache_core::auth::StaticIdentity;
use tubecache_core::clock::ManualClock;
use tubecache_core::config::{CollectionConfig, EngineConfig};
use tubecache_core::models::Record;
use tubecache_core::store::KeyValueStore;
use tubecache_core::sync::SyncCoordinator;
use tubecache_core::CacheEngine;

use super::ScriptedRemote;

/// Fixed start time for every test clock.
pub const NOW: i64 = 1_700_000_000_000;

/// Remote JSON for a video published `minutes` after `NOW`.
#[allow(dead_code)]
pub fn video(id: &str, minutes: i64) -> Value {
    let published = DateTime::from_timestamp_millis(NOW + Duration::minutes(minutes).num_milliseconds())
        .unwrap();
    json!({
        "id": id,
        "channelId": "UCchannel",
        "title": format!("Video {}", id),
        "publishedAt": published.to_rfc3339(),
        "durationSeconds": 300,
    })
}

/// Remote JSON for a subscription made on day `day` of January 2023.
#[allow(dead_code)]
pub fn subscription(id: &str, day: u32) -> Value {
    json!({
        "id": id,
        "channelId": format!("UC{}", id),
        "title": format!("Channel {}", id),
        "subscribedAt": format!("2023-01-{:02}T00:00:00Z", day),
    })
}

/// A persisted entry as raw JSON.
#[allow(dead_code)]
pub fn entry_value(id: &str, owner: &str, recency: i64) -> Value {
    json!({
        "id": id,
        "ownerId": owner,
        "recency": recency,
        "payload": {"id": id},
        "cachedAt": NOW,
    })
}

/// Engine wired to a test store, manual clock, scripted remote and settable identity.
#[allow(dead_code)]
pub struct Harness {
    pub engine: CacheEngine,
    pub clock: Arc<ManualClock>,
    pub remote: Arc<ScriptedRemote>,
    pub identity: Arc<StaticIdentity>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp_millis(NOW).unwrap()));
        Self {
            engine: CacheEngine::new(store, clock.clone(), EngineConfig::new("test")),
            clock,
            remote: Arc::new(ScriptedRemote::new()),
            identity: Arc::new(StaticIdentity::new("user-1")),
        }
    }

    pub fn coordinator<R: Record>(&self, collection: CollectionConfig) -> SyncCoordinator<R> {
        self.engine
            .coordinator(collection, self.remote.clone(), self.identity.clone())
    }
}
