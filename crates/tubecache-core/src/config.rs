//! Engine and application configuration.
//!
//! `EngineConfig` and `CollectionConfig` are the runtime knobs handed to the
//! validator, recovery manager and sync coordinators. `Config` is the on-disk
//! application file they are usually built from, stored at
//! `~/.config/tubecache/config.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::cache::{CollectionKeys, DEFAULT_NAMESPACE};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "tubecache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Collection name for video summaries.
pub const VIDEOS: &str = "videos";

/// Collection name for channel subscriptions.
pub const SUBSCRIPTIONS: &str = "subscriptions";

/// Settings shared by every collection.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Prefix for every persisted key.
    pub namespace: String,
    /// How often the coordinator re-runs the validation/recovery pass.
    pub validation_interval: Duration,
    /// How far in the future `lastSyncTimestamp` may be before it is suspicious.
    pub future_tolerance: Duration,
    /// Age after which a sync timestamp is reported as very stale.
    pub stale_after: Duration,
    /// Backups retained per collection; older ones are evicted.
    pub max_backups: usize,
}

impl EngineConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            validation_interval: Duration::minutes(5),
            future_tolerance: Duration::minutes(5),
            stale_after: Duration::days(30),
            max_backups: 3,
        }
    }

    pub fn with_validation_interval(mut self, interval: Duration) -> Self {
        self.validation_interval = interval;
        self
    }

    pub fn with_future_tolerance(mut self, tolerance: Duration) -> Self {
        self.future_tolerance = tolerance;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups.max(1);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

/// Settings for one cached collection.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    pub name: String,
    /// Persisted layout version; a mismatch forces a rebuild.
    pub schema_version: u32,
    /// Cache age at which the next sync becomes a full sync.
    pub full_sync_threshold: Duration,
    /// Entry cap; the oldest entries beyond it are evicted after a sync.
    pub max_entries: usize,
    /// Page size for "load more".
    pub page_size: usize,
}

impl CollectionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_version: 1,
            full_sync_threshold: Duration::hours(24),
            max_entries: 500,
            page_size: 20,
        }
    }

    /// Video summaries: refreshed daily, capped at 500.
    pub fn videos() -> Self {
        Self::new(VIDEOS)
    }

    /// Subscriptions change slowly: full sync every 3 days.
    pub fn subscriptions() -> Self {
        Self::new(SUBSCRIPTIONS)
            .with_full_sync_threshold(Duration::days(3))
            .with_max_entries(1000)
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn with_full_sync_threshold(mut self, threshold: Duration) -> Self {
        self.full_sync_threshold = threshold;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn keys(&self, namespace: &str) -> CollectionKeys {
        CollectionKeys::new(namespace, &self.name)
    }
}

/// Per-collection overrides in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CollectionSettings {
    pub full_sync_threshold_hours: Option<i64>,
    pub max_entries: Option<usize>,
    pub page_size: Option<usize>,
}

impl CollectionSettings {
    fn apply(&self, mut config: CollectionConfig) -> Result<CollectionConfig> {
        if let Some(hours) = self.full_sync_threshold_hours {
            let threshold = non_negative(hours, Duration::try_hours(hours))
                .with_context(|| format!("{}: invalid full_sync_threshold_hours {}", config.name, hours))?;
            config = config.with_full_sync_threshold(threshold);
        }
        if let Some(max) = self.max_entries {
            config = config.with_max_entries(max);
        }
        if let Some(size) = self.page_size {
            config = config.with_page_size(size);
        }
        Ok(config)
    }
}

/// Duration constructors return `None` on overflow; negative values are
/// rejected as well.
fn non_negative(value: i64, duration: Option<Duration>) -> Result<Duration> {
    match duration {
        Some(d) if value >= 0 => Ok(d),
        Some(_) => anyhow::bail!("must not be negative"),
        None => anyhow::bail!("out of range"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    /// Overrides the platform cache directory.
    pub cache_dir: Option<PathBuf>,
    pub namespace: Option<String>,
    pub validation_interval_secs: Option<i64>,
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub videos: CollectionSettings,
    #[serde(default)]
    pub subscriptions: CollectionSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn engine(&self) -> Result<EngineConfig> {
        let mut engine =
            EngineConfig::new(self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE));
        if let Some(secs) = self.validation_interval_secs {
            let interval = non_negative(secs, Duration::try_seconds(secs))
                .with_context(|| format!("Invalid validation_interval_secs {}", secs))?;
            engine = engine.with_validation_interval(interval);
        }
        if let Some(max) = self.max_backups {
            engine = engine.with_max_backups(max);
        }
        Ok(engine)
    }

    pub fn videos(&self) -> Result<CollectionConfig> {
        self.videos.apply(CollectionConfig::videos())
    }

    pub fn subscriptions(&self) -> Result<CollectionConfig> {
        self.subscriptions.apply(CollectionConfig::subscriptions())
    }

    /// Look up a collection by name.
    pub fn collection(&self, name: &str) -> Result<Option<CollectionConfig>> {
        match name {
            VIDEOS => self.videos().map(Some),
            SUBSCRIPTIONS => self.subscriptions().map(Some),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_defaults() {
        let videos = CollectionConfig::videos();
        assert_eq!(videos.full_sync_threshold, Duration::hours(24));
        assert_eq!(videos.max_entries, 500);

        let subs = CollectionConfig::subscriptions();
        assert_eq!(subs.full_sync_threshold, Duration::days(3));
        assert_eq!(subs.keys("ns").entries, "ns:subscriptions:entries");
    }

    #[test]
    fn test_config_overrides_apply() {
        let json = r#"{
            "namespace": "custom",
            "validation_interval_secs": 60,
            "max_backups": 5,
            "videos": {"full_sync_threshold_hours": 6, "max_entries": 50}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        let engine = config.engine().unwrap();
        assert_eq!(engine.namespace, "custom");
        assert_eq!(engine.validation_interval, Duration::seconds(60));
        assert_eq!(engine.max_backups, 5);

        let videos = config.videos().unwrap();
        assert_eq!(videos.full_sync_threshold, Duration::hours(6));
        assert_eq!(videos.max_entries, 50);
        assert_eq!(videos.page_size, 20);

        assert!(config.collection("subscriptions").unwrap().is_some());
        assert!(config.collection("playlists").unwrap().is_none());
    }

    #[test]
    fn test_out_of_range_durations_are_config_errors() {
        let config: Config = serde_json::from_str(&format!(
            r#"{{"validation_interval_secs": {}, "videos": {{"full_sync_threshold_hours": {}}}}}"#,
            i64::MAX,
            i64::MAX
        ))
        .unwrap();
        let err = config.engine().unwrap_err();
        assert!(err.to_string().contains("validation_interval_secs"));
        let err = config.videos().unwrap_err();
        assert!(err.to_string().contains("full_sync_threshold_hours"));
        assert!(config.collection("videos").is_err());
        assert!(config.subscriptions().is_ok());

        let negative: Config =
            serde_json::from_str(r#"{"subscriptions": {"full_sync_threshold_hours": -1}}"#).unwrap();
        assert!(negative.subscriptions().is_err());
    }

    #[test]
    fn test_cache_dir_override() {
        let config = Config {
            cache_dir: Some(PathBuf::from("/tmp/tubecache-test")),
            ..Default::default()
        };
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/tubecache-test"));
    }
}
