use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::IdentityProvider;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Token expiry time in minutes.
const TOKEN_EXPIRY_MINUTES: i64 = 30;

/// Buffer time before expiry to trigger refresh (5 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    /// Owner id that cached collections are keyed to.
    pub user_id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    /// Check if the session will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        let refresh_at =
            self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES - TOKEN_REFRESH_BUFFER_MINUTES);
        Utc::now() > refresh_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES)
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at() - Utc::now()).num_minutes().max(0)
    }
}

pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk. Expired sessions are ignored.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
            let data: SessionData =
                serde_json::from_str(&contents).context("Failed to parse session file")?;

            if !data.is_expired() {
                self.data = Some(data);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// Get the bearer token if session is valid
    pub fn token(&self) -> Option<&str> {
        self.valid_data().map(|d| d.token.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.valid_data().map(|d| d.user_id.as_str())
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self) -> bool {
        self.valid_data().is_some()
    }

    fn valid_data(&self) -> Option<&SessionData> {
        self.data.as_ref().filter(|d| !d.is_expired())
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

#[async_trait]
impl IdentityProvider for Session {
    async fn current_owner_id(&self) -> Option<String> {
        let data = self.valid_data()?;
        if data.needs_refresh() {
            warn!(
                user_id = %data.user_id,
                minutes_left = data.minutes_until_expiry(),
                "Session expires soon; log in again to keep syncing"
            );
        }
        Some(data.user_id.clone())
    }
}
