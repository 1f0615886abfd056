use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Record, RecordError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub id: String,
    #[serde(rename = "channelId")]
    pub channel_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "thumbnailUrl", default)]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "durationSeconds", default)]
    pub duration_seconds: Option<u32>,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
}

impl VideoSummary {
    /// Duration as `H:MM:SS` / `M:SS`, or empty when unknown.
    pub fn duration_display(&self) -> String {
        match self.duration_seconds {
            Some(secs) if secs >= 3600 => {
                format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
            }
            Some(secs) => format!("{}:{:02}", secs / 60, secs % 60),
            None => String::new(),
        }
    }
}

impl Record for VideoSummary {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> &str {
        &self.channel_id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.published_at
    }

    fn check(&self) -> Result<(), RecordError> {
        if self.id.trim().is_empty() || self.channel_id.trim().is_empty() {
            return Err(RecordError::Invalid {
                id: self.id.clone(),
                reason: "missing id or channel".to_string(),
            });
        }
        if self.title.trim().is_empty() {
            return Err(RecordError::Invalid {
                id: self.id.clone(),
                reason: "empty title".to_string(),
            });
        }
        Ok(())
    }
}
