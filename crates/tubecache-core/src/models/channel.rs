use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSubscription {
    /// Subscription id (not the channel id).
    pub id: String,
    #[serde(rename = "channelId")]
    pub channel_id: String,
    pub title: String,
    #[serde(rename = "thumbnailUrl", default)]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "subscribedAt")]
    pub subscribed_at: DateTime<Utc>,
    /// Falls back to `subscribedAt` for servers that never send it.
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for ChannelSubscription {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> &str {
        &self.channel_id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.subscribed_at)
    }
}
