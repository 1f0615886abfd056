//! Data models for cached collections.
//!
//! This module contains the domain records the engine caches:
//!
//! - `VideoSummary`: a video in the user's feed (paginated collection)
//! - `ChannelSubscription`: a channel the user is subscribed to
//!
//! Both implement `Record`, the boundary contract between raw remote JSON
//! and the typed values merged into the cache.

pub mod channel;
pub mod record;
pub mod video;

pub use channel::ChannelSubscription;
pub use record::{Record, RecordError};
pub use video::VideoSummary;
