//! Who the cache belongs to.
//!
//! This module provides:
//! - `IdentityProvider`: the seam the sync coordinator asks for the active owner
//! - `StaticIdentity`: a settable in-process identity
//! - `Session`: a persisted bearer-token session, also usable as an identity
//!
//! Sessions are stored as JSON in the cache directory and expire after 30 minutes.

pub mod identity;
pub mod session;

pub use identity::{IdentityProvider, StaticIdentity};
pub use session::{Session, SessionData};
