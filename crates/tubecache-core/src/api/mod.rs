//! HTTP implementation of the remote collection API.
//!
//! `HttpRemoteApi` talks to the tubecache backend with bearer-token auth and
//! implements `crate::sync::RemoteApi`, so a `SyncCoordinator` can be pointed
//! at a real server. Failures come back as typed `ApiError`s; the coordinator
//! treats any of them as "serve the cache".

pub mod client;
pub mod error;

pub use client::HttpRemoteApi;
pub use error::ApiError;
