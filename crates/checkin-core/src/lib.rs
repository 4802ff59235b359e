//! Core library for checkin: attendance check-ins captured through an
//! unreliable network.
//!
//! A check-in goes through the [`sync::SyncEngine`], which tries the remote
//! store ([`api`]) and falls back to the local cache ([`cache`]) unless the
//! store rejects it as a duplicate. The [`directory::RecordDirectory`] holds
//! the session's records and mirrors every change to the cache. Admin access
//! is a single shared credential checked by [`auth::SessionGate`].

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod directory;
pub mod export;
pub mod models;
pub mod sync;
pub mod utils;

pub use api::{GatewayError, RemoteBackend, RemoteStore};
pub use auth::{AdminCredentials, SessionGate};
pub use cache::CacheManager;
pub use config::Config;
pub use directory::{RecordDirectory, ReloadSource};
pub use models::{AttendanceRecord, CheckIn};
pub use sync::{ClearReport, Outcome, Persistence, SubmitError, SyncEngine};
