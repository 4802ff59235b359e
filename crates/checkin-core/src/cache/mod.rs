//! Local durable cache.
//!
//! `CacheManager` mirrors the record set to disk so check-ins survive a
//! restart before any remote sync succeeds, and so the admin view has
//! something to show when the remote store is down. It also holds the
//! persisted session flag.

pub mod manager;

pub use manager::{CacheManager, CachedData, RECORDS_KEY, SESSION_KEY};
