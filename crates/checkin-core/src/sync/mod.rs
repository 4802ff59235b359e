//! Synchronization engine.
//!
//! `SyncEngine::submit` is the only way a check-in enters the system. It
//! tries the remote store first and classifies the result:
//!
//! - stored: appended and mirrored, persisted remotely
//! - duplicate rejection: discarded, reported as a failure
//! - anything else: appended and mirrored with a local id, reported as a
//!   success kept on this device

pub mod engine;

pub use engine::{ClearReport, Outcome, Persistence, RetryReport, SubmitError, SyncEngine};
