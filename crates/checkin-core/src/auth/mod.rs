//! Admin access gate.
//!
//! One shared admin credential pair from configuration; the logged-in state
//! is a flag persisted in the cache directory and restored on start-up.

pub mod session;

pub use session::{AdminCredentials, SessionGate};
