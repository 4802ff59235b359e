use anyhow::Result;
use tracing::{info, warn};

use crate::cache::{CacheManager, SESSION_KEY};

/// The single shared admin identity.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    username: String,
    password: String,
}

impl AdminCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Exact, case-sensitive comparison of both fields.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Authenticated / not authenticated, persisted as a flag in the cache.
///
/// There is no expiry: a login holds until `logout`.
pub struct SessionGate {
    credentials: AdminCredentials,
    cache: CacheManager,
    authenticated: bool,
}

impl SessionGate {
    /// Restore the session state persisted by a previous run.
    pub fn init(credentials: AdminCredentials, cache: CacheManager) -> Self {
        let authenticated = match cache.read_flag(SESSION_KEY) {
            Ok(flag) => flag,
            Err(e) => {
                warn!(error = %e, "Failed to read session flag, starting logged out");
                false
            }
        };
        Self {
            credentials,
            cache,
            authenticated,
        }
    }

    /// On a credential match, mark the session authenticated and persist the
    /// flag. On mismatch nothing changes.
    pub fn login(&mut self, username: &str, password: &str) -> Result<bool> {
        if !self.credentials.matches(username, password) {
            info!(username, "Admin login rejected");
            return Ok(false);
        }
        self.cache.set_flag(SESSION_KEY)?;
        self.authenticated = true;
        info!(username, "Admin logged in");
        Ok(true)
    }

    pub fn logout(&mut self) -> Result<()> {
        self.authenticated = false;
        self.cache.remove_flag(SESSION_KEY)?;
        info!("Admin logged out");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
