//! Application configuration management.
//!
//! Configuration is stored at `~/.config/checkin/config.json` and then
//! overridden from environment variables, so a deployment can be driven by
//! a `.env` file alone.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::AdminCredentials;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "checkin";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "crc@123";

/// HTTP request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Largest accepted photo, in decoded bytes.
const DEFAULT_MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

const DEFAULT_PHOTO_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub sheets_url: Option<String>,
    pub admin_username: String,
    pub admin_password: String,
    pub request_timeout_secs: u64,
    pub cache_dir: Option<PathBuf>,
    pub max_photo_bytes: usize,
    pub supported_photo_types: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            sheets_url: None,
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_dir: None,
            max_photo_bytes: DEFAULT_MAX_PHOTO_BYTES,
            supported_photo_types: DEFAULT_PHOTO_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Which remote store the configuration points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSettings {
    Supabase { url: String, anon_key: String },
    Sheets { url: String },
    None,
}

/// Limits applied to photo payloads before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoPolicy {
    pub max_bytes: usize,
    pub supported_types: Vec<String>,
}

impl Default for PhotoPolicy {
    fn default() -> Self {
        let config = Config::default();
        config.photo_policy()
    }
}

impl Config {
    /// Load the config file (defaults when absent), then apply environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production). Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        if let Some(url) = get(&["SUPABASE_URL", "VITE_SUPABASE_URL"]) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = get(&["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"]) {
            self.supabase_anon_key = Some(key);
        }
        if let Some(url) = get(&["CHECKIN_SHEETS_URL"]) {
            self.sheets_url = Some(url);
        }
        if let Some(username) = get(&["CHECKIN_ADMIN_USERNAME"]) {
            self.admin_username = username;
        }
        if let Some(password) = get(&["CHECKIN_ADMIN_PASSWORD"]) {
            self.admin_password = password;
        }
        if let Some(secs) = get(&["CHECKIN_TIMEOUT_SECS"]).and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = secs;
        }
        if let Some(dir) = get(&["CHECKIN_CACHE_DIR"]) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
    }

    /// Supabase wins when both backends are configured.
    pub fn backend(&self) -> BackendSettings {
        let non_blank = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match (non_blank(&self.supabase_url), non_blank(&self.supabase_anon_key)) {
            (Some(url), Some(anon_key)) => BackendSettings::Supabase { url, anon_key },
            _ => match non_blank(&self.sheets_url) {
                Some(url) => BackendSettings::Sheets { url },
                None => BackendSettings::None,
            },
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn admin_credentials(&self) -> AdminCredentials {
        AdminCredentials::new(&self.admin_username, &self.admin_password)
    }

    pub fn photo_policy(&self) -> PhotoPolicy {
        PhotoPolicy {
            max_bytes: self.max_photo_bytes,
            supported_types: self.supported_photo_types.clone(),
        }
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
