use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::AttendanceRecord;

/// Namespace key for the mirrored record set.
pub const RECORDS_KEY: &str = "attendanceRecords";

/// Namespace key for the persisted admin session flag.
pub const SESSION_KEY: &str = "isAdminLoggedIn";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Clock skew lands here too
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// File-backed key-value store under one directory.
///
/// JSON values go to `<key>.json`, plain flags to a file named `<key>`.
/// Writes go through a temp file and a rename so a reader never sees a
/// half-written value.
#[derive(Debug, Clone)]
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn flag_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }

    fn write_atomic(path: &Path, contents: &str) -> Result<()> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write cache file: {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace cache file: {}", path.display()))?;
        Ok(())
    }

    fn remove(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string_pretty(&cached)?;
        Self::write_atomic(&self.cache_path(name), &contents)
    }

    // ===== Records =====

    /// Every mirrored record; empty when nothing was ever written.
    pub fn read_all(&self) -> Result<Vec<AttendanceRecord>> {
        Ok(self
            .load::<Vec<AttendanceRecord>>(RECORDS_KEY)?
            .map(|cached| cached.data)
            .unwrap_or_default())
    }

    /// Replace the mirrored record set.
    pub fn write_all(&self, records: &[AttendanceRecord]) -> Result<()> {
        self.save(RECORDS_KEY, &records)?;
        debug!(count = records.len(), "Records mirrored to cache");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        Self::remove(&self.cache_path(RECORDS_KEY))
    }

    /// Age of the mirrored record set, for display.
    pub fn records_age(&self) -> Option<String> {
        match self.load::<serde_json::Value>(RECORDS_KEY) {
            Ok(Some(cached)) => Some(cached.age_display()),
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    // ===== Flags =====

    /// A flag is set when its file holds exactly `"true"`.
    pub fn read_flag(&self, name: &str) -> Result<bool> {
        let path = self.flag_path(name);
        if !path.exists() {
            return Ok(false);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read flag: {}", name))?;
        Ok(contents.trim() == "true")
    }

    pub fn set_flag(&self, name: &str) -> Result<()> {
        Self::write_atomic(&self.flag_path(name), "true")
    }

    pub fn remove_flag(&self, name: &str) -> Result<()> {
        Self::remove(&self.flag_path(name))
    }
}
