//! In-memory record set for the current session.
//!
//! Records are kept newest first. Every mutation writes the whole set to the
//! cache before returning, so once a call completes the cache holds exactly
//! what the directory holds.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::api::RemoteStore;
use crate::cache::CacheManager;
use crate::models::{AttendanceRecord, LOCAL_ID_PREFIX};
use crate::utils::contains_ignore_case;

/// Where the last `reload` got its records from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadSource {
    Remote { count: usize },
    Cache { count: usize, reason: String },
    Empty { reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    pub total: usize,
    pub with_photo: usize,
    pub today: usize,
    pub pending: usize,
}

pub struct RecordDirectory {
    records: Vec<AttendanceRecord>,
    cache: CacheManager,
}

impl RecordDirectory {
    /// Start from whatever the cache holds. An unreadable cache starts empty.
    pub fn init(cache: CacheManager) -> Self {
        let records = match cache.read_all() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to read cached records, starting empty");
                Vec::new()
            }
        };
        debug!(count = records.len(), "Record directory restored from cache");
        Self {
            records: dedupe(records),
            cache,
        }
    }

    pub fn all(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&AttendanceRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Records that only exist on this device.
    pub fn pending(&self) -> impl Iterator<Item = &AttendanceRecord> {
        self.records.iter().filter(|r| r.is_local_only())
    }

    /// Replace the set with the remote store's listing, keeping local-only
    /// records the store has not seen yet. Falls back to the cache, then to
    /// an empty set. Never fails.
    pub async fn reload<S: RemoteStore>(&mut self, store: &S) -> ReloadSource {
        match store.list().await {
            Ok(remote) => {
                let mut records: Vec<AttendanceRecord> =
                    remote.into_iter().map(AttendanceRecord::from).collect();
                let remote_ids: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
                let pending: Vec<AttendanceRecord> = self
                    .pending()
                    .filter(|r| !remote_ids.contains(&r.id))
                    .cloned()
                    .collect();
                records.extend(pending);
                records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

                if let Err(e) = self.replace_all(records) {
                    warn!(error = %e, "Failed to mirror reloaded records to cache");
                }
                info!(count = self.records.len(), "Records reloaded from remote store");
                ReloadSource::Remote {
                    count: self.records.len(),
                }
            }
            Err(remote_err) => {
                warn!(error = %remote_err, "Remote reload failed, falling back to cache");
                match self.cache.read_all() {
                    Ok(cached) => {
                        self.records = dedupe(cached);
                        ReloadSource::Cache {
                            count: self.records.len(),
                            reason: remote_err.to_string(),
                        }
                    }
                    Err(cache_err) => {
                        warn!(error = %cache_err, "Cache unreadable, directory is empty");
                        self.records.clear();
                        ReloadSource::Empty {
                            reason: format!("{}; {}", remote_err, cache_err),
                        }
                    }
                }
            }
        }
    }

    /// Add a record at the front. Ids already present are ignored.
    pub fn append(&mut self, record: AttendanceRecord) -> Result<()> {
        if self.get(&record.id).is_some() {
            debug!(id = %record.id, "Record already present, not appending");
            return Ok(());
        }
        self.records.insert(0, record);
        self.cache.write_all(&self.records)
    }

    pub fn replace_all(&mut self, records: Vec<AttendanceRecord>) -> Result<()> {
        self.records = dedupe(records);
        self.cache.write_all(&self.records)
    }

    /// Swap a local-only record for its synced copy, keeping its position.
    /// Passing `None` drops the local record.
    pub fn settle(&mut self, local_id: &str, synced: Option<AttendanceRecord>) -> Result<()> {
        let Some(pos) = self.records.iter().position(|r| r.id == local_id) else {
            return Ok(());
        };
        match synced {
            Some(record) if self.get(&record.id).is_none() => self.records[pos] = record,
            _ => {
                self.records.remove(pos);
            }
        }
        self.cache.write_all(&self.records)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.records.clear();
        self.cache.clear()
    }

    /// A `local-<millis>` id not used by any record in the directory.
    pub fn next_local_id(&self, now: DateTime<Utc>) -> String {
        let mut millis = now.timestamp_millis();
        loop {
            let id = format!("{}{}", LOCAL_ID_PREFIX, millis);
            if self.get(&id).is_none() {
                return id;
            }
            millis += 1;
        }
    }

    // ===== Projections =====

    /// Records whose name or registration contains `search` and whose course
    /// contains `course`, ignoring case.
    pub fn filter(&self, search: &str, course: &str) -> Vec<&AttendanceRecord> {
        self.records
            .iter()
            .filter(|r| {
                contains_ignore_case(&r.full_name, search)
                    || contains_ignore_case(&r.registration, search)
            })
            .filter(|r| contains_ignore_case(&r.course, course))
            .collect()
    }

    /// Distinct courses in first-seen order.
    pub fn courses(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.course.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    pub fn stats(&self, today: &str) -> DirectoryStats {
        DirectoryStats {
            total: self.records.len(),
            with_photo: self.records.iter().filter(|r| r.has_photo()).count(),
            today: self.records.iter().filter(|r| r.date == today).count(),
            pending: self.pending().count(),
        }
    }
}

/// Drop records whose id was already seen, keeping the first.
fn dedupe(records: Vec<AttendanceRecord>) -> Vec<AttendanceRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}
