use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{GatewayError, RemoteStore};
use crate::config::PhotoPolicy;
use crate::directory::{RecordDirectory, ReloadSource};
use crate::export::photo;
use crate::models::{AttendanceRecord, CheckIn, NewRecord};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Where an accepted check-in ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Remote,
    Local,
}

/// Result of a submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Stored by the remote store and added to the directory.
    Remote(AttendanceRecord),
    /// Remote store failed; kept on this device only.
    Local {
        record: AttendanceRecord,
        reason: String,
    },
    /// Remote store says this person already checked in. Nothing was kept.
    Duplicate { reason: String },
}

impl Outcome {
    pub fn success(&self) -> bool {
        !matches!(self, Outcome::Duplicate { .. })
    }

    pub fn persisted(&self) -> Option<Persistence> {
        match self {
            Outcome::Remote(_) => Some(Persistence::Remote),
            Outcome::Local { .. } => Some(Persistence::Local),
            Outcome::Duplicate { .. } => None,
        }
    }

    pub fn record(&self) -> Option<&AttendanceRecord> {
        match self {
            Outcome::Remote(record) | Outcome::Local { record, .. } => Some(record),
            Outcome::Duplicate { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Remote(_) => None,
            Outcome::Local { reason, .. } | Outcome::Duplicate { reason } => Some(reason.as_str()),
        }
    }
}

/// Counts from pushing local-only records to the remote store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub synced: usize,
    pub duplicates: usize,
    pub still_pending: usize,
}

/// Result of `clear_all`, one entry per side.
#[derive(Debug)]
#[must_use]
pub struct ClearReport {
    pub remote: Result<(), GatewayError>,
    /// Removal of the cached records. The in-memory set is empty either way.
    pub local: anyhow::Result<()>,
}

impl ClearReport {
    pub fn is_complete(&self) -> bool {
        self.remote.is_ok() && self.local.is_ok()
    }
}

/// Reconciles submissions with a remote store, falling back to local
/// storage on anything but a duplicate rejection.
pub struct SyncEngine<S> {
    store: S,
    directory: RecordDirectory,
    photo_policy: PhotoPolicy,
}

impl<S: RemoteStore> SyncEngine<S> {
    pub fn new(store: S, directory: RecordDirectory, photo_policy: PhotoPolicy) -> Self {
        Self {
            store,
            directory,
            photo_policy,
        }
    }

    pub fn directory(&self) -> &RecordDirectory {
        &self.directory
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a check-in stamped with the current time.
    pub async fn submit(&mut self, input: CheckIn) -> Result<Outcome, SubmitError> {
        self.submit_at(input, Utc::now()).await
    }

    /// Record a check-in stamped with `now`.
    ///
    /// Order of effects: remote insert, directory append, cache mirror.
    pub async fn submit_at(
        &mut self,
        input: CheckIn,
        now: DateTime<Utc>,
    ) -> Result<Outcome, SubmitError> {
        self.validate(&input)?;
        let new_record = NewRecord::stamp(&input, now);

        match self.store.insert(&new_record).await {
            Ok(stored) => {
                let record = AttendanceRecord::from(stored);
                info!(id = %record.id, "Check-in stored remotely");
                self.keep(record.clone());
                Ok(Outcome::Remote(record))
            }
            Err(e) if e.is_duplicate() => {
                info!(error = %e, "Check-in rejected as duplicate");
                Ok(Outcome::Duplicate {
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                warn!(error = %e, "Remote store failed, keeping check-in locally");
                let id = self.directory.next_local_id(now);
                let record = new_record.into_record(id, None);
                self.keep(record.clone());
                Ok(Outcome::Local {
                    record,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn validate(&self, input: &CheckIn) -> Result<(), SubmitError> {
        if input.full_name.trim().is_empty() {
            return Err(SubmitError::InvalidInput("full name is required".to_string()));
        }
        if input.registration.trim().is_empty() {
            return Err(SubmitError::InvalidInput("registration is required".to_string()));
        }
        if let Some(p) = input.photo.as_deref().filter(|p| !p.trim().is_empty()) {
            photo::validate(p, &self.photo_policy)
                .map_err(|e| SubmitError::InvalidInput(e.to_string()))?;
        }
        Ok(())
    }

    /// Append to the directory. A failed mirror leaves the record in memory.
    fn keep(&mut self, record: AttendanceRecord) {
        if let Err(e) = self.directory.append(record) {
            warn!(error = %e, "Failed to mirror records to cache");
        }
    }

    /// Refresh the directory from the remote store (or the cache).
    pub async fn reload(&mut self) -> ReloadSource {
        self.directory.reload(&self.store).await
    }

    /// Clear the remote store and the directory. The local clear happens
    /// even when the remote one fails.
    pub async fn clear_all(&mut self) -> ClearReport {
        let remote = self.store.clear_all().await;
        if let Err(ref e) = remote {
            warn!(error = %e, "Remote clear failed, clearing local records anyway");
        }
        let local = self.directory.clear();
        if let Err(ref e) = local {
            warn!(error = %e, "Failed to clear cached records");
        }
        let report = ClearReport { remote, local };
        if report.is_complete() {
            info!("All records cleared");
        }
        report
    }

    pub async fn health_check(&self) -> Result<(), GatewayError> {
        self.store.health_check().await
    }

    /// Push every local-only record to the remote store again.
    ///
    /// Synced records replace their local copies. A duplicate rejection
    /// means the store already has this check-in, so the local copy is
    /// dropped. Anything else leaves the record pending.
    pub async fn retry_pending(&mut self) -> RetryReport {
        let pending: Vec<AttendanceRecord> = self.directory.pending().cloned().collect();
        let mut report = RetryReport::default();

        for local in pending {
            let new_record = NewRecord {
                full_name: local.full_name.clone(),
                registration: local.registration.clone(),
                course: local.course.clone(),
                photo: local.photo.clone(),
                date: local.date.clone(),
                time: local.time.clone(),
                timestamp: local.timestamp,
            };

            let settled = match self.store.insert(&new_record).await {
                Ok(stored) => {
                    debug!(local_id = %local.id, id = %stored.id, "Pending check-in synced");
                    report.synced += 1;
                    Some(AttendanceRecord::from(stored))
                }
                Err(e) if e.is_duplicate() => {
                    debug!(local_id = %local.id, "Pending check-in already stored remotely");
                    report.duplicates += 1;
                    None
                }
                Err(e) => {
                    debug!(local_id = %local.id, error = %e, "Pending check-in still unsynced");
                    report.still_pending += 1;
                    continue;
                }
            };

            if let Err(e) = self.directory.settle(&local.id, settled) {
                warn!(error = %e, "Failed to mirror records to cache");
            }
        }

        info!(
            synced = report.synced,
            duplicates = report.duplicates,
            still_pending = report.still_pending,
            "Pending check-ins retried"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersistedRecord;

    struct DownStore;

    impl RemoteStore for DownStore {
        async fn insert(&self, _record: &NewRecord) -> Result<PersistedRecord, GatewayError> {
            Err(GatewayError::Unavailable("connection refused".to_string()))
        }

        async fn list(&self) -> Result<Vec<PersistedRecord>, GatewayError> {
            Err(GatewayError::Unavailable("connection refused".to_string()))
        }

        async fn clear_all(&self) -> Result<(), GatewayError> {
            Err(GatewayError::Unavailable("connection refused".to_string()))
        }

        async fn health_check(&self) -> Result<(), GatewayError> {
            Err(GatewayError::Unavailable("connection refused".to_string()))
        }
    }

    fn engine(name: &str) -> SyncEngine<DownStore> {
        let dir = std::env::temp_dir()
            .join(format!("checkin_engine_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let cache = crate::cache::CacheManager::new(dir).unwrap();
        SyncEngine::new(DownStore, RecordDirectory::init(cache), PhotoPolicy::default())
    }

    #[tokio::test]
    async fn test_blank_registration_is_invalid() {
        let mut engine = engine("blank_reg");
        let result = engine.submit(CheckIn::new("Ana", "   ")).await;
        assert!(matches!(result, Err(SubmitError::InvalidInput(_))));
        assert!(engine.directory().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_photo_is_invalid() {
        let mut engine = engine("bad_photo");
        let input = CheckIn::new("Ana", "1").with_photo("data:image/gif;base64,R0lGOD==");
        let result = engine.submit(input).await;
        assert!(matches!(result, Err(SubmitError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_garbage_photo_is_invalid_before_storage() {
        let mut engine = engine("garbage_photo");
        let input = CheckIn::new("Ana", "1").with_photo("data:image/jpeg;base64,@@@@");
        let result = engine.submit(input).await;
        assert!(matches!(result, Err(SubmitError::InvalidInput(_))));
        assert!(engine.directory().is_empty());
        assert!(engine.directory().cache().read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_ids_unique_within_same_instant() {
        let mut engine = engine("same_instant");
        let now = Utc::now();
        let first = engine.submit_at(CheckIn::new("Ana", "1"), now).await.unwrap();
        let second = engine.submit_at(CheckIn::new("Bia", "2"), now).await.unwrap();
        assert_ne!(first.record().unwrap().id, second.record().unwrap().id);
        assert_eq!(engine.directory().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_all_clears_locally_when_remote_fails() {
        let mut engine = engine("clear_down");
        engine.submit(CheckIn::new("Ana", "1")).await.unwrap();
        let report = engine.clear_all().await;
        assert!(report.remote.is_err());
        assert!(report.local.is_ok());
        assert!(!report.is_complete());
        assert!(engine.directory().is_empty());
        assert!(engine.directory().cache().read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_all_reports_cache_removal_failure() {
        let mut engine = engine("clear_local_fail");
        engine.submit(CheckIn::new("Ana", "1")).await.unwrap();

        // A directory where the records file belongs cannot be removed as a file
        let records_file = engine.directory().cache().dir().join("attendanceRecords.json");
        std::fs::remove_file(&records_file).unwrap();
        std::fs::create_dir(&records_file).unwrap();

        let report = engine.clear_all().await;
        assert!(report.local.is_err());
        assert!(!report.is_complete());
        assert!(engine.directory().is_empty());
    }

    #[tokio::test]
    async fn test_retry_keeps_pending_while_down() {
        let mut engine = engine("retry_down");
        engine.submit(CheckIn::new("Ana", "1")).await.unwrap();
        let report = engine.retry_pending().await;
        assert_eq!(report.still_pending, 1);
        assert_eq!(engine.directory().pending().count(), 1);
    }

    #[test]
    fn test_outcome_accessors() {
        let duplicate = Outcome::Duplicate {
            reason: "already registered".to_string(),
        };
        assert!(!duplicate.success());
        assert_eq!(duplicate.persisted(), None);
        assert_eq!(duplicate.reason(), Some("already registered"));
        assert!(duplicate.record().is_none());
    }
}
