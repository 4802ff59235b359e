#![allow(dead_code)]
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;

use checkin_core::api::{GatewayError, RemoteStore};
use checkin_core::config::PhotoPolicy;
use checkin_core::models::{NewRecord, PersistedRecord};
use checkin_core::{CacheManager, RecordDirectory, SyncEngine};

/// How the fake store answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Healthy,
    Down,
    Unconfigured,
    /// Accepts nothing, with a validation message that is not a duplicate.
    Rejecting,
}

/// In-memory remote store enforcing one check-in per registration per day.
pub struct FakeStore {
    mode: Mutex<Mode>,
    rows: Mutex<Vec<PersistedRecord>>,
    next_id: Mutex<u64>,
}

impl FakeStore {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode: Mutex::new(mode),
            rows: Mutex::new(Vec::new()),
            next_id: Mutex::new(100),
        }
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), GatewayError> {
        match *self.mode.lock().unwrap() {
            Mode::Healthy => Ok(()),
            Mode::Down => Err(GatewayError::Unavailable(
                "error sending request: connection refused".to_string(),
            )),
            Mode::Unconfigured => Err(GatewayError::Unconfigured),
            Mode::Rejecting => Err(GatewayError::rejected("new row violates check constraint")),
        }
    }
}

impl RemoteStore for FakeStore {
    async fn insert(&self, record: &NewRecord) -> Result<PersistedRecord, GatewayError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.registration == record.registration && r.date == record.date)
        {
            return Err(GatewayError::from_status(
                reqwest::StatusCode::CONFLICT,
                concat!(
                    r#"{"code":"23505","#,
                    r#""message":"duplicate key value violates unique constraint""#,
                    r#"}"#,
                ),
            ));
        }
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let stored = PersistedRecord {
            id: next_id.to_string(),
            full_name: record.full_name.clone(),
            registration: record.registration.clone(),
            course: record.course.clone(),
            photo: record.photo.clone(),
            date: record.date.clone(),
            time: record.time.clone(),
            timestamp: record.timestamp,
            created_at: Some(Utc::now()),
        };
        rows.insert(0, stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<PersistedRecord>, GatewayError> {
        self.check()?;
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn clear_all(&self) -> Result<(), GatewayError> {
        self.check()?;
        self.rows.lock().unwrap().clear();
        Ok(())
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        self.check()
    }
}

/// A fresh, empty cache directory unique to `name`.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("checkin_it_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

pub fn engine_with(name: &str, mode: Mode) -> (SyncEngine<FakeStore>, CacheManager) {
    let cache = CacheManager::new(temp_dir(name)).unwrap();
    let directory = RecordDirectory::init(cache.clone());
    (
        SyncEngine::new(FakeStore::new(mode), directory, PhotoPolicy::default()),
        cache,
    )
}
