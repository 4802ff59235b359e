mod common;

use common::{engine_with, Mode};

use checkin_core::export::photo::encode_data_url;
use checkin_core::{CheckIn, Persistence, ReloadSource, SubmitError};

fn ana() -> CheckIn {
    CheckIn::new("Ana Silva", "12345").with_course("Math")
}

#[tokio::test]
async fn test_healthy_store_persists_remotely() {
    let (mut engine, cache) = engine_with("healthy", Mode::Healthy);
    let before = engine.directory().len();

    let outcome = engine.submit(ana()).await.unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.persisted(), Some(Persistence::Remote));
    let record = outcome.record().unwrap();
    assert!(!record.has_photo());
    assert_eq!(record.course, "Math");
    assert_eq!(engine.directory().len(), before + 1);
    assert_eq!(engine.store().row_count(), 1);

    let with_id: Vec<_> = engine
        .directory()
        .all()
        .iter()
        .filter(|r| r.id == record.id)
        .collect();
    assert_eq!(with_id.len(), 1);
    assert!(record.created_at.is_some());
    assert_eq!(cache.read_all().unwrap(), engine.directory().all());
}

#[tokio::test]
async fn test_network_failure_falls_back_to_local() {
    let (mut engine, cache) = engine_with("network_down", Mode::Down);

    let outcome = engine.submit(ana()).await.unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.persisted(), Some(Persistence::Local));
    assert!(outcome.reason().unwrap().contains("connection refused"));
    let record = outcome.record().unwrap().clone();
    assert!(record.is_local_only());
    assert_eq!(engine.directory().len(), 1);
    assert!(cache.read_all().unwrap().contains(&record));
}

#[tokio::test]
async fn test_unconfigured_and_other_rejections_fall_back_to_local() {
    for (name, mode) in [("unconfigured", Mode::Unconfigured), ("rejecting", Mode::Rejecting)] {
        let (mut engine, cache) = engine_with(name, mode);
        let outcome = engine.submit(ana()).await.unwrap();
        assert_eq!(outcome.persisted(), Some(Persistence::Local), "{}", name);
        assert_eq!(cache.read_all().unwrap().len(), 1, "{}", name);
    }
}

#[tokio::test]
async fn test_empty_name_is_rejected_before_persistence() {
    let (mut engine, cache) = engine_with("empty_name", Mode::Healthy);

    let result = engine.submit(CheckIn::new("   ", "12345")).await;

    assert!(matches!(result, Err(SubmitError::InvalidInput(_))));
    assert!(engine.directory().is_empty());
    assert_eq!(engine.store().row_count(), 0);
    assert!(cache.read_all().unwrap().is_empty());
}

#[tokio::test]
async fn test_second_check_in_same_day_is_duplicate() {
    let (mut engine, cache) = engine_with("duplicate", Mode::Healthy);

    let first = engine.submit(CheckIn::new("Ana Silva", "12345")).await.unwrap();
    assert!(first.success());
    let snapshot = engine.directory().all().to_vec();

    let second = engine.submit(CheckIn::new("Ana Silva", "12345")).await.unwrap();

    assert!(!second.success());
    assert_eq!(second.persisted(), None);
    assert!(second.record().is_none());
    assert_eq!(engine.directory().all(), snapshot.as_slice());
    assert_eq!(cache.read_all().unwrap(), snapshot);
    assert_eq!(engine.store().row_count(), 1);
}

#[tokio::test]
async fn test_has_photo_matches_photo_presence() {
    let (mut engine, _cache) = engine_with("photo", Mode::Healthy);
    let photo = encode_data_url(b"\xFF\xD8\xFF\xE0", "image/jpeg");

    let with = engine
        .submit(CheckIn::new("Ana Silva", "1").with_photo(photo.clone()))
        .await
        .unwrap();
    let without = engine.submit(CheckIn::new("Bia Costa", "2")).await.unwrap();
    let blank = engine
        .submit(CheckIn::new("Caio Reis", "3").with_photo(""))
        .await
        .unwrap();

    let with = with.record().unwrap();
    assert!(with.has_photo());
    assert_eq!(with.photo.as_deref(), Some(photo.as_str()));
    assert!(!without.record().unwrap().has_photo());
    assert!(!blank.record().unwrap().has_photo());
}

#[tokio::test]
async fn test_reload_twice_is_idempotent() {
    let (mut engine, _cache) = engine_with("reload_twice", Mode::Healthy);
    engine.submit(ana()).await.unwrap();
    engine.submit(CheckIn::new("Bia Costa", "67890")).await.unwrap();

    let first_source = engine.reload().await;
    let first = engine.directory().all().to_vec();
    let second_source = engine.reload().await;

    assert_eq!(first_source, ReloadSource::Remote { count: 2 });
    assert_eq!(second_source, first_source);
    assert_eq!(engine.directory().all(), first.as_slice());
}

#[tokio::test]
async fn test_reload_falls_back_to_cache_when_store_down() {
    let (mut engine, cache) = engine_with("reload_down", Mode::Healthy);
    engine.submit(ana()).await.unwrap();
    engine.store().set_mode(Mode::Down);

    let source = engine.reload().await;

    assert!(matches!(source, ReloadSource::Cache { count: 1, .. }));
    assert_eq!(engine.directory().all(), cache.read_all().unwrap().as_slice());
}

#[tokio::test]
async fn test_reload_never_fails_on_corrupt_cache() {
    let (mut engine, cache) = engine_with("reload_corrupt", Mode::Down);
    std::fs::write(cache.dir().join("attendanceRecords.json"), "[[[").unwrap();

    let source = engine.reload().await;

    assert!(matches!(source, ReloadSource::Empty { .. }));
    assert!(engine.directory().is_empty());
}

#[tokio::test]
async fn test_reload_keeps_unsynced_local_records() {
    let (mut engine, cache) = engine_with("reload_pending", Mode::Down);
    let local = engine.submit(ana()).await.unwrap().record().unwrap().clone();

    engine.store().set_mode(Mode::Healthy);
    engine.submit(CheckIn::new("Bia Costa", "67890")).await.unwrap();
    engine.reload().await;

    assert_eq!(engine.directory().len(), 2);
    assert!(engine.directory().get(&local.id).is_some());
    assert_eq!(cache.read_all().unwrap(), engine.directory().all());
}

#[tokio::test]
async fn test_clear_all_then_reload_is_empty() {
    let (mut engine, cache) = engine_with("clear_reload", Mode::Healthy);
    engine.submit(ana()).await.unwrap();
    engine.submit(CheckIn::new("Bia Costa", "67890")).await.unwrap();

    assert!(engine.clear_all().await.is_complete());
    engine.reload().await;

    assert!(engine.directory().is_empty());
    assert!(cache.read_all().unwrap().is_empty());
    assert_eq!(engine.store().row_count(), 0);
}

#[tokio::test]
async fn test_retry_pending_promotes_local_records() {
    let (mut engine, cache) = engine_with("retry", Mode::Down);
    let local = engine.submit(ana()).await.unwrap().record().unwrap().clone();
    engine.submit(CheckIn::new("Bia Costa", "67890")).await.unwrap();
    assert_eq!(engine.directory().pending().count(), 2);

    engine.store().set_mode(Mode::Healthy);
    let report = engine.retry_pending().await;

    assert_eq!(report.synced, 2);
    assert_eq!(report.still_pending, 0);
    assert_eq!(engine.directory().pending().count(), 0);
    assert!(engine.directory().get(&local.id).is_none());
    assert_eq!(engine.directory().len(), 2);
    assert_eq!(engine.store().row_count(), 2);
    assert_eq!(cache.read_all().unwrap(), engine.directory().all());
}

#[tokio::test]
async fn test_retry_drops_local_copy_already_stored_remotely() {
    let (mut engine, _cache) = engine_with("retry_dup", Mode::Down);
    engine.submit(ana()).await.unwrap();

    // Same person checked in from another device while this one was offline
    engine.store().set_mode(Mode::Healthy);
    let outcome = engine.submit(ana()).await.unwrap();
    assert!(outcome.success());

    let report = engine.retry_pending().await;

    assert_eq!(report.duplicates, 1);
    assert_eq!(engine.directory().len(), 1);
    assert_eq!(engine.directory().pending().count(), 0);
}
