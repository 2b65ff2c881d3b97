//! Due-set policy tests
//!
//! Exercise the scheduling rules through the run-ledger contract: which
//! credentials are eligible for a new run given their run history, per-user
//! interval, and the platform floor.

mod common;

use chrono::{Duration, Utc};
use common::MemoryStore;
use reprise_worker::store::{RunLedger, RunRecordType, RunType, UserConfig};

const FLOOR: u32 = 30;

fn config(minutes: u32) -> UserConfig {
    UserConfig {
        sync_interval_minutes: minutes,
    }
}

fn success() -> RunRecordType {
    RunRecordType::Completed(RunType::DefaultPlaylistSync)
}

#[tokio::test]
async fn test_credential_with_no_runs_is_due() {
    let store = MemoryStore::new();
    store.insert_credential("user-1", "tok", "refresh", config(30));

    let due = store
        .due_credentials(RunType::DefaultPlaylistSync, FLOOR)
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].user_id, "user-1");
}

#[tokio::test]
async fn test_old_success_makes_credential_due_again() {
    let store = MemoryStore::new();
    let id = store.insert_credential("user-1", "tok", "refresh", config(30));
    store.insert_run_at(id, success(), Utc::now() - Duration::minutes(31));

    let due = store
        .due_credentials(RunType::DefaultPlaylistSync, FLOOR)
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
}

#[tokio::test]
async fn test_recent_success_suppresses_scheduling() {
    let store = MemoryStore::new();
    let id = store.insert_credential("user-1", "tok", "refresh", config(30));
    store.insert_run_at(id, success(), Utc::now() - Duration::minutes(5));

    let due = store
        .due_credentials(RunType::DefaultPlaylistSync, FLOOR)
        .await
        .unwrap();
    assert!(due.is_empty());
}

#[tokio::test]
async fn test_recent_error_run_also_suppresses_scheduling() {
    // A broken credential must not be hammered every tick.
    let store = MemoryStore::new();
    let id = store.insert_credential("user-1", "tok", "refresh", config(30));
    store.insert_run_at(id, RunRecordType::Error, Utc::now() - Duration::minutes(5));

    let due = store
        .due_credentials(RunType::DefaultPlaylistSync, FLOOR)
        .await
        .unwrap();
    assert!(due.is_empty());
}

#[tokio::test]
async fn test_old_error_run_allows_a_retry() {
    let store = MemoryStore::new();
    let id = store.insert_credential("user-1", "tok", "refresh", config(30));
    store.insert_run_at(id, RunRecordType::Error, Utc::now() - Duration::minutes(45));

    let due = store
        .due_credentials(RunType::DefaultPlaylistSync, FLOOR)
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
}

#[tokio::test]
async fn test_revoked_credential_is_never_due() {
    let store = MemoryStore::new();
    let id = store.insert_credential("user-1", "tok", "refresh", config(30));
    store.insert_run_at(
        id,
        RunRecordType::RevokedCredentials,
        Utc::now() - Duration::days(90),
    );

    let due = store
        .due_credentials(RunType::DefaultPlaylistSync, FLOOR)
        .await
        .unwrap();
    assert!(due.is_empty());
}

#[tokio::test]
async fn test_floor_overrides_a_too_short_user_interval() {
    let store = MemoryStore::new();
    let id = store.insert_credential("user-1", "tok", "refresh", config(5));
    store.insert_run_at(id, success(), Utc::now() - Duration::minutes(10));

    let due = store
        .due_credentials(RunType::DefaultPlaylistSync, FLOOR)
        .await
        .unwrap();
    assert!(due.is_empty());
}

#[tokio::test]
async fn test_long_user_interval_is_respected() {
    let store = MemoryStore::new();
    let id = store.insert_credential("user-1", "tok", "refresh", config(120));
    store.insert_run_at(id, success(), Utc::now() - Duration::minutes(60));

    let due = store
        .due_credentials(RunType::DefaultPlaylistSync, FLOOR)
        .await
        .unwrap();
    assert!(due.is_empty());
}

#[tokio::test]
async fn test_mixed_population_filters_independently() {
    let store = MemoryStore::new();
    let fresh = store.insert_credential("fresh", "tok-a", "refresh", config(30));
    let resting = store.insert_credential("resting", "tok-b", "refresh", config(30));
    let revoked = store.insert_credential("revoked", "tok-c", "refresh", config(30));

    store.insert_run_at(resting, success(), Utc::now() - Duration::minutes(2));
    store.insert_run_at(
        revoked,
        RunRecordType::RevokedCredentials,
        Utc::now() - Duration::days(1),
    );

    let due = store
        .due_credentials(RunType::DefaultPlaylistSync, FLOOR)
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, fresh);
}
