//! Tests for the lock store backends.

use super::*;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const LEASE: Duration = Duration::from_secs(1800);

fn expired_record(task_id: &str, seconds_ago: i64) -> LockRecord {
    let mut record = LockRecord::new(task_id, LEASE);
    record.ttl = chrono::Utc::now().timestamp() - seconds_ago;
    record
}

fn file_store() -> (TempDir, FileLockStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = FileLockStore::new(temp_dir.path(), None, "task-state").unwrap();
    (temp_dir, store)
}

/// Count successful inserts of the same key from `threads` racing threads.
fn race_inserts(store: Arc<dyn LockStore>, threads: usize) -> usize {
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let record = LockRecord::new("batch-task-1", LEASE);
                barrier.wait();
                store.put_if_absent(&record).unwrap()
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|outcome| *outcome == InsertOutcome::Inserted)
        .count()
}

#[test]
fn test_record_new_sets_future_ttl() {
    let now = chrono::Utc::now().timestamp();
    let record = LockRecord::new("batch-task-1", LEASE);

    assert_eq!(record.status, LockStatus::Running);
    assert!(record.ttl >= now + 1800);
    assert!(record.ttl <= now + 1801);
    assert!(!record.is_expired());
    assert!(record.owner.as_deref().unwrap_or("").contains('@'));
    assert_eq!(record.pid, Some(std::process::id()));
}

#[test]
fn test_record_serializes_status_as_running() {
    let record = LockRecord::new("batch-task-1", LEASE);
    let json = serde_json::to_string(&record).unwrap();

    assert!(json.contains("\"status\":\"running\""));
    assert!(json.contains("\"task_id\":\"batch-task-1\""));
    assert!(json.contains("\"ttl\":"));
}

#[test]
fn test_record_parses_minimal_document() {
    let json = r#"{"task_id":"batch-task-1","status":"running","ttl":1700000000}"#;
    let record: LockRecord = serde_json::from_str(json).unwrap();

    assert_eq!(record.ttl, 1_700_000_000);
    assert!(record.owner.is_none());
    assert!(record.is_expired());
}

#[test]
fn test_record_remaining_string() {
    let mut record = LockRecord::new("batch-task-1", Duration::from_secs(2 * 3600 + 120));
    assert!(record.remaining_string().contains('h'));

    record.ttl = chrono::Utc::now().timestamp() - 10;
    assert_eq!(record.remaining_string(), "0m");
}

#[test]
fn test_memory_insert_then_condition_failed() {
    let store = MemoryLockStore::new();
    let first = LockRecord::new("batch-task-1", LEASE);

    assert_eq!(store.put_if_absent(&first).unwrap(), InsertOutcome::Inserted);

    let second = LockRecord::new("batch-task-1", LEASE);
    match store.put_if_absent(&second).unwrap() {
        InsertOutcome::ConditionFailed { existing } => assert_eq!(existing, Some(first)),
        other => panic!("expected ConditionFailed, got {:?}", other),
    }
    assert_eq!(store.len(), 1);
}

#[test]
fn test_memory_expired_record_is_treated_as_absent() {
    let store = MemoryLockStore::new();
    store.put(expired_record("batch-task-1", 3600));

    let fresh = LockRecord::new("batch-task-1", LEASE);
    assert_eq!(store.put_if_absent(&fresh).unwrap(), InsertOutcome::Inserted);
    assert_eq!(store.get("batch-task-1").unwrap(), Some(fresh));
}

#[test]
fn test_memory_delete_is_idempotent() {
    let store = MemoryLockStore::new();
    store
        .put_if_absent(&LockRecord::new("batch-task-1", LEASE))
        .unwrap();

    assert_eq!(store.delete("batch-task-1").unwrap(), DeleteOutcome::Deleted);
    assert_eq!(store.delete("batch-task-1").unwrap(), DeleteOutcome::NotFound);
    assert!(store.is_empty());
}

#[test]
fn test_memory_keys_are_independent() {
    let store = MemoryLockStore::new();

    assert_eq!(
        store.put_if_absent(&LockRecord::new("batch-task-1", LEASE)).unwrap(),
        InsertOutcome::Inserted
    );
    assert_eq!(
        store.put_if_absent(&LockRecord::new("batch-task-2", LEASE)).unwrap(),
        InsertOutcome::Inserted
    );
}

#[test]
fn test_memory_concurrent_inserts_admit_exactly_one() {
    let store: Arc<dyn LockStore> = Arc::new(MemoryLockStore::new());
    assert_eq!(race_inserts(store, 16), 1);
}

#[test]
fn test_file_store_layout() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileLockStore::new(temp_dir.path(), Some("ap-northeast-1"), "task-state").unwrap();

    let path = store.record_path("batch-task-1").unwrap();
    assert_eq!(
        path,
        temp_dir
            .path()
            .join("ap-northeast-1")
            .join("task-state")
            .join("batch-task-1.lock")
    );
    assert_eq!(store.location(), store.dir().display().to_string());
}

#[test]
fn test_file_insert_writes_record() {
    let (_temp_dir, store) = file_store();
    let record = LockRecord::new("batch-task-1", LEASE);

    assert_eq!(store.put_if_absent(&record).unwrap(), InsertOutcome::Inserted);

    let path = store.record_path("batch-task-1").unwrap();
    assert!(path.exists());
    assert_eq!(store.get("batch-task-1").unwrap(), Some(record));

    // No scratch files left behind
    let leftovers: Vec<_> = std::fs::read_dir(store.dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_file_insert_condition_failed_returns_holder() {
    let (_temp_dir, store) = file_store();
    let first = LockRecord::new("batch-task-1", LEASE);
    store.put_if_absent(&first).unwrap();

    match store
        .put_if_absent(&LockRecord::new("batch-task-1", LEASE))
        .unwrap()
    {
        InsertOutcome::ConditionFailed { existing } => assert_eq!(existing, Some(first)),
        other => panic!("expected ConditionFailed, got {:?}", other),
    }
}

#[test]
fn test_file_expired_record_is_reclaimed() {
    let (_temp_dir, store) = file_store();
    let path = store.record_path("batch-task-1").unwrap();
    std::fs::create_dir_all(store.dir()).unwrap();
    let stale = expired_record("batch-task-1", 3600);
    std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

    let fresh = LockRecord::new("batch-task-1", LEASE);
    assert_eq!(store.put_if_absent(&fresh).unwrap(), InsertOutcome::Inserted);
    assert_eq!(store.get("batch-task-1").unwrap(), Some(fresh));
}

#[test]
fn test_file_get_returns_expired_record_until_swept() {
    let (_temp_dir, store) = file_store();
    let path = store.record_path("batch-task-1").unwrap();
    std::fs::create_dir_all(store.dir()).unwrap();
    let stale = expired_record("batch-task-1", 60);
    std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

    let read = store.get("batch-task-1").unwrap().unwrap();
    assert!(read.is_expired());
}

#[test]
fn test_file_unreadable_record_is_discarded() {
    let (_temp_dir, store) = file_store();
    let path = store.record_path("batch-task-1").unwrap();
    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(&path, "not json").unwrap();

    assert!(matches!(
        store.get("batch-task-1"),
        Err(StoreError::Malformed { .. })
    ));
    assert_eq!(
        store
            .put_if_absent(&LockRecord::new("batch-task-1", LEASE))
            .unwrap(),
        InsertOutcome::Inserted
    );
}

#[test]
fn test_file_delete_is_idempotent() {
    let (_temp_dir, store) = file_store();
    store
        .put_if_absent(&LockRecord::new("batch-task-1", LEASE))
        .unwrap();

    assert_eq!(store.delete("batch-task-1").unwrap(), DeleteOutcome::Deleted);
    assert_eq!(store.delete("batch-task-1").unwrap(), DeleteOutcome::NotFound);
    assert_eq!(store.get("batch-task-1").unwrap(), None);
}

#[test]
fn test_file_delete_without_directory() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileLockStore::at(temp_dir.path().join("never-created"));

    assert_eq!(store.delete("batch-task-1").unwrap(), DeleteOutcome::NotFound);
    assert_eq!(store.get("batch-task-1").unwrap(), None);
}

#[test]
fn test_file_rejects_unsafe_keys() {
    let (_temp_dir, store) = file_store();

    for key in ["", "../escape", ".hidden", "a/b", "spaced key"] {
        assert!(
            matches!(store.record_path(key), Err(StoreError::InvalidKey { .. })),
            "key {:?} should be rejected",
            key
        );
    }
    assert!(store.record_path("batch-task-1.v2_x").is_ok());
}

#[test]
fn test_file_rejects_unsafe_table() {
    let temp_dir = TempDir::new().unwrap();
    assert!(FileLockStore::new(temp_dir.path(), None, "../tables").is_err());
    assert!(FileLockStore::new(temp_dir.path(), Some("a/b"), "tasks").is_err());
}

#[test]
fn test_file_concurrent_inserts_admit_exactly_one() {
    let (_temp_dir, store) = file_store();
    let store: Arc<dyn LockStore> = Arc::new(store);
    assert_eq!(race_inserts(store, 16), 1);
}

#[test]
fn test_file_concurrent_reclaim_of_expired_record_admits_exactly_one() {
    let (_temp_dir, store) = file_store();
    let path = store.record_path("batch-task-1").unwrap();
    std::fs::create_dir_all(store.dir()).unwrap();
    let store: Arc<dyn LockStore> = Arc::new(store);

    for round in 0..200 {
        let stale = expired_record("batch-task-1", 3600);
        std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        let winners = race_inserts(Arc::clone(&store), 16);
        assert_eq!(winners, 1, "round {} admitted {} holders", round, winners);

        let held = store.get("batch-task-1").unwrap().unwrap();
        assert!(!held.is_expired());
        std::fs::remove_file(&path).unwrap();
    }
}

#[test]
fn test_file_released_record_is_not_restored_by_reclaim() {
    let (_temp_dir, store) = file_store();
    let path = store.record_path("batch-task-1").unwrap();
    std::fs::create_dir_all(store.dir()).unwrap();
    let store = Arc::new(store);

    for _ in 0..100 {
        let stale = expired_record("batch-task-1", 3600);
        std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let record = LockRecord::new("batch-task-1", LEASE);
                    barrier.wait();
                    if store.put_if_absent(&record).unwrap() == InsertOutcome::Inserted {
                        store.delete("batch-task-1").unwrap();
                        true
                    } else {
                        false
                    }
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert!(winners >= 1);

        // Every winner released, so nothing may linger once the race is over.
        assert_eq!(store.get("batch-task-1").unwrap(), None);
    }
}

#[test]
fn test_file_mutex_is_not_a_record() {
    let (_temp_dir, store) = file_store();
    store
        .put_if_absent(&LockRecord::new("batch-task-1", LEASE))
        .unwrap();
    store.delete("batch-task-1").unwrap();

    assert!(store.dir().join("batch-task-1.mutex").exists());
    assert_eq!(store.get("batch-task-1").unwrap(), None);
    assert_eq!(
        store
            .put_if_absent(&LockRecord::new("batch-task-1", LEASE))
            .unwrap(),
        InsertOutcome::Inserted
    );
}
