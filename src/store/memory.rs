//! In-process lock store.

use super::{DeleteOutcome, InsertOutcome, LockRecord, LockStore, StoreError};
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Lock store backed by a concurrent map.
///
/// Clones share the same map, so threads holding separate clones contend on
/// the same keys. The map's per-shard locking makes `put_if_absent` atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryLockStore {
    records: Arc<DashMap<String, LockRecord>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored, expired ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write a record unconditionally, replacing any existing one.
    #[cfg(test)]
    pub(crate) fn put(&self, record: LockRecord) {
        self.records.insert(record.task_id.clone(), record);
    }
}

impl LockStore for MemoryLockStore {
    fn put_if_absent(&self, record: &LockRecord) -> Result<InsertOutcome, StoreError> {
        let now = Utc::now().timestamp();
        match self.records.entry(record.task_id.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired_at(now) {
                    entry.insert(record.clone());
                    Ok(InsertOutcome::Inserted)
                } else {
                    Ok(InsertOutcome::ConditionFailed {
                        existing: Some(entry.get().clone()),
                    })
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(record.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    fn delete(&self, task_id: &str) -> Result<DeleteOutcome, StoreError> {
        Ok(match self.records.remove(task_id) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }

    fn get(&self, task_id: &str) -> Result<Option<LockRecord>, StoreError> {
        Ok(self.records.get(task_id).map(|r| r.value().clone()))
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
