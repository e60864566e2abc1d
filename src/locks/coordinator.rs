//! Lock acquisition, release, and operator operations.

use super::guard::LockGuard;
use super::types::ReleaseOutcome;
use crate::error::{GuardError, Result, StoreOp};
use crate::store::{DeleteOutcome, InsertOutcome, LockRecord, LockStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Runs the lock protocol against a [`LockStore`].
///
/// Task identity and lease are per-call inputs, so one coordinator can guard
/// any number of distinct logical tasks.
#[derive(Debug, Clone)]
pub struct LockCoordinator {
    store: Arc<dyn LockStore>,
}

impl LockCoordinator {
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn LockStore> {
        &self.store
    }

    /// Acquire the lock for `task_id`, valid for `lease` from now.
    ///
    /// Acquisition is a single conditional insert, so among any number of
    /// concurrent attempts for the same identity exactly one succeeds.
    ///
    /// # Returns
    ///
    /// * `Ok(LockGuard)` - The lock is held; the only outcome that authorizes work
    /// * `Err(GuardError::LockDenied)` - Another run holds the lock
    /// * `Err(GuardError::StoreFault)` - The store call failed
    /// * `Err(GuardError::UserError)` - Empty identity or zero lease
    pub fn acquire(&self, task_id: &str, lease: Duration) -> Result<LockGuard> {
        if task_id.is_empty() {
            return Err(GuardError::UserError(
                "task identity must not be empty".to_string(),
            ));
        }
        if lease.is_zero() {
            return Err(GuardError::UserError(
                "lease duration must be greater than 0".to_string(),
            ));
        }

        let record = LockRecord::new(task_id, lease);
        match self.store.put_if_absent(&record) {
            Ok(InsertOutcome::Inserted) => {
                info!(
                    task_id,
                    ttl = record.ttl,
                    store = %self.store.location(),
                    "lock acquired"
                );
                Ok(LockGuard::new(Arc::clone(&self.store), record))
            }
            Ok(InsertOutcome::ConditionFailed { existing }) => {
                debug!(task_id, holder = ?existing, "conditional insert rejected");
                Err(GuardError::LockDenied {
                    task_id: task_id.to_string(),
                    holder: existing.map(Box::new),
                })
            }
            Err(source) => Err(GuardError::StoreFault {
                op: StoreOp::Acquire,
                task_id: task_id.to_string(),
                source,
            }),
        }
    }

    /// Release a held lock.
    ///
    /// Deletion is unconditional and idempotent: a record that already
    /// expired or was cleared counts as released.
    pub fn release(&self, guard: LockGuard) -> Result<ReleaseOutcome> {
        guard.release()
    }

    /// Read the current record for `task_id`, if any.
    pub fn inspect(&self, task_id: &str) -> Result<Option<LockRecord>> {
        self.store.get(task_id).map_err(|source| GuardError::StoreFault {
            op: StoreOp::Inspect,
            task_id: task_id.to_string(),
            source,
        })
    }

    /// Delete the record for `task_id` regardless of who holds it.
    ///
    /// Returns the record that was removed, if one was readable. The caller is
    /// responsible for deciding that clearing is appropriate.
    pub fn force_clear(&self, task_id: &str) -> Result<Option<LockRecord>> {
        let fault = |source| GuardError::StoreFault {
            op: StoreOp::Clear,
            task_id: task_id.to_string(),
            source,
        };

        // An unreadable record is still cleared.
        let existing = self.store.get(task_id).ok().flatten();
        match self.store.delete(task_id).map_err(fault)? {
            DeleteOutcome::Deleted => Ok(existing),
            DeleteOutcome::NotFound => Ok(None),
        }
    }
}
