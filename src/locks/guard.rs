//! RAII lock guard implementation.

use super::types::ReleaseOutcome;
use crate::error::{GuardError, Result};
use crate::store::{DeleteOutcome, LockRecord, LockStore};
use crate::termination::{self, Cleanup, Registration};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

/// The release a guard still owes. Shared between the guard and the
/// termination registry so whichever path runs first performs the delete.
#[derive(Debug)]
pub(super) struct PendingRelease {
    store: Arc<dyn LockStore>,
    task_id: String,
    /// Set once the delete has been attempted. Held for the whole delete, so
    /// a second caller waits for an in-flight release to finish.
    fired: Mutex<bool>,
}

impl PendingRelease {
    fn fired(&self) -> MutexGuard<'_, bool> {
        self.fired.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Delete the record unless an earlier call already did.
    ///
    /// Returns `None` if the release already ran. Blocks while another
    /// thread's release is in progress.
    fn fire(&self) -> Option<Result<ReleaseOutcome>> {
        let mut fired = self.fired();
        if *fired {
            return None;
        }
        *fired = true;

        let result = match self.store.delete(&self.task_id) {
            Ok(DeleteOutcome::Deleted) => Ok(ReleaseOutcome::Released),
            Ok(DeleteOutcome::NotFound) => Ok(ReleaseOutcome::AlreadyAbsent),
            Err(source) => Err(GuardError::ReleaseFailed {
                task_id: self.task_id.clone(),
                source,
            }),
        };
        Some(result)
    }

    fn log(&self, result: &Result<ReleaseOutcome>) {
        match result {
            Ok(ReleaseOutcome::AlreadyAbsent) => info!(
                task_id = %self.task_id,
                "lock record was already absent at release (expired or cleared)"
            ),
            Ok(outcome) => info!(task_id = %self.task_id, %outcome, "lock released"),
            Err(e) => warn!(task_id = %self.task_id, error = %e, "lock release failed"),
        }
    }
}

impl Cleanup for PendingRelease {
    fn run_cleanup(&self) {
        if let Some(result) = self.fire() {
            self.log(&result);
        }
    }

    fn describe(&self) -> String {
        format!("release lock '{}'", self.task_id)
    }
}

/// A held lock.
///
/// When dropped, the lock record is deleted. If deletion fails, a warning is
/// logged but no panic occurs; the record expires at its ttl.
#[derive(Debug)]
pub struct LockGuard {
    record: LockRecord,
    pending: Arc<PendingRelease>,
}

impl LockGuard {
    pub(super) fn new(store: Arc<dyn LockStore>, record: LockRecord) -> Self {
        let pending = Arc::new(PendingRelease {
            store,
            task_id: record.task_id.clone(),
            fired: Mutex::new(false),
        });
        Self { record, pending }
    }

    /// The task identity this guard holds.
    pub fn task_id(&self) -> &str {
        &self.record.task_id
    }

    /// The record written at acquisition.
    pub fn record(&self) -> &LockRecord {
        &self.record
    }

    /// Whether the release has already run on some path.
    pub fn is_released(&self) -> bool {
        *self.pending.fired()
    }

    /// Arrange for this lock to be released if the process is terminated
    /// while the returned registration is alive.
    pub fn register_for_termination(&self) -> Registration {
        termination::register(Arc::clone(&self.pending) as Arc<dyn Cleanup>)
    }

    /// Release the lock now and report the outcome.
    pub fn release(self) -> Result<ReleaseOutcome> {
        self.pending
            .fire()
            .unwrap_or(Ok(ReleaseOutcome::AlreadyReleased))
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(result) = self.pending.fire() {
            self.pending.log(&result);
        }
    }
}
