//! Execution guard: acquire, run the protected work, release.
//!
//! The guard makes three promises:
//! - the work never starts unless the lock was acquired
//! - once acquired, the lock is released exactly once, whether the work
//!   completes, returns a fault, panics, or the process is asked to terminate
//! - a collision or a store fault on acquire is a clean skip, never retried
//!   here (the scheduler will invoke the task again)
//!
//! Each run logs exactly one outcome line: completed and released, skipped,
//! or completed with a failed release that will self-expire.


use crate::error::GuardError;
use crate::exit_codes;
use crate::locks::{LockCoordinator, ReleaseOutcome};
use crate::store::LockRecord;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tracing::{error, info, warn};

/// Default lease for a run's lock.
pub const DEFAULT_LEASE_SECONDS: u64 = 1800;

/// Why a run did not start its work.
#[derive(Debug)]
pub enum SkipReason {
    /// Another run holds the lock.
    Denied { holder: Option<Box<LockRecord>> },
    /// Acquisition failed for an operational reason.
    Fault(GuardError),
}

/// How the release at the end of a run went.
#[derive(Debug)]
pub enum ReleaseReport {
    Released(ReleaseOutcome),
    Failed(GuardError),
}

impl ReleaseReport {
    pub fn is_failed(&self) -> bool {
        matches!(self, ReleaseReport::Failed(_))
    }
}

/// Result of one guarded run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The lock was not acquired and the work was not invoked.
    Skipped(SkipReason),
    /// The work ran to completion.
    Completed { release: ReleaseReport },
    /// The work ran and reported a fault (or panicked).
    Failed {
        error: anyhow::Error,
        release: ReleaseReport,
    },
}

impl RunOutcome {
    /// Whether the protected work was invoked.
    pub fn work_ran(&self) -> bool {
        !matches!(self, RunOutcome::Skipped(_))
    }

    /// The release report, if the lock was acquired.
    pub fn release(&self) -> Option<&ReleaseReport> {
        match self {
            RunOutcome::Skipped(_) => None,
            RunOutcome::Completed { release } | RunOutcome::Failed { release, .. } => Some(release),
        }
    }

    /// Process exit status for this outcome.
    ///
    /// Skips and release failures are not application failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Skipped(_) | RunOutcome::Completed { .. } => exit_codes::SUCCESS,
            RunOutcome::Failed { .. } => exit_codes::TASK_FAILURE,
        }
    }
}

/// Sequences acquisition, protected work, and guaranteed release for one
/// task identity.
#[derive(Debug, Clone)]
pub struct ExecutionGuard {
    coordinator: LockCoordinator,
    task_id: String,
    lease: Duration,
}

impl ExecutionGuard {
    pub fn new(coordinator: LockCoordinator, task_id: impl Into<String>, lease: Duration) -> Self {
        Self {
            coordinator,
            task_id: task_id.into(),
            lease,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// Run `work` under the lock.
    pub fn run<F>(&self, work: F) -> RunOutcome
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        let task_id = self.task_id.as_str();

        let guard = match self.coordinator.acquire(task_id, self.lease) {
            Ok(guard) => guard,
            Err(GuardError::LockDenied { holder, .. }) => {
                info!(
                    task_id,
                    holder = holder.as_ref().and_then(|h| h.owner.as_deref()).unwrap_or("unknown"),
                    "lock denied, run skipped (another run is active)"
                );
                return RunOutcome::Skipped(SkipReason::Denied { holder });
            }
            Err(e) => {
                error!(task_id, error = %e, "lock acquisition failed, run skipped");
                return RunOutcome::Skipped(SkipReason::Fault(e));
            }
        };

        // Covers termination requests; unwinding and normal exit are covered
        // by the explicit release below and the guard's Drop.
        let registration = guard.register_for_termination();

        let result = match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(result) => result,
            Err(payload) => Err(anyhow::anyhow!("work panicked: {}", panic_message(payload.as_ref()))),
        };

        // Deregister only after the delete: a termination request arriving
        // mid-release must still find the cleanup and wait for it.
        let release = match self.coordinator.release(guard) {
            Ok(outcome) => ReleaseReport::Released(outcome),
            Err(e) => ReleaseReport::Failed(e),
        };
        drop(registration);

        match result {
            Ok(()) => {
                match &release {
                    ReleaseReport::Released(outcome) => info!(
                        task_id,
                        %outcome,
                        "lock acquired, work completed, lock released"
                    ),
                    ReleaseReport::Failed(e) => warn!(
                        task_id,
                        error = %e,
                        "lock acquired, work completed, release failed (will self-expire)"
                    ),
                }
                RunOutcome::Completed { release }
            }
            Err(e) => {
                match &release {
                    ReleaseReport::Released(outcome) => error!(
                        task_id,
                        %outcome,
                        error = %format!("{:#}", e),
                        "lock acquired, work failed, lock released"
                    ),
                    ReleaseReport::Failed(release_err) => error!(
                        task_id,
                        error = %format!("{:#}", e),
                        release_error = %release_err,
                        "lock acquired, work failed, release failed (will self-expire)"
                    ),
                }
                RunOutcome::Failed { error: e, release }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
