//! runlock: single-run execution guard for scheduled batch tasks.
//!
//! A run acquires an exclusive, time-bounded lock record for its task
//! identity before doing any work, and releases it when the work ends. Runs
//! that find the lock held skip cleanly; a lock whose holder died expires on
//! its own after the lease.
//!
//! ```no_run
//! use runlock::execution::ExecutionGuard;
//! use runlock::locks::LockCoordinator;
//! use runlock::store::FileLockStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = FileLockStore::new("/var/lib/runlock", None, "task-state")?;
//! let guard = ExecutionGuard::new(
//!     LockCoordinator::new(Arc::new(store)),
//!     "batch-task-1",
//!     Duration::from_secs(1800),
//! );
//! let outcome = guard.run(|| {
//!     // business logic
//!     Ok(())
//! });
//! std::process::exit(outcome.exit_code());
//! # Ok::<(), runlock::store::StoreError>(())
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod execution;
pub mod exit_codes;
pub mod locks;
pub mod logging;
pub mod store;
pub mod termination;
pub mod work;

#[cfg(test)]
mod test_support;
