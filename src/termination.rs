//! Cleanup on external termination requests.
//!
//! Scoped guards cover every exit path that unwinds normally. A SIGTERM or
//! SIGINT does not unwind: the process just stops. To release the lock anyway,
//! holders register a [`Cleanup`] here while their scope is live, and the
//! handler installed by [`install_handler`] runs everything registered (most
//! recent first) before exiting with [`exit_codes::TERMINATED`].
//!
//! Cleanups must tolerate running on the handler thread while the main thread
//! is still inside the protected work, and must be safe to run twice.

use crate::error::{GuardError, Result};
use crate::exit_codes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use tracing::{info, warn};

/// An action to run if the process is asked to terminate.
pub trait Cleanup: Send + Sync {
    /// Run the action. Must be idempotent.
    fn run_cleanup(&self);

    /// Short description for log lines.
    fn describe(&self) -> String;
}

struct Entry {
    id: u64,
    cleanup: Arc<dyn Cleanup>,
}

static REGISTRY: LazyLock<Mutex<Vec<Entry>>> = LazyLock::new(|| Mutex::new(Vec::new()));
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn registry() -> MutexGuard<'static, Vec<Entry>> {
    // A panic while holding the lock must not disable cleanup.
    REGISTRY.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Keeps a cleanup registered until dropped.
#[derive(Debug)]
#[must_use = "the cleanup is deregistered as soon as the registration is dropped"]
pub struct Registration {
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        registry().retain(|entry| entry.id != self.id);
    }
}

/// Register `cleanup` to run if a termination request arrives.
pub fn register(cleanup: Arc<dyn Cleanup>) -> Registration {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    registry().push(Entry { id, cleanup });
    Registration { id }
}

/// Number of cleanups currently registered.
pub fn registered_count() -> usize {
    registry().len()
}

/// Drain the registry and run every cleanup, most recently registered first.
///
/// Returns how many cleanups ran. The registry lock is not held while they
/// run, so a cleanup may itself drop registrations.
pub fn run_registered() -> usize {
    let entries = std::mem::take(&mut *registry());
    for entry in entries.iter().rev() {
        info!(cleanup = %entry.cleanup.describe(), "running termination cleanup");
        entry.cleanup.run_cleanup();
    }
    entries.len()
}

/// Install the process-wide handler for SIGINT, SIGTERM and SIGHUP.
///
/// May only be called once per process.
pub fn install_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        warn!("termination requested");
        let ran = run_registered();
        info!(cleanups = ran, "termination cleanup finished, exiting");
        std::process::exit(exit_codes::TERMINATED);
    })
    .map_err(|e| GuardError::UserError(format!("failed to install termination handler: {}", e)))
}
