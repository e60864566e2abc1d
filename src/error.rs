//! Error types for runlock.
//!
//! Uses thiserror for derive macros. Store failures are carried as wrapped
//! causes so operators see the underlying I/O or parse error, not just a
//! summary string.

use crate::exit_codes;
use crate::store::{LockRecord, StoreError};
use thiserror::Error;

/// The lock operation that hit a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Acquire,
    Release,
    Inspect,
    Clear,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreOp::Acquire => write!(f, "acquire"),
            StoreOp::Release => write!(f, "release"),
            StoreOp::Inspect => write!(f, "inspect"),
            StoreOp::Clear => write!(f, "clear"),
        }
    }
}

/// Main error type for runlock operations.
#[derive(Error, Debug)]
pub enum GuardError {
    /// Another run currently holds the lock. Expected, not a fault.
    #[error("lock '{task_id}' is held by another run{}", holder_hint(.holder))]
    LockDenied {
        task_id: String,
        holder: Option<Box<LockRecord>>,
    },

    /// The store call failed for infrastructure reasons.
    #[error("lock store failed during {op} of '{task_id}': {source}")]
    StoreFault {
        op: StoreOp,
        task_id: String,
        #[source]
        source: StoreError,
    },

    /// The lock could not be deleted. It will self-expire at its ttl.
    #[error("failed to release lock '{task_id}' (it will expire on its own): {source}")]
    ReleaseFailed {
        task_id: String,
        #[source]
        source: StoreError,
    },

    /// The protected work reported a fault.
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// User provided invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),
}

impl GuardError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            GuardError::LockDenied { .. } => exit_codes::LOCK_HELD,
            GuardError::StoreFault { .. } => exit_codes::STORE_FAILURE,
            GuardError::ReleaseFailed { .. } => exit_codes::STORE_FAILURE,
            GuardError::TaskFailed(_) => exit_codes::TASK_FAILURE,
            GuardError::UserError(_) => exit_codes::USER_ERROR,
        }
    }

    /// Whether this is the expected "another run is active" outcome.
    pub fn is_denied(&self) -> bool {
        matches!(self, GuardError::LockDenied { .. })
    }
}

fn holder_hint(holder: &Option<Box<LockRecord>>) -> String {
    match holder {
        Some(record) => format!(
            " (owner: {}, expires in {})",
            record.owner.as_deref().unwrap_or("unknown"),
            record.remaining_string()
        ),
        None => String::new(),
    }
}

/// Result type alias for runlock operations.
pub type Result<T> = std::result::Result<T, GuardError>;
