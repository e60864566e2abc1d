//! Lock store abstraction.
//!
//! The lock protocol needs exactly two state-changing primitives from a
//! strongly-consistent key-value store:
//! - a conditional insert that fails if the key already exists
//! - an unconditional delete by key
//!
//! plus passive expiry: a record whose `ttl` has passed is treated as absent
//! by the conditional insert. Expiry is the store's responsibility; callers
//! never re-validate `ttl` themselves.
//!
//! # Backends
//!
//! - [`FileLockStore`]: one JSON document per key in a shared directory,
//!   published with an exclusive hard link.
//! - [`MemoryLockStore`]: in-process map, for embedding and tests.

mod file;
mod memory;
mod record;

#[cfg(test)]
mod tests;

use std::fmt;
use thiserror::Error;

pub use file::FileLockStore;
pub use memory::MemoryLockStore;
pub use record::{LockRecord, LockStatus};

/// Result of a conditional insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written; the caller holds the lock.
    Inserted,
    /// A live record already exists for the key.
    ConditionFailed { existing: Option<LockRecord> },
}

/// Result of an unconditional delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Infrastructure failure talking to the lock store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Malformed {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid lock key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("lock store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }
}

/// A strongly-consistent key-value store holding lock records.
pub trait LockStore: Send + Sync + fmt::Debug {
    /// Insert `record` only if no live record exists for `record.task_id`.
    fn put_if_absent(&self, record: &LockRecord) -> Result<InsertOutcome, StoreError>;

    /// Delete the record for `task_id`, whether or not it exists.
    fn delete(&self, task_id: &str) -> Result<DeleteOutcome, StoreError>;

    /// Read the raw record for `task_id`, including one that has expired but
    /// not yet been swept.
    fn get(&self, task_id: &str) -> Result<Option<LockRecord>, StoreError>;

    /// Human-readable location of the store, for log lines.
    fn location(&self) -> String;
}
