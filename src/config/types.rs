//! Configuration sections and defaults for runlock.

use crate::execution::DEFAULT_LEASE_SECONDS;
use crate::work::DEFAULT_PLACEHOLDER_SECONDS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the lock records live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Table name; one directory of records per table.
    pub table: String,

    /// Optional region, used to namespace the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Root directory shared by every run that competes for the lock.
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            region: None,
            dir: default_store_dir(),
        }
    }
}

/// The protected work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkConfig {
    /// Command to run. When unset, the placeholder wait runs instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Kill the command after this many seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Duration of the placeholder wait.
    pub placeholder_seconds: u64,
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout_seconds: None,
            placeholder_seconds: DEFAULT_PLACEHOLDER_SECONDS,
        }
    }
}

/// Values supplied on the command line or through the environment.
///
/// Each set field replaces the corresponding config file value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub task_id: Option<String>,
    pub lease_seconds: Option<u64>,
    pub table: Option<String>,
    pub region: Option<String>,
    pub store_dir: Option<PathBuf>,
    pub command: Option<Vec<String>>,
    pub timeout_seconds: Option<u64>,
    pub placeholder_seconds: Option<u64>,
}

pub(crate) fn default_lease_seconds() -> u64 {
    DEFAULT_LEASE_SECONDS
}

pub(crate) fn default_table() -> String {
    "task-state".to_string()
}

pub(crate) fn default_store_dir() -> PathBuf {
    std::env::temp_dir().join("runlock")
}
