//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a guarded run.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Identity of the protected task. Runs sharing an identity exclude each
    /// other; it must be stable across runs of the same logical task.
    pub task_id: String,

    /// Seconds until an unreleased lock expires.
    #[serde(default = "default_lease_seconds")]
    pub lease_seconds: u64,

    // =========================================================================
    // Store settings
    // =========================================================================
    pub store: StoreConfig,

    // =========================================================================
    // Work settings
    // =========================================================================
    pub work: WorkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            task_id: String::new(),
            lease_seconds: default_lease_seconds(),
            store: StoreConfig::default(),
            work: WorkConfig::default(),
        }
    }
}
