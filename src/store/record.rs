//! Lock record persisted in the lock store.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Persisted status of a lock record. Only one state exists: the record's
/// presence is the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    #[default]
    Running,
}

/// A lock record keyed by `task_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Identity of the protected task. The store's partition key.
    pub task_id: String,

    pub status: LockStatus,

    /// Absolute expiration time, seconds since the Unix epoch.
    pub ttl: i64,

    /// Owner of the lock (e.g., `user@HOST`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Process ID of the lock holder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// When the lock was acquired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquired_at: Option<DateTime<Utc>>,
}

impl LockRecord {
    /// Create a record for `task_id` expiring `lease` from now.
    pub fn new(task_id: &str, lease: Duration) -> Self {
        let now = Utc::now();
        let lease_secs = i64::try_from(lease.as_secs()).unwrap_or(i64::MAX);
        Self {
            task_id: task_id.to_string(),
            status: LockStatus::Running,
            ttl: now.timestamp().saturating_add(lease_secs),
            owner: Some(owner_string()),
            pid: Some(std::process::id()),
            acquired_at: Some(now),
        }
    }

    /// Whether the record's expiration time has passed at `now` (epoch seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.ttl <= now
    }

    /// Whether the record has expired as of the current wall clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// The expiration time as a timestamp, if representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.ttl, 0).single()
    }

    /// Format the time left before expiry as a human-readable string.
    pub fn remaining_string(&self) -> String {
        let remaining = self.ttl - Utc::now().timestamp();
        if remaining <= 0 {
            return "0m".to_string();
        }
        let minutes = remaining / 60;
        let hours = minutes / 60;
        let days = hours / 24;

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m", minutes)
        } else {
            format!("{}s", remaining)
        }
    }
}

/// Get the owner string for lock records.
pub(crate) fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
