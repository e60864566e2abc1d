//! Directory-backed lock store.
//!
//! # Layout
//!
//! Records live at `<root>/[<region>/]<table>/<task_id>.lock`, one JSON
//! document per key. The directory can sit on any filesystem shared by the
//! competing runs.
//!
//! # Conditional insert
//!
//! A record is written to a unique temporary file, synced, and then published
//! with `hard_link`. Linking fails with `AlreadyExists` if the key is taken,
//! which makes the insert atomic and means a record is never observable in a
//! partially-written state.
//!
//! # Expiry
//!
//! Every insert holds an exclusive advisory lock on the key's `.mutex` file
//! while it inspects the current record. An expired or unreadable record is
//! removed and replaced under that lock, so no other insert can publish in
//! between. Deletes do not take the lock: a concurrent delete can only turn
//! the record being replaced into an absent one. The advisory lock belongs to
//! the open file, so a process that dies mid-insert releases it.

use super::{DeleteOutcome, InsertOutcome, LockRecord, LockStore, StoreError};
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

const LOCK_EXTENSION: &str = "lock";
const MUTEX_EXTENSION: &str = "mutex";

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Lock store keeping one file per record in a shared directory.
#[derive(Debug, Clone)]
pub struct FileLockStore {
    dir: PathBuf,
}

impl FileLockStore {
    /// Open the store for `table` under `root`, optionally namespaced by `region`.
    pub fn new(root: impl Into<PathBuf>, region: Option<&str>, table: &str) -> Result<Self, StoreError> {
        validate_key(table)?;
        let mut dir = root.into();
        if let Some(region) = region {
            validate_key(region)?;
            dir.push(region);
        }
        dir.push(table);
        Ok(Self { dir })
    }

    /// Open the store directly at `dir`.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `task_id`.
    pub fn record_path(&self, task_id: &str) -> Result<PathBuf, StoreError> {
        validate_key(task_id)?;
        Ok(self.dir.join(format!("{}.{}", task_id, LOCK_EXTENSION)))
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                StoreError::io(
                    format!("failed to create lock directory '{}'", self.dir.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Block until this process holds the insert lock for `task_id`.
    ///
    /// The lock is released when the returned file is dropped.
    fn lock_key(&self, task_id: &str) -> Result<File, StoreError> {
        let path = self.dir.join(format!("{}.{}", task_id, MUTEX_EXTENSION));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| {
                StoreError::io(format!("failed to open key mutex '{}'", path.display()), e)
            })?;
        file.lock().map_err(|e| {
            StoreError::io(format!("failed to lock key mutex '{}'", path.display()), e)
        })?;
        Ok(file)
    }

    fn scratch_path(&self, path: &Path, suffix: &str) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{}.{}.{}.{}", name, std::process::id(), n, suffix))
    }

    /// Publish `record` at `path` unless the path exists.
    ///
    /// Returns `Ok(false)` if another record is already in place.
    fn publish(&self, path: &Path, record: &LockRecord) -> Result<bool, StoreError> {
        let json = serde_json::to_string_pretty(record).map_err(|e| StoreError::Malformed {
            context: "failed to serialize lock record".to_string(),
            source: e,
        })?;

        let temp_path = self.scratch_path(path, "tmp");
        write_and_sync(&temp_path, json.as_bytes())?;

        let linked = fs::hard_link(&temp_path, path);
        let _ = fs::remove_file(&temp_path);

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(StoreError::io(
                format!("failed to publish lock record '{}'", path.display()),
                e,
            )),
        }
    }
}

/// Remove a record that no longer holds its key. Caller holds the key mutex.
fn discard(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(
            format!("failed to remove stale lock record '{}'", path.display()),
            e,
        )),
    }
}

impl LockStore for FileLockStore {
    fn put_if_absent(&self, record: &LockRecord) -> Result<InsertOutcome, StoreError> {
        let path = self.record_path(&record.task_id)?;
        self.ensure_dir()?;
        let _mutex = self.lock_key(&record.task_id)?;

        let now = Utc::now().timestamp();
        match read_record(&path) {
            Ok(None) => {}
            Ok(Some(existing)) if existing.is_expired_at(now) => {
                discard(&path)?;
                debug!(path = %path.display(), ttl = existing.ttl, "reclaimed expired lock record");
            }
            Ok(Some(existing)) => {
                return Ok(InsertOutcome::ConditionFailed {
                    existing: Some(existing),
                });
            }
            // Records are only ever published whole, so an unreadable one
            // was damaged outside this store and can never expire by itself.
            Err(StoreError::Malformed { context, source }) => {
                warn!(%context, error = %source, "discarding unreadable lock record");
                discard(&path)?;
            }
            Err(e) => return Err(e),
        }

        if self.publish(&path, record)? {
            return Ok(InsertOutcome::Inserted);
        }

        // Only a writer bypassing the key mutex gets here.
        Ok(InsertOutcome::ConditionFailed {
            existing: read_record(&path).ok().flatten(),
        })
    }

    fn delete(&self, task_id: &str) -> Result<DeleteOutcome, StoreError> {
        let path = self.record_path(task_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(StoreError::io(
                format!("failed to delete lock record '{}'", path.display()),
                e,
            )),
        }
    }

    fn get(&self, task_id: &str) -> Result<Option<LockRecord>, StoreError> {
        let path = self.record_path(task_id)?;
        read_record(&path)
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Keys become file names, so keep them to a portable character set.
fn validate_key(key: &str) -> Result<(), StoreError> {
    let invalid = |reason: &str| StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = key.chars();
    match chars.next() {
        None => return Err(invalid("must not be empty")),
        Some(c) if !c.is_ascii_alphanumeric() => {
            return Err(invalid("must start with a letter or digit"));
        }
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
        return Err(invalid("may only contain letters, digits, '.', '_' and '-'"));
    }
    Ok(())
}

fn read_record(path: &Path) -> Result<Option<LockRecord>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::io(
                format!("failed to read lock record '{}'", path.display()),
                e,
            ));
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::Malformed {
            context: format!("failed to parse lock record '{}'", path.display()),
            source: e,
        })
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let mut file = File::create(path).map_err(|e| {
        StoreError::io(
            format!("failed to create temporary file '{}'", path.display()),
            e,
        )
    })?;

    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            StoreError::io(
                format!("failed to write temporary file '{}'", path.display()),
                e,
            )
        })
}
