//! Config loading, validation, and conversion into runtime components.

use super::model::Config;
use super::types::Overrides;
use crate::error::{GuardError, Result};
use crate::store::FileLockStore;
use crate::work::{CommandWork, PlaceholderWork, WorkSpec};
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    /// The result is not validated; call [`Config::validate`] after applying
    /// overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            GuardError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GuardError::UserError(format!("failed to parse config YAML: {}", e)))
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| GuardError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Build the effective config: file (if any), then overrides, validated.
    pub fn resolve(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Replace config values with every override that is set.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(task_id) = &overrides.task_id {
            self.task_id = task_id.clone();
        }
        if let Some(lease) = overrides.lease_seconds {
            self.lease_seconds = lease;
        }
        if let Some(table) = &overrides.table {
            self.store.table = table.clone();
        }
        if let Some(region) = &overrides.region {
            self.store.region = Some(region.clone());
        }
        if let Some(dir) = &overrides.store_dir {
            self.store.dir = dir.clone();
        }
        if let Some(argv) = &overrides.command
            && !argv.is_empty()
        {
            self.work.command = Some(shell_words::join(argv));
        }
        if let Some(timeout) = overrides.timeout_seconds {
            self.work.timeout_seconds = Some(timeout);
        }
        if let Some(seconds) = overrides.placeholder_seconds {
            self.work.placeholder_seconds = seconds;
        }
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `task_id` must be set and usable as a store key
    /// - `lease_seconds` must be positive
    /// - `store.table` (and `store.region`, if set) must be usable as store keys
    /// - `work.timeout_seconds`, when set, must be positive
    /// - `work.command`, when set, must parse
    pub fn validate(&self) -> Result<()> {
        if self.task_id.is_empty() {
            return Err(GuardError::UserError(
                "config validation failed: task_id is required.\n\
                 Set `task_id` in the config file, pass --task-id, or set RUNLOCK_TASK_ID."
                    .to_string(),
            ));
        }

        if self.lease_seconds == 0 {
            return Err(GuardError::UserError(
                "config validation failed: lease_seconds must be greater than 0".to_string(),
            ));
        }

        if self.store.table.trim().is_empty() {
            return Err(GuardError::UserError(
                "config validation failed: store.table must not be empty".to_string(),
            ));
        }

        self.open_store()?.record_path(&self.task_id).map_err(|e| {
            GuardError::UserError(format!("config validation failed: task_id: {}", e))
        })?;

        if self.work.timeout_seconds == Some(0) {
            return Err(GuardError::UserError(
                "config validation failed: work.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if let Some(command) = &self.work.command {
            CommandWork::parse(command)?;
        }

        Ok(())
    }

    /// The lease as a duration.
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_seconds)
    }

    /// Open the lock store this config points at.
    pub fn open_store(&self) -> Result<FileLockStore> {
        FileLockStore::new(&self.store.dir, self.store.region.as_deref(), &self.store.table)
            .map_err(|e| GuardError::UserError(format!("invalid store configuration: {}", e)))
    }

    /// The work to run under the lock.
    ///
    /// Commands receive the task identity in `RUNLOCK_TASK_ID`.
    pub fn work_spec(&self) -> Result<WorkSpec> {
        match &self.work.command {
            Some(command) => {
                let work = CommandWork::parse(command)?
                    .with_timeout(self.work.timeout_seconds.map(Duration::from_secs))
                    .with_env("RUNLOCK_TASK_ID", self.task_id.clone());
                Ok(WorkSpec::Command(work))
            }
            None => Ok(WorkSpec::Placeholder(PlaceholderWork::new(
                Duration::from_secs(self.work.placeholder_seconds),
            ))),
        }
    }
}
