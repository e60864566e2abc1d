//! CLI argument parsing for runlock.
//!
//! Uses clap derive macros for declarative argument definitions. Store and
//! identity flags are global and fall back to `RUNLOCK_*` environment
//! variables; the actual implementations are in the `commands` module.

use crate::config::Overrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// runlock: run a scheduled task only if no other run of it is active.
///
/// Before doing any work, a run takes an exclusive, time-bounded lock for its
/// task identity. Overlapping runs skip cleanly; the lock is released when the
/// work ends, however it ends, and expires on its own if release never runs.
#[derive(Parser, Debug)]
#[command(name = "runlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to a YAML config file.
    #[arg(long, short = 'c', env = "RUNLOCK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Identity of the protected task.
    #[arg(long, env = "RUNLOCK_TASK_ID", global = true)]
    pub task_id: Option<String>,

    /// Seconds until an unreleased lock expires.
    #[arg(long, env = "RUNLOCK_LEASE_SECONDS", global = true)]
    pub lease_seconds: Option<u64>,

    /// Lock table name.
    #[arg(long, env = "RUNLOCK_TABLE", global = true)]
    pub table: Option<String>,

    /// Region namespace for the lock table.
    #[arg(long, env = "RUNLOCK_REGION", global = true)]
    pub region: Option<String>,

    /// Root directory of the shared lock store.
    #[arg(long, env = "RUNLOCK_STORE_DIR", global = true)]
    pub store_dir: Option<PathBuf>,
}

impl GlobalArgs {
    /// Overrides for the config file values.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            task_id: self.task_id.clone(),
            lease_seconds: self.lease_seconds,
            table: self.table.clone(),
            region: self.region.clone(),
            store_dir: self.store_dir.clone(),
            ..Default::default()
        }
    }
}

/// Available commands for runlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Acquire the lock, run the work, and release the lock.
    ///
    /// If another run holds the lock, exits successfully without running
    /// anything. With no command, runs the configured command or the
    /// placeholder wait.
    Run(RunArgs),

    /// Show the current lock record for the task.
    ///
    /// With --check, exits with the lock-held status while a live lock exists.
    Status(StatusArgs),

    /// Delete the lock record regardless of who holds it.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(ClearArgs),
}

/// Arguments for the `run` command.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Kill the command after this many seconds.
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Duration of the placeholder wait when no command is configured.
    #[arg(long)]
    pub placeholder_seconds: Option<u64>,

    /// Command to run under the lock (after `--`).
    #[arg(last = true)]
    pub command: Vec<String>,
}

/// Arguments for the `status` command.
#[derive(Args, Debug, Clone, Default)]
pub struct StatusArgs {
    /// Exit non-zero if a live lock is held.
    #[arg(long)]
    pub check: bool,
}

/// Arguments for the `clear` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ClearArgs {
    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}
