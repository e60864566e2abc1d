//! Command implementations for runlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.


use crate::cli::{ClearArgs, Cli, Command, GlobalArgs, RunArgs, StatusArgs};
use crate::config::Config;
use crate::error::{GuardError, Result};
use crate::execution::{ExecutionGuard, RunOutcome};
use crate::locks::LockCoordinator;
use crate::store::LockStore;
use crate::work::Work;
use std::sync::Arc;
use tracing::info;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(&cli.global, args),
        Command::Status(args) => cmd_status(&cli.global, args),
        Command::Clear(args) => cmd_clear(&cli.global, args),
    }
}

/// Resolve the effective config for a command.
fn load_config(global: &GlobalArgs, run: Option<RunArgs>) -> Result<Config> {
    let mut overrides = global.overrides();
    if let Some(run) = run {
        overrides.command = Some(run.command);
        overrides.timeout_seconds = run.timeout_seconds;
        overrides.placeholder_seconds = run.placeholder_seconds;
    }
    Config::resolve(global.config.as_deref(), &overrides)
}

fn coordinator_for(config: &Config) -> Result<LockCoordinator> {
    let store: Arc<dyn LockStore> = Arc::new(config.open_store()?);
    Ok(LockCoordinator::new(store))
}

fn cmd_run(global: &GlobalArgs, args: RunArgs) -> Result<()> {
    let config = load_config(global, Some(args))?;
    let coordinator = coordinator_for(&config)?;
    let mut work = config.work_spec()?;

    info!(
        task_id = %config.task_id,
        store = %coordinator.store().location(),
        lease_secs = config.lease_seconds,
        work = %work.describe(),
        "starting guarded run"
    );

    let guard = ExecutionGuard::new(coordinator, config.task_id.clone(), config.lease());
    match guard.run(|| work.run()) {
        RunOutcome::Failed { error, .. } => Err(GuardError::TaskFailed(format!("{:#}", error))),
        RunOutcome::Skipped(_) | RunOutcome::Completed { .. } => Ok(()),
    }
}

fn cmd_status(global: &GlobalArgs, args: StatusArgs) -> Result<()> {
    let config = load_config(global, None)?;
    let coordinator = coordinator_for(&config)?;

    let Some(record) = coordinator.inspect(&config.task_id)? else {
        println!("No active lock for '{}'.", config.task_id);
        return Ok(());
    };

    println!("Lock '{}':", record.task_id);
    println!("    Status:     {:?}", record.status);
    if let Some(owner) = &record.owner {
        println!("    Owner:      {}", owner);
    }
    if let Some(pid) = record.pid {
        println!("    PID:        {}", pid);
    }
    if let Some(acquired_at) = record.acquired_at {
        println!("    Acquired:   {}", acquired_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    match record.expires_at() {
        Some(expires_at) => println!("    Expires:    {}", expires_at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("    Expires:    ttl={}", record.ttl),
    }
    if record.is_expired() {
        println!("    Remaining:  EXPIRED (awaiting sweep; the next run will proceed)");
    } else {
        println!("    Remaining:  {}", record.remaining_string());
    }
    println!("    Store:      {}", coordinator.store().location());

    if args.check && !record.is_expired() {
        return Err(GuardError::LockDenied {
            task_id: config.task_id,
            holder: Some(Box::new(record)),
        });
    }

    Ok(())
}

fn cmd_clear(global: &GlobalArgs, args: ClearArgs) -> Result<()> {
    let config = load_config(global, None)?;

    if !args.force {
        return Err(GuardError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock lets another run start while the holder may still be working.\n\
             Only clear locks if you are certain the lock holder has crashed.\n\n\
             To clear the lock, run:\n  runlock clear --task-id {} --force",
            config.task_id
        )));
    }

    let coordinator = coordinator_for(&config)?;
    match coordinator.force_clear(&config.task_id)? {
        Some(record) => {
            info!(task_id = %config.task_id, holder = ?record.owner, "lock cleared by operator");
            println!(
                "Cleared lock '{}' (owner: {}).",
                config.task_id,
                record.owner.as_deref().unwrap_or("unknown")
            );
        }
        None => println!("No lock to clear for '{}'.", config.task_id),
    }

    Ok(())
}
