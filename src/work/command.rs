//! External command executor.
//!
//! Runs the command with inherited stdio, polls for exit, and kills it on
//! timeout. While the child runs, a kill action is registered for
//! termination so the child is stopped before the lock is released.

use super::Work;
use crate::error::{GuardError, Result};
use crate::termination::{self, Cleanup};
use anyhow::{Context, bail};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs an external command as the protected work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandWork {
    argv: Vec<String>,
    timeout: Option<Duration>,
    env: BTreeMap<String, String>,
    working_dir: Option<PathBuf>,
}

impl CommandWork {
    /// Parse a shell-style command line.
    pub fn parse(command: &str) -> Result<Self> {
        let argv = shell_words::split(command).map_err(|e| {
            GuardError::UserError(format!(
                "failed to parse command '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                command, e
            ))
        })?;
        Self::from_argv(argv)
    }

    /// Build from an already-split argument vector.
    pub fn from_argv(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() || argv[0].is_empty() {
            return Err(GuardError::UserError("command must not be empty".to_string()));
        }
        Ok(Self {
            argv,
            timeout: None,
            env: BTreeMap::new(),
            working_dir: None,
        })
    }

    /// Kill the command if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set an environment variable for the command.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The command line, quoted for display.
    pub fn command_line(&self) -> String {
        shell_words::join(&self.argv)
    }

    fn spawn(&self) -> anyhow::Result<Child> {
        let mut command = Command::new(&self.argv[0]);
        command.args(&self.argv[1..]).envs(&self.env);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command.spawn().with_context(|| {
            format!(
                "failed to execute '{}' (is it installed and in PATH?)",
                self.argv[0]
            )
        })
    }
}

/// Kills the running child on termination.
struct ChildKiller {
    child: Arc<Mutex<Child>>,
    command_line: String,
}

impl Cleanup for ChildKiller {
    fn run_cleanup(&self) {
        let mut child = self
            .child
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        // On Unix this is SIGKILL; on Windows it is TerminateProcess.
        let _ = child.kill();
        let _ = child.wait();
    }

    fn describe(&self) -> String {
        format!("kill '{}'", self.command_line)
    }
}

enum Exit {
    Finished(ExitStatus),
    TimedOut,
}

fn wait_with_timeout(child: &Mutex<Child>, timeout: Option<Duration>) -> anyhow::Result<Exit> {
    let start = Instant::now();
    loop {
        {
            let mut child = child.lock().unwrap_or_else(|poison| poison.into_inner());
            if let Some(status) = child
                .try_wait()
                .context("failed to check command status")?
            {
                return Ok(Exit::Finished(status));
            }
            if let Some(timeout) = timeout
                && start.elapsed() >= timeout
            {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(Exit::TimedOut);
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

impl Work for CommandWork {
    fn describe(&self) -> String {
        format!("command '{}'", self.command_line())
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let command_line = self.command_line();
        info!(command = %command_line, "starting command");

        let start = Instant::now();
        let child = Arc::new(Mutex::new(self.spawn()?));
        let _registration = termination::register(Arc::new(ChildKiller {
            child: Arc::clone(&child),
            command_line: command_line.clone(),
        }));

        let exit = wait_with_timeout(&child, self.timeout)?;
        let elapsed = start.elapsed().as_secs();

        match exit {
            Exit::Finished(status) if status.success() => {
                info!(command = %command_line, elapsed_secs = elapsed, "command finished");
                Ok(())
            }
            Exit::Finished(status) => match status.code() {
                Some(code) => bail!("command '{}' exited with status {}", command_line, code),
                None => bail!("command '{}' was terminated by a signal", command_line),
            },
            Exit::TimedOut => {
                let limit = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
                warn!(command = %command_line, timeout_secs = limit, "command timed out, killed");
                bail!("command '{}' timed out after {}s", command_line, limit)
            }
        }
    }
}
