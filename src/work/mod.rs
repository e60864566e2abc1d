//! Protected work run while the lock is held.
//!
//! The guard only cares whether the work ran to completion or reported a
//! fault, so work is anything implementing [`Work`]. Two kinds ship with the
//! binary:
//! - [`PlaceholderWork`]: waits for a fixed duration in place of real work
//! - [`CommandWork`]: runs an external command with an optional timeout

mod command;
mod placeholder;


pub use command::CommandWork;
pub use placeholder::{DEFAULT_PLACEHOLDER_SECONDS, PlaceholderWork};

/// The task's business logic.
pub trait Work {
    /// Short description for log lines.
    fn describe(&self) -> String;

    /// Run to completion, or return the fault that stopped it.
    fn run(&mut self) -> anyhow::Result<()>;
}

/// Work selected by configuration.
#[derive(Debug, Clone)]
pub enum WorkSpec {
    Placeholder(PlaceholderWork),
    Command(CommandWork),
}

impl Work for WorkSpec {
    fn describe(&self) -> String {
        match self {
            WorkSpec::Placeholder(work) => work.describe(),
            WorkSpec::Command(work) => work.describe(),
        }
    }

    fn run(&mut self) -> anyhow::Result<()> {
        match self {
            WorkSpec::Placeholder(work) => work.run(),
            WorkSpec::Command(work) => work.run(),
        }
    }
}
