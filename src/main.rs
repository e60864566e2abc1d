//! runlock: single-run execution guard for scheduled batch tasks.
//!
//! This is the main entry point for the `runlock` CLI. It sets up logging and
//! termination handling, dispatches to the command handler, and maps errors
//! to exit codes.

use runlock::cli::Cli;
use runlock::{commands, exit_codes, logging, termination};
use std::process::ExitCode;

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse_args();

    if let Err(err) = termination::install_handler() {
        eprintln!("Error: {}", err);
        return ExitCode::from(err.exit_code() as u8);
    }

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
