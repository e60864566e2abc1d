//! Exit code constants for the runlock CLI.
//!
//! A skipped run (lock held elsewhere, or the store could not be reached on
//! acquire) exits with `SUCCESS`: the scheduler re-invokes the task later, so a
//! collision is not an application failure.
//!
//! - 0: Success (work completed, or run skipped)
//! - 1: User error (bad args, invalid config)
//! - 2: Protected work failed
//! - 3: Lock store failure outside the run lifecycle (status/clear)
//! - 4: Lock is held by another run
//! - 143: Terminated by signal

/// Successful execution, or a cleanly skipped run.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// The protected work ran and reported a fault.
pub const TASK_FAILURE: i32 = 2;

/// The lock store could not complete an operator command.
pub const STORE_FAILURE: i32 = 3;

/// The lock is held by another run.
pub const LOCK_HELD: i32 = 4;

/// The process received a termination request and ran its cleanup.
pub const TERMINATED: i32 = 143;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            TASK_FAILURE,
            STORE_FAILURE,
            LOCK_HELD,
            TERMINATED,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn terminated_matches_sigterm_convention() {
        // 128 + SIGTERM(15)
        assert_eq!(TERMINATED, 128 + 15);
    }
}
