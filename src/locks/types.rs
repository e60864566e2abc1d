//! Lock outcome types.

/// Successful result of releasing a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The record was deleted.
    Released,
    /// No record existed (already expired and swept, or cleared by an
    /// operator). The lock is absent, which is all release promises.
    AlreadyAbsent,
    /// This guard's release already ran on another path (termination cleanup).
    AlreadyReleased,
}

impl std::fmt::Display for ReleaseOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseOutcome::Released => write!(f, "released"),
            ReleaseOutcome::AlreadyAbsent => write!(f, "already absent"),
            ReleaseOutcome::AlreadyReleased => write!(f, "already released"),
        }
    }
}
