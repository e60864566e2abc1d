//! Locking subsystem for runlock.
//!
//! A run may only do its work while it holds the lock for its task identity.
//! The lock is a single record in the [`LockStore`](crate::store::LockStore):
//!
//! - **Acquire** is a conditional insert of `{task_id, status: running, ttl}`
//!   that fails if a live record exists. Two simultaneous attempts can never
//!   both succeed. A failed condition is [`GuardError::LockDenied`], an
//!   expected outcome rather than a fault.
//! - **Release** is an unconditional delete. Deleting an absent record is a
//!   success: afterwards the lock is not present, which is all that is needed.
//! - **Expiry** is passive. If release never runs (crash, forced kill), the
//!   store treats the record as absent once its `ttl` passes.
//!
//! There is no renewal, reentrancy, or fencing. Work that outlives its lease
//! may overlap with a later run; leases must be provisioned generously.
//!
//! # RAII Guards
//!
//! Locks are held through [`LockGuard`], which deletes the record when dropped.
//! If deletion fails during drop, a warning is logged but the program does
//! not crash.
//!
//! [`GuardError::LockDenied`]: crate::error::GuardError::LockDenied

mod coordinator;
mod guard;
mod types;


pub use coordinator::LockCoordinator;
pub use guard::LockGuard;
pub use types::ReleaseOutcome;
