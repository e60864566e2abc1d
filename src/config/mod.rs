//! Configuration model for runlock.
//!
//! A run is configured from an optional YAML file, then command-line flags and
//! environment variables (which take precedence). Parsing is
//! forward-compatible (unknown fields are ignored) and every field has a
//! sensible default except the task identity, which must be supplied.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use types::{Overrides, StoreConfig, WorkConfig};
