//! Configuration loading.
//!
//! An optional TOML file supplies defaults for the inhibition scope, the
//! supervisor policy and the power backend. Command-line flags override it.

mod loader;
mod types;

pub use loader::{ConfigError, CONFIG_ENV_VAR};
pub use types::{Config, InhibitConfig, PowerBackend, PowerConfig, SupervisorConfig};
