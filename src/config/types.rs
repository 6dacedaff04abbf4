use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::job::GroupPolicy;

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub inhibit: InhibitConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub power: PowerConfig,
}

/// Default inhibition scope when no scope flag is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InhibitConfig {
    /// Keep the system from idle sleep (default: true).
    #[serde(default = "default_true")]
    pub idle: bool,
    /// Keep the display on (default: false).
    #[serde(default)]
    pub display: bool,
    /// Only inhibit while on AC power (default: false).
    #[serde(default)]
    pub ac_only: bool,
}

/// Process supervision settings for `run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Kill leftover group members when the supervisor exits (default: true).
    #[serde(default = "default_true")]
    pub kill_on_close: bool,
    /// Poll interval for group members we cannot reap, in milliseconds
    /// (default: 100).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Power policy backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerConfig {
    #[serde(default)]
    pub backend: PowerBackend,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerBackend {
    /// systemd-logind inhibitor lock via `systemd-inhibit`.
    #[default]
    SystemdInhibit,
    /// Track requests without touching the system.
    None,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for InhibitConfig {
    fn default() -> Self {
        Self {
            idle: true,
            display: false,
            ac_only: false,
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            kill_on_close: true,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl From<&SupervisorConfig> for GroupPolicy {
    fn from(config: &SupervisorConfig) -> Self {
        Self {
            kill_on_close: config.kill_on_close,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            lend_terminal: true,
        }
    }
}
