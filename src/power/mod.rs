//! Sleep inhibition.
//!
//! A [`PowerPolicy`] takes an [`InhibitRequest`] and holds it until
//! [`PowerPolicy::restore`]. Requests are idempotent: applying the request
//! already in force does nothing, a different one replaces it.

mod battery;
mod systemd;

use std::io;

use thiserror::Error;

use crate::config::{InhibitConfig, PowerBackend};

pub use battery::on_ac_power;
pub use systemd::SystemdInhibitor;

#[derive(Debug, Error)]
pub enum PowerError {
    #[error("power inhibitor unavailable ({program}): {source}")]
    Unavailable {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("power inhibitor I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// What to keep awake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InhibitRequest {
    /// Keep the system from idle sleep.
    pub idle: bool,
    /// Keep the display from blanking.
    pub display: bool,
    /// Only inhibit while running on AC power.
    pub ac_only: bool,
}

impl InhibitRequest {
    pub fn is_empty(&self) -> bool {
        !self.idle && !self.display
    }
}

impl From<&InhibitConfig> for InhibitRequest {
    fn from(config: &InhibitConfig) -> Self {
        Self {
            idle: config.idle,
            display: config.display,
            ac_only: config.ac_only,
        }
    }
}

pub trait PowerPolicy {
    /// Put `request` in force.
    fn apply(&mut self, request: InhibitRequest) -> Result<(), PowerError>;

    /// Drop whatever request is in force.
    fn restore(&mut self) -> Result<(), PowerError>;
}

/// Policy that only records requests.
#[derive(Debug, Default)]
pub struct NoopPolicy {
    active: Option<InhibitRequest>,
}

impl NoopPolicy {
    pub fn active(&self) -> Option<InhibitRequest> {
        self.active
    }
}

impl PowerPolicy for NoopPolicy {
    fn apply(&mut self, request: InhibitRequest) -> Result<(), PowerError> {
        tracing::debug!(?request, "inhibition requested (no-op backend)");
        self.active = Some(request);
        Ok(())
    }

    fn restore(&mut self) -> Result<(), PowerError> {
        self.active = None;
        Ok(())
    }
}

/// Build the policy selected by configuration.
pub fn from_backend(backend: PowerBackend) -> Box<dyn PowerPolicy> {
    match backend {
        PowerBackend::SystemdInhibit => Box::new(SystemdInhibitor::new()),
        PowerBackend::None => Box::new(NoopPolicy::default()),
    }
}
