//! systemd-logind inhibitor lock.
//!
//! `systemd-inhibit` holds the lock for as long as the command it runs is
//! alive. The command is `cat` reading a pipe we own: closing our end makes
//! `cat` exit and logind drop the lock, even if we die without cleanup.

use std::process::{Child, Command, Stdio};

use super::{on_ac_power, InhibitRequest, PowerError, PowerPolicy};

const DEFAULT_PROGRAM: &str = "systemd-inhibit";

struct Held {
    request: InhibitRequest,
    /// `None` when the request needed no lock (empty, or AC-only on battery).
    lock: Option<Child>,
}

pub struct SystemdInhibitor {
    program: String,
    held: Option<Held>,
}

impl SystemdInhibitor {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            held: None,
        }
    }

    pub fn is_holding_lock(&self) -> bool {
        self.held.as_ref().is_some_and(|held| held.lock.is_some())
    }

    fn take_lock(&self, request: InhibitRequest) -> Result<Child, PowerError> {
        let what = what_arg(request);
        tracing::debug!(program = %self.program, what, "taking inhibitor lock");
        Command::new(&self.program)
            .arg(format!("--what={what}"))
            .arg("--who=wakeguard")
            .arg("--why=wakeguard session in progress")
            .arg("--mode=block")
            .arg("cat")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| PowerError::Unavailable {
                program: self.program.clone(),
                source,
            })
    }
}

impl Default for SystemdInhibitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerPolicy for SystemdInhibitor {
    fn apply(&mut self, request: InhibitRequest) -> Result<(), PowerError> {
        if self.held.as_ref().is_some_and(|held| held.request == request) {
            return Ok(());
        }
        self.restore()?;

        let lock = if request.is_empty() {
            None
        } else if request.ac_only && !on_ac_power() {
            tracing::info!("running on battery, AC-only inhibition not taken");
            None
        } else {
            Some(self.take_lock(request)?)
        };

        tracing::info!(?request, locked = lock.is_some(), "inhibition applied");
        self.held = Some(Held { request, lock });
        Ok(())
    }

    fn restore(&mut self) -> Result<(), PowerError> {
        let Some(held) = self.held.take() else {
            return Ok(());
        };
        if let Some(mut lock) = held.lock {
            drop(lock.stdin.take());
            let status = lock.wait()?;
            tracing::info!(%status, "inhibitor lock released");
        }
        Ok(())
    }
}

impl Drop for SystemdInhibitor {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            tracing::warn!(%err, "failed to release inhibitor lock");
        }
    }
}

/// logind lock types: `sleep` blocks system suspend, `idle` blocks the
/// idle action (screen blanking/lock).
fn what_arg(request: InhibitRequest) -> &'static str {
    match (request.idle, request.display) {
        (true, true) => "sleep:idle",
        (true, false) => "sleep",
        (false, true) => "idle",
        (false, false) => "",
    }
}
