//! Termination-signal handling for a running session.
//!
//! SIGINT/SIGTERM/SIGHUP must not kill the supervisor outright: it still has
//! to restore the power policy. A watcher thread turns them into the normal
//! end-of-session path instead.

use std::io;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::session::{send_wake, WakeReason};

/// What a termination signal turns into.
#[derive(Debug, Clone)]
pub enum InterruptAction {
    /// Forward the signal to the supervised process group; the supervisor
    /// then sees the group empty out as usual. `pgid` is 0 until the child
    /// is launched; a signal that arrives earlier is left to the caller via
    /// [`InterruptWatcher::last_signal`].
    ForwardToGroup { pgid: Arc<AtomicU32> },
    /// Wake our own session signal.
    WakeSession { name: String },
}

pub struct InterruptWatcher {
    handle: signal_hook::iterator::Handle,
    thread: thread::JoinHandle<()>,
    last_signal: Arc<AtomicI32>,
}

impl InterruptWatcher {
    pub fn start(action: InterruptAction) -> io::Result<Self> {
        let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
        let handle = signals.handle();
        let last_signal = Arc::new(AtomicI32::new(0));
        let seen = Arc::clone(&last_signal);

        let thread = thread::Builder::new()
            .name("wakeguard-signals".to_string())
            .spawn(move || {
                for raw in signals.forever() {
                    seen.store(raw, Ordering::SeqCst);
                    tracing::info!(signal = raw, ?action, "termination signal received");
                    dispatch(&action, raw);
                }
            })?;

        Ok(Self {
            handle,
            thread,
            last_signal,
        })
    }

    /// Whether a termination signal arrived while the watcher ran.
    pub fn interrupted(&self) -> bool {
        self.last_signal().is_some()
    }

    /// The most recent termination signal, if any.
    pub fn last_signal(&self) -> Option<Signal> {
        match self.last_signal.load(Ordering::SeqCst) {
            0 => None,
            raw => Signal::try_from(raw).ok(),
        }
    }

    pub fn stop(self) {
        self.handle.close();
        let _ = self.thread.join();
    }
}

fn dispatch(action: &InterruptAction, raw: i32) {
    match action {
        InterruptAction::ForwardToGroup { pgid } => {
            let pgid = pgid.load(Ordering::SeqCst);
            if pgid == 0 {
                tracing::debug!("no process group yet, signal held for launch");
                return;
            }
            let signal = Signal::try_from(raw).unwrap_or(Signal::SIGTERM);
            if let Err(errno) = killpg(Pid::from_raw(pgid as i32), signal) {
                tracing::debug!(%errno, pgid, "could not forward signal to group");
            }
        }
        InterruptAction::WakeSession { name } => {
            if let Err(err) = send_wake(name, WakeReason::Interrupt) {
                tracing::warn!(%err, "could not wake session");
            }
        }
    }
}
