//! Cross-process session signal.
//!
//! A `start` session owns a named signal and blocks on it; a later `end`
//! invocation, or the session's own deadline, sets it. The name lives in the
//! system-wide local-socket namespace (an abstract socket on Linux), so an
//! unrelated process can find it without sharing any state on disk.

mod channel;
mod message;

use std::io;

use thiserror::Error;

pub use channel::{signal, SessionSignal, SignalState};
pub(crate) use channel::send_wake;
pub use message::WakeReason;

/// Signal owned by an unbounded `start` session.
pub const SESSION_SIGNAL_NAME: &str = "wakeguard-session.sock";

/// Signal owned by a `start --timeout` session.
pub const TIMED_SESSION_SIGNAL_NAME: &str = "wakeguard-timed-session.sock";

/// Every well-known signal name, in the order `end` tries them.
pub const WELL_KNOWN_NAMES: [&str; 2] = [SESSION_SIGNAL_NAME, TIMED_SESSION_SIGNAL_NAME];

/// Errors produced by the session signal.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("failed to create session signal '{name}': {source}")]
    ResourceCreationFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("no running session owns '{name}'")]
    SignalNotFound { name: String },

    #[error("failed to signal session '{name}': {source}")]
    SendFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("waiting on session signal failed: {0}")]
    WaitFailed(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_names_are_distinct() {
        assert_ne!(SESSION_SIGNAL_NAME, TIMED_SESSION_SIGNAL_NAME);
    }
}
