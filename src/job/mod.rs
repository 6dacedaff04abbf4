//! Process-tree supervision.
//!
//! A [`ProcessGroup`] launches one command suspended, binds it to a fresh
//! process group, resumes it, and then blocks until every process in that
//! group has exited. Waiting on the direct child alone is not enough: a
//! command that forks workers and exits would look finished while its
//! workers still run.
//!
//! On Linux the supervisor registers as a child subreaper, so descendants
//! orphaned inside the tree are re-parented to it and reaped by the group
//! wait. Elsewhere the wait falls back to polling the process group.
//!
//! When the supervisor owns the terminal, the child's group is made the
//! foreground group for as long as it runs.

mod group;
mod spawn;
mod terminal;

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::cmdline::EncodeError;

pub use group::{ChildHandle, ProcessGroup};

/// Exit code reported when the child's status could not be retrieved.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Errors produced while supervising a process group.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to create process group '{name}': {source}")]
    ResourceCreationFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch '{program}': {source}")]
    ProcessLaunchFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid command: {0}")]
    InvalidCommand(#[from] EncodeError),

    #[error("process group '{name}' already supervises a child")]
    GroupOccupied { name: String },

    #[error("waiting on process group failed: {0}")]
    WaitFailed(#[source] io::Error),
}

/// How a process group treats its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupPolicy {
    /// SIGKILL every remaining member when the group is dropped.
    pub kill_on_close: bool,
    /// Poll interval used when group members are not our children.
    pub poll_interval: Duration,
    /// Make the group the terminal's foreground group while it runs, when
    /// the supervisor holds the terminal.
    pub lend_terminal: bool,
}

impl Default for GroupPolicy {
    fn default() -> Self {
        Self {
            kill_on_close: true,
            poll_interval: Duration::from_millis(100),
            lend_terminal: true,
        }
    }
}
