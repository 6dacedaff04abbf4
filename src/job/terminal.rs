//! Foreground handoff of the controlling terminal.
//!
//! The supervised child runs in its own process group. If that group is not
//! the terminal's foreground group, reading the terminal stops it with
//! SIGTTIN and the group never empties.

use std::io::{self, IsTerminal};
use std::os::fd::{AsRawFd, RawFd};

use nix::sys::signal::{signal, SigHandler, Signal};
use nix::unistd::{getpgrp, Pid};

/// The terminal lent to a child process group; taken back on drop.
pub(super) struct Foreground {
    fd: RawFd,
    owner: Pid,
}

impl Foreground {
    /// Give the terminal on stdin to `pgid`, if we currently hold it.
    pub(super) fn lend_to(pgid: Pid) -> io::Result<Option<Self>> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Ok(None);
        }
        let fd = stdin.as_raw_fd();
        let owner = getpgrp();
        // SAFETY: tcgetpgrp only reads terminal state.
        if unsafe { libc::tcgetpgrp(fd) } != owner.as_raw() {
            return Ok(None);
        }

        set_foreground(fd, pgid)?;
        tracing::debug!(pgid = pgid.as_raw(), "terminal lent to process group");
        Ok(Some(Self { fd, owner }))
    }
}

impl Drop for Foreground {
    fn drop(&mut self) {
        if let Err(err) = set_foreground(self.fd, self.owner) {
            tracing::warn!(%err, "failed to take back the terminal");
        }
    }
}

fn set_foreground(fd: RawFd, pgid: Pid) -> io::Result<()> {
    // tcsetpgrp from a background group raises SIGTTOU.
    // SAFETY: only swaps the disposition between SIG_IGN and its previous value.
    let previous = unsafe { signal(Signal::SIGTTOU, SigHandler::SigIgn) }?;
    // SAFETY: fd refers to stdin, checked to be a terminal.
    let result = match unsafe { libc::tcsetpgrp(fd, pgid.as_raw()) } {
        -1 => Err(io::Error::last_os_error()),
        _ => Ok(()),
    };
    // SAFETY: see above.
    unsafe { signal(Signal::SIGTTOU, previous) }?;
    result
}
