use std::io;
use std::thread;

use nix::errno::Errno;
use nix::sys::signal::{killpg, raise, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{setpgid, Pid};
use scopeguard::ScopeGuard;

use super::spawn::{kill_and_reap, spawn_suspended};
use super::terminal::Foreground;
use super::{GroupPolicy, JobError, UNKNOWN_EXIT_CODE};
use crate::cmdline::CommandLine;

/// The single top-level child launched into a [`ProcessGroup`].
#[derive(Debug, Clone)]
pub struct ChildHandle {
    pid: Pid,
    command_line: CommandLine,
}

impl ChildHandle {
    pub fn pid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.command_line
    }
}

/// A lifetime-tracked process tree with one top-level child.
///
/// Dropping the group releases it; with `kill_on_close` any member still
/// running at that point is killed.
pub struct ProcessGroup {
    name: String,
    policy: GroupPolicy,
    pgid: Option<Pid>,
    leader_status: Option<WaitStatus>,
    empty: bool,
    terminal: Option<Foreground>,
}

impl ProcessGroup {
    /// Create a group with the default policy.
    pub fn create(name: Option<&str>) -> Result<Self, JobError> {
        Self::create_with_policy(name, GroupPolicy::default())
    }

    pub fn create_with_policy(name: Option<&str>, policy: GroupPolicy) -> Result<Self, JobError> {
        let name = name
            .map(str::to_owned)
            .unwrap_or_else(|| format!("wakeguard-{}", std::process::id()));

        become_subreaper().map_err(|source| JobError::ResourceCreationFailed {
            name: name.clone(),
            source,
        })?;

        tracing::debug!(group = %name, ?policy, "process group created");
        Ok(Self {
            name,
            policy,
            pgid: None,
            leader_status: None,
            empty: false,
            terminal: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process group id, once a child has been launched.
    pub fn pgid(&self) -> Option<u32> {
        self.pgid.map(|pgid| pgid.as_raw() as u32)
    }

    /// Launch `command` as the group's only top-level child.
    ///
    /// The child is created stopped, moved into the group, then resumed.
    /// On any failure the child is killed and reaped before returning.
    pub fn launch<S: AsRef<str>>(&mut self, command: &[S]) -> Result<ChildHandle, JobError> {
        if self.pgid.is_some() {
            return Err(JobError::GroupOccupied {
                name: self.name.clone(),
            });
        }

        let command_line = CommandLine::from_args(command);
        let argv = command_line.to_argv()?;
        let program = argv[0].to_string_lossy().into_owned();
        let launch_failed = |source: io::Error| JobError::ProcessLaunchFailed {
            program: program.clone(),
            source,
        };

        tracing::debug!(group = %self.name, command_line = %command_line, "launching child");

        let child = spawn_suspended(&argv).map_err(launch_failed)?;
        let pending = scopeguard::guard(child.pid(), |pid| {
            tracing::warn!(pid = pid.as_raw(), "launch aborted, killing suspended child");
            kill_and_reap(pid);
        });

        setpgid(*pending, *pending).map_err(|errno| launch_failed(errno.into()))?;
        let terminal = if self.policy.lend_terminal {
            Foreground::lend_to(*pending).unwrap_or_else(|err| {
                tracing::debug!(%err, "terminal stays with the supervisor");
                None
            })
        } else {
            None
        };
        child.resume().map_err(launch_failed)?;

        let pid = ScopeGuard::into_inner(pending);
        self.pgid = Some(pid);
        self.terminal = terminal;
        tracing::info!(
            group = %self.name,
            pid = pid.as_raw(),
            command_line = %command_line,
            "child launched"
        );

        Ok(ChildHandle { pid, command_line })
    }

    /// Block until no process remains in the group.
    ///
    /// Members that are our children (including orphans re-parented to us)
    /// are reaped as they exit. Members we cannot reap are polled until the
    /// group disappears.
    pub fn wait_until_empty(&mut self) -> Result<(), JobError> {
        let Some(pgid) = self.pgid else {
            return Ok(());
        };

        loop {
            self.reap_members(pgid)?;
            match killpg(pgid, None) {
                Err(Errno::ESRCH) => break,
                Ok(()) | Err(Errno::EPERM) => thread::sleep(self.policy.poll_interval),
                Err(errno) => return Err(JobError::WaitFailed(errno.into())),
            }
        }

        self.empty = true;
        self.terminal = None;
        tracing::info!(group = %self.name, pgid = pgid.as_raw(), "process group is empty");
        Ok(())
    }

    /// Exit code of the top-level child.
    ///
    /// Killed by signal `n` maps to `128 + n`. Anything not yet observed is
    /// [`UNKNOWN_EXIT_CODE`].
    pub fn exit_code(&self, child: &ChildHandle) -> i32 {
        if self.pgid != Some(child.pid) {
            return UNKNOWN_EXIT_CODE;
        }
        match self.leader_status {
            Some(WaitStatus::Exited(_, code)) => code,
            Some(WaitStatus::Signaled(_, signal, _)) => 128 + signal as i32,
            _ => UNKNOWN_EXIT_CODE,
        }
    }

    /// Send `signal` to every member of the group.
    pub fn terminate(&self, signal: Signal) -> Result<(), JobError> {
        let Some(pgid) = self.pgid else {
            return Ok(());
        };
        signal_group(pgid, signal).map_err(|errno| JobError::WaitFailed(errno.into()))
    }

    fn reap_members(&mut self, pgid: Pid) -> Result<(), JobError> {
        let members = Pid::from_raw(-pgid.as_raw());
        loop {
            match waitpid(members, Some(WaitPidFlag::WUNTRACED)) {
                Ok(WaitStatus::Stopped(pid, signal)) => {
                    tracing::debug!(group = %self.name, pid = pid.as_raw(), ?signal, "group member stopped");
                    self.follow_stop(pgid)?;
                }
                Ok(status) => {
                    if status.pid() == Some(pgid) {
                        self.leader_status = Some(status);
                    }
                    tracing::debug!(group = %self.name, ?status, "reaped group member");
                }
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => return Ok(()),
                Err(errno) => return Err(JobError::WaitFailed(errno.into())),
            }
        }
    }

    /// A member stopped (Ctrl-Z while the group holds the terminal).
    ///
    /// With the terminal lent out, the stop cannot reach us through the
    /// terminal, so take it back and stop ourselves too; once our parent
    /// continues us, lend it again and continue the group. Without a
    /// terminal the group stays stopped until someone continues it.
    fn follow_stop(&mut self, pgid: Pid) -> Result<(), JobError> {
        if self.terminal.take().is_none() {
            return Ok(());
        }

        tracing::info!(group = %self.name, "group stopped, suspending supervisor");
        raise(Signal::SIGTSTP).map_err(|errno| JobError::WaitFailed(errno.into()))?;

        self.terminal = Foreground::lend_to(pgid).unwrap_or_else(|err| {
            tracing::debug!(%err, "terminal stays with the supervisor");
            None
        });
        tracing::info!(group = %self.name, "supervisor continued, resuming group");
        signal_group(pgid, Signal::SIGCONT).map_err(|errno| JobError::WaitFailed(errno.into()))
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid else {
            return;
        };
        if self.empty || !self.policy.kill_on_close {
            return;
        }

        tracing::warn!(group = %self.name, pgid = pgid.as_raw(), "killing remaining group members");
        if let Err(errno) = signal_group(pgid, Signal::SIGKILL) {
            tracing::warn!(group = %self.name, %errno, "failed to kill process group");
        }
        let members = Pid::from_raw(-pgid.as_raw());
        loop {
            match waitpid(members, None) {
                Ok(_) | Err(Errno::EINTR) => continue,
                Err(_) => break,
            }
        }
    }
}

fn signal_group(pgid: Pid, signal: Signal) -> Result<(), Errno> {
    match killpg(pgid, signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(errno),
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn become_subreaper() -> io::Result<()> {
    // SAFETY: PR_SET_CHILD_SUBREAPER takes a single integer flag.
    let rc = unsafe { libc::prctl(libc::PR_SET_CHILD_SUBREAPER, 1 as libc::c_ulong, 0, 0, 0) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn become_subreaper() -> io::Result<()> {
    Ok(())
}
