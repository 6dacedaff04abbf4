//! Suspended launch.
//!
//! The child moves into its own process group and stops itself before
//! `exec`. The parent finishes group setup while the child is stopped and
//! only then lets it continue, so the command cannot exit or fork before it
//! belongs to the group. `exec` failures come back through a close-on-exec
//! pipe: EOF means the exec succeeded, four bytes carry the errno.

use std::ffi::CString;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, OwnedFd};

use nix::errno::Errno;
use nix::sys::signal::{kill, raise, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, setpgid, ForkResult, Pid};

/// Exit status of a child whose `exec` failed.
const EXEC_FAILED: i32 = 127;

/// A forked child stopped before `exec`.
pub(crate) struct SuspendedChild {
    pid: Pid,
    exec_status: File,
}

impl SuspendedChild {
    pub(crate) fn pid(&self) -> Pid {
        self.pid
    }

    /// Continue the child and wait for the outcome of its `exec`.
    ///
    /// On error the child has exited (or is about to) and must still be
    /// reaped by the caller.
    pub(crate) fn resume(mut self) -> io::Result<Pid> {
        kill(self.pid, Signal::SIGCONT)?;
        match read_exec_error(&mut self.exec_status)? {
            None => Ok(self.pid),
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
        }
    }
}

/// Fork `argv` and leave it stopped in a new process group.
///
/// `argv` must be non-empty. Every error path leaves no child behind.
pub(crate) fn spawn_suspended(argv: &[CString]) -> io::Result<SuspendedChild> {
    let (read_end, write_end) = cloexec_pipe()?;
    // The child must not allocate: build the NUL-terminated pointer array here.
    let exec_argv: Vec<*const libc::c_char> = argv
        .iter()
        .map(|arg| arg.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect();

    // SAFETY: the child branch only calls async-signal-safe functions
    // (setpgid, raise, execvp, write, _exit) on `exec_argv` and `write_end`,
    // both prepared before fork. Nothing in it allocates.
    match unsafe { fork() }? {
        ForkResult::Child => exec_child(&exec_argv, &write_end),
        ForkResult::Parent { child } => {
            drop(write_end);
            let mut exec_status = File::from(read_end);
            match waitpid(child, Some(WaitPidFlag::WUNTRACED)) {
                Ok(WaitStatus::Stopped(_, _)) => Ok(SuspendedChild {
                    pid: child,
                    exec_status,
                }),
                Ok(status) => {
                    tracing::debug!(pid = child.as_raw(), ?status, "child exited before stopping");
                    let errno = read_exec_error(&mut exec_status)?;
                    Err(errno.map(io::Error::from_raw_os_error).unwrap_or_else(|| {
                        io::Error::other("child exited before it could be suspended")
                    }))
                }
                Err(errno) => {
                    kill_and_reap(child);
                    Err(errno.into())
                }
            }
        }
    }
}

/// SIGKILL a child and reap it. Used on every failed launch path.
pub(crate) fn kill_and_reap(pid: Pid) {
    match kill(pid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(errno) => tracing::warn!(pid = pid.as_raw(), %errno, "failed to kill child"),
    }
    loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => continue,
            Ok(_) | Err(_) => break,
        }
    }
}

fn exec_child(argv: &[*const libc::c_char], exec_status: &OwnedFd) -> ! {
    let errno = match setpgid(Pid::from_raw(0), Pid::from_raw(0)) {
        Err(errno) => errno,
        Ok(()) => match raise(Signal::SIGSTOP) {
            Err(errno) => errno,
            Ok(()) => {
                // SAFETY: argv is a NUL-terminated array of pointers into
                // CStrings the parent keeps alive across fork.
                unsafe { libc::execvp(argv[0], argv.as_ptr()) };
                Errno::last()
            }
        },
    };
    let code = (errno as i32).to_be_bytes();
    // SAFETY: plain write/_exit on a valid fd; no allocation, no unwinding.
    unsafe {
        libc::write(exec_status.as_raw_fd(), code.as_ptr().cast(), code.len());
        libc::_exit(EXEC_FAILED);
    }
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
fn cloexec_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    Ok(nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)?)
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
fn cloexec_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};

    let (read_end, write_end) = nix::unistd::pipe()?;
    for fd in [&read_end, &write_end] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read_end, write_end))
}

fn read_exec_error(pipe: &mut File) -> io::Result<Option<i32>> {
    let mut bytes = Vec::with_capacity(4);
    pipe.read_to_end(&mut bytes)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    let code = <[u8; 4]>::try_from(bytes.as_slice())
        .map(i32::from_be_bytes)
        .unwrap_or(libc::EIO);
    Ok(Some(code))
}
