use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::Context as _;
use nix::unistd::setsid;

use super::{restore_policy, Context};
use crate::cli::ScopeArgs;
use crate::power::InhibitRequest;
use crate::session::{SessionSignal, SESSION_SIGNAL_NAME, TIMED_SESSION_SIGNAL_NAME};
use crate::shutdown::{InterruptAction, InterruptWatcher};

/// Signal name owned by a session with or without a deadline.
pub(crate) fn session_name(timeout: Option<u64>) -> &'static str {
    if timeout.is_some() {
        TIMED_SESSION_SIGNAL_NAME
    } else {
        SESSION_SIGNAL_NAME
    }
}

/// Hold inhibition until `end`, the timeout, or a termination signal.
pub fn start(ctx: &Context, scope: ScopeArgs, timeout: Option<u64>) -> anyhow::Result<()> {
    let request = scope.resolve(&ctx.config.inhibit);
    let name = session_name(timeout);

    // Installed before the name is bound, so once `end` can reach the
    // session a termination signal can too.
    let watcher = InterruptWatcher::start(InterruptAction::WakeSession {
        name: name.to_string(),
    })
    .context("installing signal handlers")?;

    let result = hold_session(ctx, request, name, timeout, &watcher);
    watcher.stop();
    result
}

fn hold_session(
    ctx: &Context,
    request: InhibitRequest,
    name: &str,
    timeout: Option<u64>,
    watcher: &InterruptWatcher,
) -> anyhow::Result<()> {
    // Claim the name first so a second `start` fails before touching power.
    let mut signal = SessionSignal::begin(name)?;

    let mut policy = ctx.power_policy();
    policy.apply(request).context("applying power policy")?;
    tracing::info!(name, ?request, timeout_secs = ?timeout, "session started");

    if watcher.interrupted() {
        tracing::info!(name, "interrupted before the session was ready");
    } else {
        signal.wait(timeout.map(Duration::from_secs))?;
    }

    restore_policy(policy)?;
    tracing::info!(name, "session ended");
    Ok(())
}

/// Re-run `start` detached from the terminal and return immediately.
pub fn spawn_background(ctx: &Context, scope: ScopeArgs, timeout: Option<u64>) -> anyhow::Result<()> {
    let exe = std::env::current_exe().context("locating the wakeguard executable")?;

    let mut command = Command::new(exe);
    command.arg("--config").arg(&ctx.config_path);
    for _ in 0..ctx.verbose {
        command.arg("-v");
    }
    command.args(background_args(scope, timeout));
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    // SAFETY: setsid is async-signal-safe and touches no parent state.
    unsafe {
        command.pre_exec(|| {
            setsid().map_err(io::Error::from)?;
            Ok(())
        });
    }

    let child = command.spawn().context("spawning background session")?;
    tracing::info!(pid = child.id(), "background session spawned");
    println!("{}", child.id());
    Ok(())
}

fn background_args(scope: ScopeArgs, timeout: Option<u64>) -> Vec<String> {
    let mut args = vec!["start".to_string()];
    for (set, flag) in [
        (scope.idle, "--idle"),
        (scope.display, "--display"),
        (scope.ac_only, "--ac-only"),
    ] {
        if set {
            args.push(flag.to_string());
        }
    }
    if let Some(secs) = timeout {
        args.push("--timeout".to_string());
        args.push(secs.to_string());
    }
    args
}
