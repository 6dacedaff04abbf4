use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::Context as _;

use super::{restore_policy, Context};
use crate::cli::ScopeArgs;
use crate::cmdline::CommandLine;
use crate::job::{GroupPolicy, ProcessGroup};
use crate::power::InhibitRequest;
use crate::shutdown::{InterruptAction, InterruptWatcher};

/// Run `command` under inhibition and return its exit code.
pub fn run(
    ctx: &Context,
    scope: ScopeArgs,
    command: &[String],
    print_command_line: bool,
) -> anyhow::Result<i32> {
    let request = scope.resolve(&ctx.config.inhibit);
    if print_command_line {
        eprintln!("{}", CommandLine::from_args(command));
    }

    // Installed before launch so no termination signal is missed.
    let pgid = Arc::new(AtomicU32::new(0));
    let watcher = InterruptWatcher::start(InterruptAction::ForwardToGroup {
        pgid: Arc::clone(&pgid),
    })
    .context("installing signal handlers")?;

    let result = supervise(ctx, request, command, &pgid, &watcher);
    watcher.stop();
    result
}

fn supervise(
    ctx: &Context,
    request: InhibitRequest,
    command: &[String],
    pgid: &AtomicU32,
    watcher: &InterruptWatcher,
) -> anyhow::Result<i32> {
    let mut group =
        ProcessGroup::create_with_policy(None, GroupPolicy::from(&ctx.config.supervisor))?;

    let mut policy = ctx.power_policy();
    policy.apply(request).context("applying power policy")?;

    let child = group.launch(command)?;
    pgid.store(child.pid(), Ordering::SeqCst);
    if let Some(signal) = watcher.last_signal() {
        tracing::info!(?signal, "termination signal arrived during launch");
        group.terminate(signal)?;
    }

    group.wait_until_empty()?;

    let exit_code = group.exit_code(&child);
    tracing::info!(
        pid = child.pid(),
        exit_code,
        interrupted = watcher.interrupted(),
        "command finished"
    );

    restore_policy(policy)?;
    Ok(exit_code)
}
