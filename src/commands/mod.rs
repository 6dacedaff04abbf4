//! Subcommand implementations.
//!
//! Each command returns the process exit code on success; errors are
//! reported by `main`.

mod end;
mod run;
mod start;

use std::path::PathBuf;

use anyhow::Context as _;
use scopeguard::ScopeGuard;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::power::{self, PowerPolicy};

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    pub verbose: u8,
}

impl Context {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = Config::resolve_path(cli.config.as_deref());
        let config = Config::load_from(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        tracing::debug!(path = %config_path.display(), ?config, "config loaded");
        Ok(Self {
            config,
            config_path,
            verbose: cli.verbose,
        })
    }

    /// Power policy from config, restored on drop unless released with
    /// [`restore_policy`].
    fn power_policy(&self) -> ScopeGuard<Box<dyn PowerPolicy>, fn(Box<dyn PowerPolicy>)> {
        scopeguard::guard(
            power::from_backend(self.config.power.backend),
            restore_on_drop as fn(Box<dyn PowerPolicy>),
        )
    }
}

fn restore_on_drop(mut policy: Box<dyn PowerPolicy>) {
    if let Err(err) = policy.restore() {
        tracing::warn!(%err, "failed to restore power policy");
    }
}

fn restore_policy(
    policy: ScopeGuard<Box<dyn PowerPolicy>, fn(Box<dyn PowerPolicy>)>,
) -> anyhow::Result<()> {
    let mut policy = ScopeGuard::into_inner(policy);
    policy.restore().context("restoring power policy")?;
    Ok(())
}

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let ctx = Context::load(&cli)?;
    match cli.command {
        Command::Start {
            scope,
            timeout,
            background,
        } => {
            if background {
                start::spawn_background(&ctx, scope, timeout)?;
            } else {
                start::start(&ctx, scope, timeout)?;
            }
            Ok(0)
        }
        Command::End => {
            end::end()?;
            Ok(0)
        }
        Command::Run {
            scope,
            print_command_line,
            command,
        } => run::run(&ctx, scope, &command, print_command_line),
    }
}
