//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::InhibitConfig;
use crate::power::InhibitRequest;

#[derive(Debug, Parser)]
#[command(
    name = "wakeguard",
    about = "Keep the machine awake for a session or for the lifetime of a command",
    version,
    long_about = None
)]
pub struct Cli {
    /// Config file (default: ~/.config/wakeguard/config.toml, or $WAKEGUARD_CONFIG).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an inhibition session that lasts until `end` or the timeout.
    Start {
        #[command(flatten)]
        scope: ScopeArgs,

        /// End the session by itself after this many seconds.
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,

        /// Detach and keep the session running in the background.
        #[arg(long)]
        background: bool,
    },

    /// End a running session.
    End,

    /// Run a command while inhibition is held and exit with its exit code.
    Run {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Print the encoded command line to stderr before launching.
        #[arg(long)]
        print_command_line: bool,

        /// Command to run, with its arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
        command: Vec<String>,
    },
}

/// Inhibition scope flags shared by `start` and `run`.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct ScopeArgs {
    /// Keep the system from idle sleep.
    #[arg(long)]
    pub idle: bool,

    /// Keep the display on.
    #[arg(long)]
    pub display: bool,

    /// Only inhibit while running on AC power.
    #[arg(long)]
    pub ac_only: bool,
}

impl ScopeArgs {
    /// Flags win when any scope flag is given; otherwise the configured
    /// scope applies.
    pub fn resolve(&self, defaults: &InhibitConfig) -> InhibitRequest {
        if !self.idle && !self.display {
            return InhibitRequest {
                ac_only: self.ac_only || defaults.ac_only,
                ..InhibitRequest::from(defaults)
            };
        }
        InhibitRequest {
            idle: self.idle,
            display: self.display,
            ac_only: self.ac_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_keeps_hyphenated_child_arguments() {
        let cli = Cli::parse_from(["wakeguard", "run", "--display", "--", "ls", "-la", "--color"]);
        let Command::Run { scope, command, .. } = cli.command else {
            panic!("expected run");
        };
        assert!(scope.display);
        assert_eq!(command, vec!["ls", "-la", "--color"]);
    }

    #[test]
    fn start_rejects_zero_timeout() {
        assert!(Cli::try_parse_from(["wakeguard", "start", "--timeout", "0"]).is_err());
    }

    #[test]
    fn scope_falls_back_to_config() {
        let defaults = InhibitConfig {
            idle: false,
            display: true,
            ac_only: false,
        };
        let request = ScopeArgs {
            ac_only: true,
            ..Default::default()
        }
        .resolve(&defaults);
        assert_eq!(
            request,
            InhibitRequest {
                idle: false,
                display: true,
                ac_only: true
            }
        );
    }

    #[test]
    fn scope_flags_override_config() {
        let request = ScopeArgs {
            idle: true,
            ..Default::default()
        }
        .resolve(&InhibitConfig {
            idle: true,
            display: true,
            ac_only: true,
        });
        assert_eq!(
            request,
            InhibitRequest {
                idle: true,
                display: false,
                ac_only: false
            }
        );
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
