//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::graph::Selector;
use crate::logging::{LogFormat, LogLevel};

/// Top-level CLI parser for `scaffold`.
#[derive(Debug, Parser)]
#[command(name = "scaffold", version, about = "Run manifest-driven project setup tasks")]
pub struct Cli {
    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Task manifest (JSON, or YAML by extension), relative to the project.
    #[arg(long, global = true, env = "SCAFFOLD_MANIFEST", default_value = "scaffold.json")]
    pub manifest: PathBuf,
    /// Project directory tasks operate on.
    #[arg(long, global = true, default_value = ".")]
    pub project: PathBuf,
    /// Directory for completion markers [default: <project>/.scaffold].
    #[arg(long, global = true, env = "SCAFFOLD_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
    /// Directory for the parsed-manifest cache.
    #[arg(long, global = true, env = "SCAFFOLD_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
    /// Minimum log level (`RUST_LOG` overrides).
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Which tasks a run or check covers. Exactly one is required.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct SelectorArgs {
    /// Every task of a phase, in manifest order.
    #[arg(long)]
    pub phase: Option<u32>,
    /// A named profile.
    #[arg(long)]
    pub profile: Option<String>,
    /// A single task.
    #[arg(long)]
    pub task: Option<String>,
}

impl SelectorArgs {
    /// The selector these flags describe.
    #[must_use]
    pub fn selector(&self) -> Selector {
        match (&self.phase, &self.profile, &self.task) {
            (Some(phase), _, _) => Selector::Phase(*phase),
            (_, Some(profile), _) => Selector::Profile(profile.clone()),
            (_, _, Some(task)) => Selector::SingleTask(task.clone()),
            // clap's required group guarantees one of the above.
            (None, None, None) => Selector::Phase(1),
        }
    }
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Preflight and run tasks.
    Run {
        /// Tasks to run.
        #[command(flatten)]
        selector: SelectorArgs,
        /// Resolve and preflight only; report what would run.
        #[arg(long)]
        dry_run: bool,
        /// Skip precondition checks.
        #[arg(long)]
        skip_preflight: bool,
        /// Stop at the first failed task.
        #[arg(long)]
        stop_on_first_failure: bool,
    },
    /// Preflight tasks without running them.
    Check {
        /// Tasks to check.
        #[command(flatten)]
        selector: SelectorArgs,
    },
    /// List phases, profiles and tasks.
    List,
    /// Show completion markers.
    Status,
    /// Clear a task's completion marker.
    Reset {
        /// Task id.
        task: String,
    },
    /// Undo a task with its rollback step and clear its marker.
    Rollback {
        /// Task id.
        task: String,
    },
    /// Check a task's result with its verify step.
    Verify {
        /// Task id.
        task: String,
    },
    /// Install a tool with its known installer.
    Install {
        /// Tool name.
        tool: String,
        /// Required version to re-check after installing.
        #[arg(long)]
        version: Option<String>,
        /// Confirm running the installer.
        #[arg(long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use crate::graph::Selector;
    use clap::Parser;

    #[test]
    fn parses_run_with_phase_and_flags() {
        let cli = Cli::parse_from(["scaffold", "run", "--phase=1", "--dry-run", "--stop-on-first-failure"]);
        let Command::Run { selector, dry_run, skip_preflight, stop_on_first_failure } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(selector.selector(), Selector::Phase(1));
        assert!(dry_run && stop_on_first_failure && !skip_preflight);
    }

    #[test]
    fn selector_flags_are_mutually_exclusive_and_required() {
        assert!(Cli::try_parse_from(["scaffold", "run", "--phase=1", "--task=git"]).is_err());
        assert!(Cli::try_parse_from(["scaffold", "run"]).is_err());
        let cli = Cli::parse_from(["scaffold", "check", "--profile", "web"]);
        assert!(matches!(cli.command, Command::Check { selector } if selector.selector() == Selector::Profile("web".into())));
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::parse_from(["scaffold", "status", "--project", "/tmp/app", "--manifest", "setup.yaml"]);
        assert_eq!(cli.global.project.to_str(), Some("/tmp/app"));
        assert_eq!(cli.global.manifest.to_str(), Some("setup.yaml"));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn parses_install_and_task_commands() {
        let cli = Cli::parse_from(["scaffold", "install", "pnpm", "--yes"]);
        assert!(matches!(cli.command, Command::Install { ref tool, yes: true, version: None } if tool == "pnpm"));
        let cli = Cli::parse_from(["scaffold", "reset", "git"]);
        assert!(matches!(cli.command, Command::Reset { ref task } if task == "git"));
    }
}
