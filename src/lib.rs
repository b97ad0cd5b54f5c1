//! Core library entry for the `scaffold` CLI.
//!
//! A manifest declares setup tasks grouped into phases and profiles. The
//! orchestrator checks every selected task's preconditions before running
//! anything, executes tasks in declared order and records a completion
//! marker per successful task.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod collaborator;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod ports;
pub mod tools;
pub mod tracker;
pub mod validator;
pub mod version;

#[cfg(test)]
mod testing;

use clap::Parser;

use crate::commands::Exit;

/// Run the CLI with the provided arguments.
///
/// `--help` and `--version` print to stdout and succeed.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<Exit, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            print!("{err}");
            return Ok(Exit::Success);
        }
        Err(err) => return Err(err.to_string()),
    };
    if let Err(e) = logging::init_logging(cli.global.log_level, cli.global.log_format) {
        eprintln!("warning: {e}");
    }
    commands::dispatch(&cli)
}

#[cfg(test)]
mod tests {
    use super::run;
    use crate::commands::Exit;

    #[test]
    fn help_succeeds() {
        assert_eq!(run(["scaffold", "--help"]), Ok(Exit::Success));
    }

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run(["scaffold", "unknown"]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_project_is_an_error() {
        let err = run(["scaffold", "status", "--project", "/nonexistent/scaffold-project"]).unwrap_err();
        assert!(err.contains("does not exist"));
    }
}
