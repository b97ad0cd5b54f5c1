//! Shell executor port for running external commands.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::PortError;

/// The output of a shell command execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellOutput {
    /// The exit code of the process.
    pub exit_code: i32,
    /// The captured standard output.
    pub stdout: String,
    /// The captured standard error.
    pub stderr: String,
}

impl ShellOutput {
    /// Returns `true` when the process exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout followed by stderr; some tools print their version on stderr.
    #[must_use]
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Executes shell commands and locates programs.
///
/// Tool probes run on worker threads, hence `Sync`.
pub trait ShellExecutor: Send + Sync {
    /// Runs a command string in the system shell, optionally in `cwd`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    fn run(&self, command: &str, cwd: Option<&Path>) -> Result<ShellOutput, PortError>;

    /// Resolves a program name against `PATH`.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}
