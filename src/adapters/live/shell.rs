//! Live shell executor using `std::process::Command`.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::ports::shell::{ShellExecutor, ShellOutput};
use crate::ports::PortError;

/// Live shell executor that runs commands via `sh -c`.
pub struct LiveShellExecutor;

impl ShellExecutor for LiveShellExecutor {
    fn run(&self, command: &str, cwd: Option<&Path>) -> Result<ShellOutput, PortError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = cmd.output()?;
        Ok(ShellOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}
