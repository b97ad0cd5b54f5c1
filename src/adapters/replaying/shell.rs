//! Replaying adapter for the `ShellExecutor` port.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::replay_result;
use crate::adapters::recording::shell::{LocateInput, RunInput};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{PortError, ShellExecutor, ShellOutput};

/// Serves recorded command results and program lookups.
///
/// Calls are matched on their input, so probes issued concurrently replay
/// identically regardless of which worker asks first.
pub struct ReplayingShellExecutor {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingShellExecutor {
    /// Creates a replaying shell executor.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn take(&self, method: &str, input: &impl serde::Serialize) -> serde_json::Value {
        let input = serde_json::to_value(input).unwrap_or_default();
        self.replayer
            .lock()
            .expect("replayer lock poisoned")
            .take_matching("shell", method, &input)
            .output
    }
}

impl ShellExecutor for ReplayingShellExecutor {
    fn run(&self, command: &str, cwd: Option<&Path>) -> Result<ShellOutput, PortError> {
        let input = RunInput { command, cwd: cwd.map(|p| p.display().to_string()) };
        replay_result(&self.take("run", &input), "shell::run")
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        serde_json::from_value::<Option<PathBuf>>(self.take("locate", &LocateInput { program }))
            .ok()
            .flatten()
    }
}
