//! Recording adapter for the `ShellExecutor` port.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{record_interaction, record_result};
use crate::cassette::session::SharedRecorder;
use crate::ports::{PortError, ShellExecutor, ShellOutput};

/// Records shell calls while delegating to an inner executor.
pub struct RecordingShellExecutor {
    inner: Box<dyn ShellExecutor>,
    recorder: SharedRecorder,
}

impl RecordingShellExecutor {
    /// Wraps `inner`, logging into `recorder`.
    pub fn new(inner: Box<dyn ShellExecutor>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
pub(crate) struct RunInput<'a> {
    pub(crate) command: &'a str,
    pub(crate) cwd: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct LocateInput<'a> {
    pub(crate) program: &'a str,
}

impl ShellExecutor for RecordingShellExecutor {
    fn run(&self, command: &str, cwd: Option<&Path>) -> Result<ShellOutput, PortError> {
        let result = self.inner.run(command, cwd);
        let input = RunInput { command, cwd: cwd.map(|p| p.display().to_string()) };
        record_result(&self.recorder, "shell", "run", &input, &result);
        result
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        let result = self.inner.locate(program);
        record_interaction(&self.recorder, "shell", "locate", &LocateInput { program }, &result);
        result
    }
}
