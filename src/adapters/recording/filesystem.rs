//! Recording adapter for the `FileSystem` port.

use std::path::Path;
use std::time::SystemTime;

use serde::Serialize;

use super::{record_interaction, record_result};
use crate::cassette::session::SharedRecorder;
use crate::ports::{FileSystem, PortError};

/// Records filesystem calls while delegating to an inner filesystem.
pub struct RecordingFileSystem {
    inner: Box<dyn FileSystem>,
    recorder: SharedRecorder,
}

impl RecordingFileSystem {
    /// Wraps `inner`, logging into `recorder`.
    pub fn new(inner: Box<dyn FileSystem>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct PathInput {
    path: String,
}

impl PathInput {
    fn of(path: &Path) -> Self {
        Self { path: path.display().to_string() }
    }
}

#[derive(Serialize)]
struct WriteInput<'a> {
    path: String,
    contents: &'a str,
}

impl FileSystem for RecordingFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, PortError> {
        let result = self.inner.read_to_string(path);
        record_result(&self.recorder, "fs", "read_to_string", &PathInput::of(path), &result);
        result
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError> {
        let result = self.inner.write(path, contents);
        let input = WriteInput { path: path.display().to_string(), contents };
        record_result(&self.recorder, "fs", "write", &input, &result);
        result
    }

    fn exists(&self, path: &Path) -> bool {
        let result = self.inner.exists(path);
        record_interaction(&self.recorder, "fs", "exists", &PathInput::of(path), &result);
        result
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, PortError> {
        let result = self.inner.list_dir(path);
        record_result(&self.recorder, "fs", "list_dir", &PathInput::of(path), &result);
        result
    }

    fn modified(&self, path: &Path) -> Result<SystemTime, PortError> {
        let result = self.inner.modified(path);
        record_result(&self.recorder, "fs", "modified", &PathInput::of(path), &result);
        result
    }

    fn remove(&self, path: &Path) -> Result<bool, PortError> {
        let result = self.inner.remove(path);
        record_result(&self.recorder, "fs", "remove", &PathInput::of(path), &result);
        result
    }
}
