//! A recording session: one cassette recorder per port.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::recorder::CassetteRecorder;

/// Shared handle to a port's recorder.
pub type SharedRecorder = Arc<Mutex<CassetteRecorder>>;

/// Per-port recorders writing into one timestamped directory.
pub struct RecordingSession {
    /// Recorder for clock interactions.
    pub clock: SharedRecorder,
    /// Recorder for filesystem interactions.
    pub fs: SharedRecorder,
    /// Recorder for shell interactions.
    pub shell: SharedRecorder,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Create a session writing to `<root>/<timestamp>/<port>.cassette.yaml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory already exists or cannot be created.
    pub fn new(root: &Path) -> Result<Self, String> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3f").to_string();
        let output_dir = root.join(&timestamp);

        if output_dir.exists() {
            return Err(format!("Cassette directory already exists: {}", output_dir.display()));
        }
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| format!("Failed to create cassette directory: {e}"))?;

        let make_recorder = |port: &str| -> SharedRecorder {
            let path = output_dir.join(format!("{port}.cassette.yaml"));
            Arc::new(Mutex::new(CassetteRecorder::new(path, format!("{timestamp}-{port}"))))
        };

        Ok(Self {
            clock: make_recorder("clock"),
            fs: make_recorder("fs"),
            shell: make_recorder("shell"),
            output_dir,
        })
    }

    /// The directory cassettes are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every port's cassette.
    ///
    /// All adapters holding the recorders must have been dropped first.
    ///
    /// # Errors
    ///
    /// Returns an error if a recorder is still shared or a file cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        fn finish_one(shared: SharedRecorder, port: &str) -> Result<(), String> {
            let recorder = Arc::try_unwrap(shared)
                .map_err(|_| format!("Recording adapter for {port} still has references"))?
                .into_inner()
                .map_err(|e| format!("Recorder lock for {port} poisoned: {e}"))?;
            recorder.finish().map_err(|e| format!("Failed to write {port} cassette: {e}"))?;
            Ok(())
        }

        finish_one(self.clock, "clock")?;
        finish_one(self.fs, "fs")?;
        finish_one(self.shell, "shell")?;
        Ok(self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_writes_one_cassette_per_port() {
        let root = tempfile::tempdir().unwrap();
        let session = RecordingSession::new(root.path()).unwrap();
        let dir = session.output_dir().to_path_buf();
        assert!(dir.starts_with(root.path()));

        let written = session.finish().unwrap();
        assert_eq!(written, dir);
        for port in ["clock", "fs", "shell"] {
            assert!(dir.join(format!("{port}.cassette.yaml")).exists(), "{port} cassette missing");
        }
    }

    #[test]
    fn finish_fails_while_recorder_is_shared() {
        let root = tempfile::tempdir().unwrap();
        let session = RecordingSession::new(root.path()).unwrap();
        let _held = Arc::clone(&session.fs);

        let err = session.finish().unwrap_err();
        assert!(err.contains("fs still has references"));
    }
}
