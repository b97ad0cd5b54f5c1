//! Accumulates interactions and writes them as a cassette file.

use std::path::PathBuf;

use chrono::Utc;

use super::format::{Cassette, Interaction};

/// Records interactions and writes them as a YAML cassette file.
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Create a new recorder that will write to the given path.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { path: path.into(), name: name.into(), interactions: Vec::new() }
    }

    /// Record an interaction. The `seq` field is assigned automatically.
    pub fn record(
        &mut self,
        port: impl Into<String>,
        method: impl Into<String>,
        input: serde_json::Value,
        output: serde_json::Value,
    ) {
        let seq = self.interactions.len() as u64;
        self.interactions.push(Interaction {
            seq,
            port: port.into(),
            method: method.into(),
            input,
            output,
        });
    }

    /// Number of interactions recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Write the cassette YAML file and return its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn finish(self) -> Result<PathBuf, std::io::Error> {
        let cassette = Cassette {
            name: self.name,
            recorded_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            interactions: self.interactions,
        };
        let yaml = serde_yaml::to_string(&cassette).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, yaml)?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sequence_numbers_follow_recording_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell.cassette.yaml");

        let mut recorder = CassetteRecorder::new(&path, "probe");
        recorder.record("shell", "locate", json!({"program": "git"}), json!("/usr/bin/git"));
        recorder.record(
            "shell",
            "run",
            json!({"command": "git --version", "cwd": null}),
            json!({"ok": {"exit_code": 0, "stdout": "git version 2.43.0\n", "stderr": ""}}),
        );
        assert_eq!(recorder.len(), 2);

        let written = recorder.finish().unwrap();
        let cassette = Cassette::from_yaml(&std::fs::read_to_string(written).unwrap()).unwrap();

        assert_eq!(cassette.name, "probe");
        assert_eq!(cassette.tool_version, env!("CARGO_PKG_VERSION"));
        let seqs: Vec<u64> = cassette.interactions.iter().map(|i| i.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(cassette.interactions[1].method, "run");
    }
}
