//! Replaying adapter for the `FileSystem` port.

use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::{json, Value};

use super::replay_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{FileSystem, PortError};

/// Serves recorded filesystem results.
pub struct ReplayingFileSystem {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingFileSystem {
    /// Creates a replaying filesystem.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn output(&self, method: &str, path: &Path) -> Value {
        let input = json!({ "path": path.display().to_string() });
        self.replayer
            .lock()
            .expect("replayer lock poisoned")
            .take_matching("fs", method, &input)
            .output
    }
}

impl FileSystem for ReplayingFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, PortError> {
        replay_result(&self.output("read_to_string", path), "fs::read_to_string")
    }

    fn write(&self, path: &Path, _contents: &str) -> Result<(), PortError> {
        // Write inputs carry contents too, so match on the queue head.
        let output = self
            .replayer
            .lock()
            .expect("replayer lock poisoned")
            .next_interaction("fs", "write")
            .output;
        if let Some(err) = output.get("err") {
            let msg = err.as_str().unwrap_or("unknown error");
            return Err(format!("{}: {msg}", path.display()).into());
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.output("exists", path).as_bool().expect("fs::exists: recorded output is not a bool")
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, PortError> {
        replay_result(&self.output("list_dir", path), "fs::list_dir")
    }

    fn modified(&self, path: &Path) -> Result<SystemTime, PortError> {
        replay_result(&self.output("modified", path), "fs::modified")
    }

    fn remove(&self, path: &Path) -> Result<bool, PortError> {
        replay_result(&self.output("remove", path), "fs::remove")
    }
}
