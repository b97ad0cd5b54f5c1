//! Live filesystem adapter using `std::fs`.

use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;

use crate::ports::filesystem::FileSystem;
use crate::ports::PortError;

/// Live filesystem adapter backed by real disk I/O.
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, PortError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write beside the target, then rename over it.
        let file_name = path
            .file_name()
            .ok_or_else(|| format!("not a file path: {}", path.display()))?
            .to_string_lossy();
        let staging = path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));
        std::fs::write(&staging, contents)?;
        if let Err(err) = std::fs::rename(&staging, path) {
            let _ = std::fs::remove_file(&staging);
            return Err(err.into());
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, PortError> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_string());
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn modified(&self, path: &Path) -> Result<SystemTime, PortError> {
        Ok(std::fs::metadata(path)?.modified()?)
    }

    fn remove(&self, path: &Path) -> Result<bool, PortError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/.git.completed");

        LiveFileSystem.write(&path, "first").unwrap();
        LiveFileSystem.write(&path, "second").unwrap();

        assert_eq!(LiveFileSystem.read_to_string(&path).unwrap(), "second");
        // No staging files left behind.
        let names = LiveFileSystem.list_dir(&dir.path().join("state")).unwrap();
        assert_eq!(names, vec![".git.completed"]);
    }

    #[test]
    fn remove_reports_whether_file_existed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marker");
        LiveFileSystem.write(&path, "x").unwrap();

        assert!(LiveFileSystem.remove(&path).unwrap());
        assert!(!LiveFileSystem.remove(&path).unwrap());
        assert!(!LiveFileSystem.exists(&path));
    }

    #[test]
    fn modified_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LiveFileSystem.modified(&dir.path().join("absent.json")).is_err());
    }
}
