//! Filesystem port for manifest, cache and marker I/O.

use std::path::Path;
use std::time::SystemTime;

use super::PortError;

/// Provides filesystem access for reading and writing files.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String, PortError>;

    /// Replaces the file with `contents`, creating parent directories.
    ///
    /// Readers never observe a partially written file.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Lists the entry names in a directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a directory or cannot be read.
    fn list_dir(&self, path: &Path) -> Result<Vec<String>, PortError>;

    /// Returns the last modification time of a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be stat'ed.
    fn modified(&self, path: &Path) -> Result<SystemTime, PortError>;

    /// Removes a file. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    fn remove(&self, path: &Path) -> Result<bool, PortError>;
}
