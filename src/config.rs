//! Resolved runtime settings.
//!
//! Values come from CLI flags, which clap already falls back to the
//! `SCAFFOLD_*` environment variables for (a `.env` file is loaded first).
//! Relative manifest, state and cache paths are taken relative to the
//! project directory.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cli::GlobalArgs;
use crate::ports::FileSystem;

/// Directory name for completion markers inside the project.
pub const DEFAULT_STATE_DIR: &str = ".scaffold";

/// Invalid settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A path option was given as an empty string.
    #[error("--{0} must not be empty")]
    EmptyPath(&'static str),
    /// The project directory does not exist.
    #[error("project directory {} does not exist", .0.display())]
    MissingProject(PathBuf),
}

/// Paths a command works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Project directory tasks operate on.
    pub project_dir: PathBuf,
    /// Manifest file.
    pub manifest: PathBuf,
    /// Directory holding completion markers.
    pub state_dir: PathBuf,
    /// Directory for the parsed-manifest cache, if enabled.
    pub cache_dir: Option<PathBuf>,
}

impl Settings {
    /// Resolves settings from parsed global flags.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for empty paths or a missing project directory.
    pub fn resolve(args: &GlobalArgs, fs: &dyn FileSystem) -> Result<Self, ConfigError> {
        let non_empty = |path: &Path, flag: &'static str| {
            if path.as_os_str().is_empty() {
                Err(ConfigError::EmptyPath(flag))
            } else {
                Ok(())
            }
        };
        non_empty(&args.project, "project")?;
        non_empty(&args.manifest, "manifest")?;
        if let Some(dir) = &args.state_dir {
            non_empty(dir, "state-dir")?;
        }
        if let Some(dir) = &args.cache_dir {
            non_empty(dir, "cache-dir")?;
        }
        if !fs.exists(&args.project) {
            return Err(ConfigError::MissingProject(args.project.clone()));
        }

        let project_dir = args.project.clone();
        let within = |path: &Path| project_dir.join(path);
        Ok(Self {
            manifest: within(&args.manifest),
            state_dir: args
                .state_dir
                .as_deref()
                .map_or_else(|| within(Path::new(DEFAULT_STATE_DIR)), within),
            cache_dir: args.cache_dir.as_deref().map(within),
            project_dir: project_dir.clone(),
        })
    }
}
