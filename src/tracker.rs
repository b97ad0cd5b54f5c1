//! Completion tracker: durable per-task markers.
//!
//! A task is complete when `<state_dir>/.{task_id}.completed` exists. The
//! marker holds the RFC 3339 time it was written. Markers only appear after
//! a task's entry point succeeded and only disappear through [`clear`].
//!
//! [`clear`]: CompletionTracker::clear

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::context::ServiceContext;
use crate::error::TrackerError;

const MARKER_SUFFIX: &str = ".completed";

/// A recorded completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionMarker {
    /// Task id.
    pub task_id: String,
    /// When the task last completed.
    pub completed_at: DateTime<Utc>,
}

/// Reads and writes completion markers through `ctx.fs`.
pub struct CompletionTracker<'a> {
    ctx: &'a ServiceContext,
    state_dir: PathBuf,
}

impl<'a> CompletionTracker<'a> {
    /// Creates a tracker storing markers in `state_dir`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, state_dir: &Path) -> Self {
        Self { ctx, state_dir: state_dir.to_path_buf() }
    }

    /// Directory holding the markers.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Path of the marker for `task_id`.
    #[must_use]
    pub fn marker_path(&self, task_id: &str) -> PathBuf {
        self.state_dir.join(format!(".{task_id}{MARKER_SUFFIX}"))
    }

    /// Writes (or overwrites) the marker with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Io`] if the marker cannot be written.
    pub fn mark_complete(&self, task_id: &str) -> Result<DateTime<Utc>, TrackerError> {
        let now = self.ctx.clock.now();
        self.ctx
            .fs
            .write(&self.marker_path(task_id), &now.to_rfc3339())
            .map_err(|e| io(task_id, &e))?;
        tracing::debug!(task = task_id, "completion marker written");
        Ok(now)
    }

    /// When `task_id` last completed, if it has a marker.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Io`] if an existing marker cannot be read, or
    /// [`TrackerError::Corrupt`] if it holds no valid timestamp.
    pub fn completed_at(&self, task_id: &str) -> Result<Option<DateTime<Utc>>, TrackerError> {
        let path = self.marker_path(task_id);
        if !self.ctx.fs.exists(&path) {
            return Ok(None);
        }
        let contents = self.ctx.fs.read_to_string(&path).map_err(|e| io(task_id, &e))?;
        DateTime::parse_from_rfc3339(contents.trim())
            .map(|stamp| Some(stamp.with_timezone(&Utc)))
            .map_err(|_| TrackerError::Corrupt { task: task_id.to_string(), contents })
    }

    /// Whether `task_id` has a marker.
    ///
    /// # Errors
    ///
    /// See [`completed_at`](Self::completed_at).
    pub fn is_complete(&self, task_id: &str) -> Result<bool, TrackerError> {
        self.completed_at(task_id).map(|stamp| stamp.is_some())
    }

    /// Removes the marker. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Io`] if the marker exists but cannot be removed.
    pub fn clear(&self, task_id: &str) -> Result<bool, TrackerError> {
        let removed = self.ctx.fs.remove(&self.marker_path(task_id)).map_err(|e| io(task_id, &e))?;
        if removed {
            tracing::debug!(task = task_id, "completion marker cleared");
        }
        Ok(removed)
    }

    /// Every marker in the state directory, sorted by task id.
    ///
    /// # Errors
    ///
    /// Returns a [`TrackerError`] if the directory or a marker cannot be read.
    pub fn completed(&self) -> Result<Vec<CompletionMarker>, TrackerError> {
        if !self.ctx.fs.exists(&self.state_dir) {
            return Ok(Vec::new());
        }
        let names = self.ctx.fs.list_dir(&self.state_dir).map_err(|e| io("*", &e))?;
        let mut markers = Vec::new();
        for name in names {
            let Some(task_id) = name.strip_prefix('.').and_then(|n| n.strip_suffix(MARKER_SUFFIX))
            else {
                continue;
            };
            if let Some(completed_at) = self.completed_at(task_id)? {
                markers.push(CompletionMarker { task_id: task_id.to_string(), completed_at });
            }
        }
        Ok(markers)
    }
}

fn io(task_id: &str, err: &dyn std::fmt::Display) -> TrackerError {
    TrackerError::Io { task: task_id.to_string(), message: err.to_string() }
}
