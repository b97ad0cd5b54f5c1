//! Error taxonomy for manifest loading, resolution, preflight and execution.
//!
//! Structural and resolution errors abort a whole run. Preflight errors are
//! aggregated into a report before anything executes. Execution and tracker
//! errors are recorded per task in the run summary.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::version::Comparator;

/// Errors raised while reading, parsing or structurally validating a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest source could not be read or stat'ed.
    #[error("failed to read manifest {path}: {message}")]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O failure.
        message: String,
    },

    /// The manifest source is not valid JSON/YAML for the manifest schema.
    #[error("failed to parse manifest {path}: {message}")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// A field-level rule was broken (empty id, phase 0, duplicate entry...).
    #[error("invalid manifest: {0}")]
    Validation(String),

    /// A task requires a task id that is not declared.
    #[error("task '{task}' requires unknown task '{dependency}'")]
    UnknownDependency {
        /// The dependent task.
        task: String,
        /// The missing prerequisite id.
        dependency: String,
    },

    /// A task requires a task from a later phase.
    #[error(
        "task '{task}' (phase {task_phase}) requires '{dependency}' from later phase {dependency_phase}"
    )]
    PhaseOrderViolation {
        /// The dependent task.
        task: String,
        /// Phase of the dependent task.
        task_phase: u32,
        /// The prerequisite task.
        dependency: String,
        /// Phase of the prerequisite task.
        dependency_phase: u32,
    },

    /// A profile lists a task id that is not declared.
    #[error("profile '{profile}' lists unknown task '{task}'")]
    UnknownProfileMember {
        /// Profile name.
        profile: String,
        /// The missing task id.
        task: String,
    },

    /// Task prerequisites form a cycle.
    #[error("dependency cycle between tasks: {}", .cycle.join(" -> "))]
    DependencyCycle {
        /// Task ids on the cycle, first id repeated at the end.
        cycle: Vec<String>,
    },
}

/// A run selector could not be expanded into a task list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// No task and no phase entry use this phase number.
    #[error("unknown phase {0}")]
    UnknownPhase(u32),
    /// No profile with this name.
    #[error("unknown profile '{0}'")]
    UnknownProfile(String),
    /// No task with this id.
    #[error("unknown task '{0}'")]
    UnknownTask(String),
    /// A task's entry point reference has no registered collaborator.
    #[error("task '{task}' references unknown collaborator '{reference}'")]
    UnknownCollaborator {
        /// The task declaring the reference.
        task: String,
        /// The unresolved reference.
        reference: String,
    },
}

/// A completion marker could not be read or written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// Reading, writing or removing the marker failed.
    #[error("completion marker for '{task}' is unavailable: {message}")]
    Io {
        /// Task id.
        task: String,
        /// Underlying failure.
        message: String,
    },
    /// The marker exists but does not hold a timestamp.
    #[error("completion marker for '{task}' is corrupt: {contents:?}")]
    Corrupt {
        /// Task id.
        task: String,
        /// Raw marker contents.
        contents: String,
    },
}

/// A blocking precondition failure for one task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreflightError {
    /// A required tool is not on `PATH`.
    #[error("task '{task}': required tool '{tool}' not found")]
    MissingTool {
        /// Task id.
        task: String,
        /// Tool name.
        tool: String,
    },

    /// A required tool's version does not satisfy the declared constraint.
    #[error("task '{task}': {tool} {actual} does not satisfy {comparator} {expected}")]
    VersionMismatch {
        /// Task id.
        task: String,
        /// Tool name.
        tool: String,
        /// Declared comparator.
        comparator: Comparator,
        /// Declared version.
        expected: String,
        /// Detected version.
        actual: String,
    },

    /// The tool is present but its version could not be extracted.
    #[error("task '{task}': could not determine {tool} version (need {comparator} {expected}): {message}")]
    VersionUndetermined {
        /// Task id.
        task: String,
        /// Tool name.
        tool: String,
        /// Declared comparator.
        comparator: Comparator,
        /// Declared version.
        expected: String,
        /// Probe failure.
        message: String,
    },

    /// A prerequisite task has no completion marker.
    #[error("task '{task}': prerequisite '{prerequisite}' has not completed (run `{command}`)")]
    MissingPrerequisiteTask {
        /// Task id.
        task: String,
        /// Prerequisite task id.
        prerequisite: String,
        /// Command that completes the prerequisite.
        command: String,
    },

    /// The prerequisite marker could not be read.
    #[error("task '{task}': {source}")]
    TrackerUnavailable {
        /// Task id.
        task: String,
        /// Tracker failure.
        source: TrackerError,
    },
}

impl PreflightError {
    /// The task this error belongs to.
    #[must_use]
    pub fn task(&self) -> &str {
        match self {
            Self::MissingTool { task, .. }
            | Self::VersionMismatch { task, .. }
            | Self::VersionUndetermined { task, .. }
            | Self::MissingPrerequisiteTask { task, .. }
            | Self::TrackerUnavailable { task, .. } => task,
        }
    }

    /// The tool involved, if this is a tool failure.
    #[must_use]
    pub fn tool(&self) -> Option<&str> {
        match self {
            Self::MissingTool { tool, .. }
            | Self::VersionMismatch { tool, .. }
            | Self::VersionUndetermined { tool, .. } => Some(tool),
            Self::MissingPrerequisiteTask { .. } | Self::TrackerUnavailable { .. } => None,
        }
    }
}

/// A task failed while the orchestrator was executing it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The collaborator reported failure.
    #[error("task '{task}' failed: {message}")]
    EntryPoint {
        /// Task id.
        task: String,
        /// Collaborator message.
        message: String,
    },
    /// Re-validation right before execution found blocking issues.
    #[error("task '{task}' preconditions no longer hold: {}", Issues(.issues))]
    Preconditions {
        /// Task id.
        task: String,
        /// The blocking issues.
        issues: Vec<PreflightError>,
    },
    /// The task succeeded but its marker could not be written.
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    /// The task or one of its collaborator references does not resolve.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// The task has no collaborator for the requested action.
    #[error("task '{task}' declares no {action} step")]
    NotDeclared {
        /// Task id.
        task: String,
        /// `rollback` or `verify`.
        action: &'static str,
    },
}

/// Explicit tool installation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemediationError {
    /// No installer is known for the tool.
    #[error("no installer known for '{0}'")]
    NoInstaller(String),
    /// The installer command ran and failed.
    #[error("installing '{tool}' with `{command}` failed: {message}")]
    InstallerFailed {
        /// Tool name.
        tool: String,
        /// Installer command.
        command: String,
        /// Failure detail.
        message: String,
    },
}

struct Issues<'a>(&'a [PreflightError]);

impl fmt::Display for Issues<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}
