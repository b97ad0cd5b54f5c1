//! Task manifest: the declarative list of tasks, phases, profiles and tools.
//!
//! A [`Manifest`] is immutable once built. Reloading on change is the
//! [`ManifestStore`]'s job.

mod document;
mod store;
mod validate;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::SystemTime;

use indexmap::IndexMap;

pub use document::{ManifestDocument, PhaseEntry, ProfileEntry, Requires, TaskEntry, ToolRequirement, ToolSettings};
pub use store::ManifestStore;

use crate::error::ManifestError;
use crate::graph::TaskGraph;

/// A unit of setup work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Unique id.
    pub id: String,
    /// Phase number, starting at 1.
    pub phase: u32,
    /// Free-form grouping label.
    pub category: String,
    /// Human-readable summary.
    pub description: Option<String>,
    /// Tools that must be present, in declared order.
    pub required_tools: Vec<ToolRequirement>,
    /// Tools whose absence only warns.
    pub optional_tools: Vec<String>,
    /// Tasks that must already be complete.
    pub required_tasks: Vec<String>,
    /// Collaborator reference performing the task.
    pub entry_point: String,
    /// Collaborator reference undoing the task.
    pub rollback: Option<String>,
    /// Collaborator reference checking the task's result.
    pub verify: Option<String>,
}

impl Task {
    fn from_entry(id: &str, entry: TaskEntry) -> Self {
        Self {
            id: id.to_string(),
            phase: entry.phase,
            category: entry.category,
            description: entry.description,
            required_tools: entry.requires.tools,
            optional_tools: entry.optional,
            required_tasks: entry.requires.tasks,
            entry_point: entry.entry.unwrap_or_else(|| id.to_string()),
            rollback: entry.rollback,
            verify: entry.verify,
        }
    }
}

/// A phase and the ids of its tasks in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    /// Phase number.
    pub number: u32,
    /// Display name.
    pub name: Option<String>,
    /// Member task ids in declaration order.
    pub task_ids: Vec<String>,
}

/// A named, hand-ordered task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Profile name.
    pub name: String,
    /// Human-readable summary.
    pub description: Option<String>,
    /// Task ids in execution order.
    pub task_ids: Vec<String>,
}

/// A loaded, structurally valid manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    graph: TaskGraph,
    tools: BTreeMap<String, ToolSettings>,
    source_modified: Option<SystemTime>,
}

impl Manifest {
    /// Parses and validates manifest source text.
    ///
    /// The format follows `path`'s extension: `.yaml`/`.yml` is YAML,
    /// anything else JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] for malformed input, or a
    /// structural error if validation fails.
    pub fn from_source(path: &Path, source: &str) -> Result<Self, ManifestError> {
        Self::from_document(parse(path, source)?, None)
    }

    /// Validates a document and builds the manifest.
    ///
    /// # Errors
    ///
    /// Returns the first structural [`ManifestError`].
    pub fn from_document(
        doc: ManifestDocument,
        source_modified: Option<SystemTime>,
    ) -> Result<Self, ManifestError> {
        validate::check(&doc)?;

        let tasks: IndexMap<String, Task> = doc
            .tasks
            .into_iter()
            .map(|(id, entry)| {
                let task = Task::from_entry(&id, entry);
                (id, task)
            })
            .collect();
        let phases = doc
            .phases
            .into_iter()
            .map(|(number, entry)| (number, Phase { number, name: entry.name, task_ids: Vec::new() }))
            .collect();
        let profiles = doc
            .profiles
            .into_iter()
            .map(|(name, entry)| {
                let profile =
                    Profile { name: name.clone(), description: entry.description, task_ids: entry.tasks };
                (name, profile)
            })
            .collect();

        Ok(Self { graph: TaskGraph::new(tasks, phases, profiles), tools: doc.tools, source_modified })
    }

    /// The task index.
    #[must_use]
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Manifest-declared tool overrides.
    #[must_use]
    pub fn tools(&self) -> &BTreeMap<String, ToolSettings> {
        &self.tools
    }

    /// Modification time of the source this manifest was loaded from.
    #[must_use]
    pub fn source_modified(&self) -> Option<SystemTime> {
        self.source_modified
    }
}

/// Deserializes a manifest document, picking the format from `path`.
///
/// # Errors
///
/// Returns [`ManifestError::Parse`] with the parser's diagnostic.
pub fn parse(path: &Path, source: &str) -> Result<ManifestDocument, ManifestError> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let parsed = if is_yaml {
        serde_yaml::from_str(source).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(source).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| ManifestError::Parse { path: path.to_path_buf(), message })
}
