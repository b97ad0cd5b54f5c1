//! Serde mirror of the manifest file schema.
//!
//! These types are what JSON/YAML deserializes into and what the on-disk
//! cache stores. [`super::Manifest`] is built from them after validation.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::version::Comparator;

/// Top-level manifest document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestDocument {
    /// Tasks by id, in declaration order.
    #[serde(default)]
    pub tasks: IndexMap<String, TaskEntry>,
    /// Optional phase metadata by phase number.
    #[serde(default)]
    pub phases: BTreeMap<u32, PhaseEntry>,
    /// Profiles by name, in declaration order.
    #[serde(default)]
    pub profiles: IndexMap<String, ProfileEntry>,
    /// Per-tool probe and installer overrides.
    #[serde(default)]
    pub tools: BTreeMap<String, ToolSettings>,
}

/// One task as written in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    /// Phase number, starting at 1.
    pub phase: u32,
    /// Free-form grouping label.
    #[serde(default)]
    pub category: String,
    /// Human-readable summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Collaborator reference; defaults to the task id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    /// Collaborator reference undoing the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<String>,
    /// Collaborator reference checking the task's result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<String>,
    /// Hard requirements.
    #[serde(default)]
    pub requires: Requires,
    /// Tools whose absence only warns.
    #[serde(default)]
    pub optional: Vec<String>,
}

/// Hard requirements of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requires {
    /// Tools that must be on `PATH`, in declared order.
    #[serde(default)]
    pub tools: Vec<ToolRequirement>,
    /// Tasks that must already carry a completion marker.
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// A required tool with an optional version constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequirement {
    /// Program name as found on `PATH`.
    pub name: String,
    /// Declared version, compared with `comparator`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Comparison direction, `min` unless stated.
    #[serde(default, rename = "cmp")]
    pub comparator: Comparator,
}

/// Phase metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseEntry {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A hand-ordered task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    /// Task ids in execution order.
    pub tasks: Vec<String>,
    /// Human-readable summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Manifest-level overrides for how a tool is probed and installed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Command whose output contains the tool's version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_command: Option<String>,
    /// Command that installs the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<String>,
}
