//! In-memory index over tasks, phases and profiles.
//!
//! Expansion never re-sorts: a phase yields its tasks in manifest
//! declaration order and a profile yields exactly the list it declares.
//! Same-phase prerequisites must therefore be declared before their
//! dependents, otherwise call-time validation rejects the run.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use indexmap::IndexMap;

use crate::error::ResolutionError;
use crate::manifest::{Phase, Profile, Task};

/// What a run should execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// One task by id.
    SingleTask(String),
    /// Every task of a phase, in declaration order.
    Phase(u32),
    /// A named profile's task list.
    Profile(String),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleTask(id) => write!(f, "task '{id}'"),
            Self::Phase(n) => write!(f, "phase {n}"),
            Self::Profile(name) => write!(f, "profile '{name}'"),
        }
    }
}

/// The command a user runs to complete a single task.
#[must_use]
pub fn run_command(task_id: &str) -> String {
    format!("scaffold run --task={task_id}")
}

/// Index over a validated manifest's tasks, phases and profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGraph {
    tasks: IndexMap<String, Task>,
    phases: BTreeMap<u32, Phase>,
    profiles: IndexMap<String, Profile>,
}

impl TaskGraph {
    /// Builds the index. Phase task lists are derived from declaration order.
    pub(crate) fn new(
        tasks: IndexMap<String, Task>,
        mut phases: BTreeMap<u32, Phase>,
        profiles: IndexMap<String, Profile>,
    ) -> Self {
        for task in tasks.values() {
            phases
                .entry(task.phase)
                .or_insert_with(|| Phase { number: task.phase, name: None, task_ids: Vec::new() })
                .task_ids
                .push(task.id.clone());
        }
        Self { tasks, phases, profiles }
    }

    /// Looks up a task by id.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::UnknownTask`] if no task has this id.
    pub fn task(&self, id: &str) -> Result<&Task, ResolutionError> {
        self.tasks.get(id).ok_or_else(|| ResolutionError::UnknownTask(id.to_string()))
    }

    /// All tasks in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Declaration index of a task.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.tasks.get_index_of(id)
    }

    /// All phases, ascending.
    pub fn phases(&self) -> impl Iterator<Item = &Phase> {
        self.phases.values()
    }

    /// All profiles in declaration order.
    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    /// Tasks of phase `n` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::UnknownPhase`] if the phase is neither
    /// declared nor used by any task.
    pub fn tasks_for_phase(&self, n: u32) -> Result<Vec<&Task>, ResolutionError> {
        let phase = self.phases.get(&n).ok_or(ResolutionError::UnknownPhase(n))?;
        Ok(phase.task_ids.iter().filter_map(|id| self.tasks.get(id)).collect())
    }

    /// Tasks of profile `name`, exactly as listed.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::UnknownProfile`] if no profile has this name.
    pub fn tasks_for_profile(&self, name: &str) -> Result<Vec<&Task>, ResolutionError> {
        let profile = self
            .profiles
            .get(name)
            .ok_or_else(|| ResolutionError::UnknownProfile(name.to_string()))?;
        profile.task_ids.iter().map(|id| self.task(id)).collect()
    }

    /// Expands a selector into its ordered task list.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolutionError`] for an unknown task, phase or profile.
    pub fn resolve(&self, selector: &Selector) -> Result<Vec<&Task>, ResolutionError> {
        match selector {
            Selector::SingleTask(id) => Ok(vec![self.task(id)?]),
            Selector::Phase(n) => self.tasks_for_phase(*n),
            Selector::Profile(name) => self.tasks_for_profile(name),
        }
    }

    /// Orders the transitive prerequisites of `roots` that `is_missing`
    /// reports as incomplete, dependencies first.
    ///
    /// Only missing tasks are descended into: a completed prerequisite
    /// already had its own prerequisites satisfied when it ran.
    pub fn remediation_order<'a>(
        &'a self,
        roots: &[&str],
        mut is_missing: impl FnMut(&str) -> bool,
    ) -> Vec<&'a Task> {
        fn visit<'a>(
            graph: &'a TaskGraph,
            id: &str,
            is_missing: &mut dyn FnMut(&str) -> bool,
            seen: &mut HashSet<String>,
            out: &mut Vec<&'a Task>,
        ) {
            if !seen.insert(id.to_string()) {
                return;
            }
            let Some(task) = graph.tasks.get(id) else { return };
            for dep in &task.required_tasks {
                if is_missing(dep) {
                    visit(graph, dep, is_missing, seen, out);
                }
            }
            out.push(task);
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for root in roots {
            visit(self, root, &mut is_missing, &mut seen, &mut out);
        }
        out
    }
}
