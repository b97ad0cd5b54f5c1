//! Structural validation of a parsed manifest document.
//!
//! Checks run in a fixed order and stop at the first failure: field rules,
//! unknown prerequisites, phase ordering, profile membership, then cycles.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};

use super::document::ManifestDocument;
use crate::error::ManifestError;

/// Validates `doc`, returning the first structural error found.
///
/// # Errors
///
/// Returns the first [`ManifestError`] in check order.
pub fn check(doc: &ManifestDocument) -> Result<(), ManifestError> {
    check_fields(doc)?;
    check_dependencies(doc)?;
    check_profiles(doc)?;
    if let Some(cycle) = find_cycle(doc) {
        return Err(ManifestError::DependencyCycle { cycle });
    }
    Ok(())
}

fn check_fields(doc: &ManifestDocument) -> Result<(), ManifestError> {
    for (id, task) in &doc.tasks {
        if id.trim().is_empty() {
            return Err(ManifestError::Validation("task id must not be empty".into()));
        }
        if id.contains(['/', '\\']) || id.chars().any(char::is_whitespace) {
            return Err(ManifestError::Validation(format!(
                "task id '{id}' must not contain path separators or whitespace"
            )));
        }
        if task.phase == 0 {
            return Err(ManifestError::Validation(format!("task '{id}' has phase 0; phases start at 1")));
        }
        if let Some(tool) = task.requires.tools.iter().find(|t| t.name.trim().is_empty()) {
            return Err(ManifestError::Validation(format!(
                "task '{id}' requires a tool with an empty name (version {:?})",
                tool.version
            )));
        }
    }
    if doc.phases.contains_key(&0) {
        return Err(ManifestError::Validation("phase 0 is not allowed; phases start at 1".into()));
    }
    Ok(())
}

fn check_dependencies(doc: &ManifestDocument) -> Result<(), ManifestError> {
    for (id, task) in &doc.tasks {
        for dep in &task.requires.tasks {
            let Some(prerequisite) = doc.tasks.get(dep) else {
                return Err(ManifestError::UnknownDependency {
                    task: id.clone(),
                    dependency: dep.clone(),
                });
            };
            if prerequisite.phase > task.phase {
                return Err(ManifestError::PhaseOrderViolation {
                    task: id.clone(),
                    task_phase: task.phase,
                    dependency: dep.clone(),
                    dependency_phase: prerequisite.phase,
                });
            }
        }
    }
    Ok(())
}

/// Profiles must name known tasks and never step back to an earlier phase.
fn check_profiles(doc: &ManifestDocument) -> Result<(), ManifestError> {
    for (name, profile) in &doc.profiles {
        let mut previous: Option<(&str, u32)> = None;
        for member in &profile.tasks {
            let Some(task) = doc.tasks.get(member) else {
                return Err(ManifestError::UnknownProfileMember {
                    profile: name.clone(),
                    task: member.clone(),
                });
            };
            if let Some((prev_id, prev_phase)) = previous {
                if task.phase < prev_phase {
                    return Err(ManifestError::Validation(format!(
                        "profile '{name}' lists '{member}' (phase {}) after '{prev_id}' (phase {prev_phase})",
                        task.phase
                    )));
                }
            }
            previous = Some((member, task.phase));
        }
    }
    Ok(())
}

/// Returns the shortest cycle through the earliest-declared task on any
/// cycle, first id repeated at the end.
fn find_cycle(doc: &ManifestDocument) -> Option<Vec<String>> {
    // Node indices follow declaration order.
    let mut graph = DiGraph::<&str, ()>::with_capacity(doc.tasks.len(), 0);
    for id in doc.tasks.keys() {
        graph.add_node(id.as_str());
    }
    for (from, task) in doc.tasks.values().enumerate() {
        for dep in &task.requires.tasks {
            if let Some(to) = doc.tasks.get_index_of(dep) {
                graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
            }
        }
    }
    if !is_cyclic_directed(&graph) {
        return None;
    }

    let scc = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .min_by_key(|scc| scc.iter().map(|n| n.index()).min())?;
    let start = scc.iter().copied().min_by_key(|n| n.index())?;
    let members: HashSet<NodeIndex> = scc.into_iter().collect();

    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        for next in graph.neighbors(node) {
            if next == start {
                let mut path = vec![node];
                let mut cursor = node;
                while let Some(&up) = parent.get(&cursor) {
                    path.push(up);
                    cursor = up;
                }
                path.reverse();
                path.push(start);
                return Some(path.into_iter().map(|n| graph[n].to_string()).collect());
            }
            if members.contains(&next) && !parent.contains_key(&next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    None
}
