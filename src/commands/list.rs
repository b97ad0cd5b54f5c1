//! `scaffold list` command.

use std::fmt::Write as _;

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::graph::TaskGraph;
use crate::tracker::CompletionTracker;

use super::{Exit, Workspace};

/// Execute the `list` command.
///
/// Prints every phase with its tasks, marking completed ones, then the
/// profiles.
///
/// # Errors
///
/// Returns an error string if the manifest or a marker cannot be read.
pub fn run(ctx: &ServiceContext, settings: &Settings) -> Result<Exit, String> {
    let workspace = Workspace::open(ctx, settings)?;
    println!("{}", render(workspace.manifest.graph(), &workspace.tracker)?);
    Ok(Exit::Success)
}

fn render(graph: &TaskGraph, tracker: &CompletionTracker<'_>) -> Result<String, String> {
    let width = graph.tasks().map(|t| t.id.len()).max().unwrap_or(0);
    let mut out = String::new();

    for phase in graph.phases() {
        let _ = write!(out, "Phase {}", phase.number);
        if let Some(name) = &phase.name {
            let _ = write!(out, ": {name}");
        }
        out.push('\n');
        if phase.task_ids.is_empty() {
            out.push_str("  (no tasks)\n");
        }
        for id in &phase.task_ids {
            let task = graph.task(id).map_err(|e| e.to_string())?;
            let mark = if tracker.is_complete(id).map_err(|e| e.to_string())? { 'x' } else { ' ' };
            let _ = write!(out, "  [{mark}] {id:<width$}  {}", task.category);
            if let Some(description) = &task.description {
                let _ = write!(out, "  {description}");
            }
            out.push('\n');
        }
    }

    let mut profiles = graph.profiles().peekable();
    if profiles.peek().is_some() {
        out.push_str("\nProfiles:\n");
        for profile in profiles {
            let _ = writeln!(out, "  {}: {}", profile.name, profile.task_ids.join(", "));
        }
    }
    Ok(out.trim_end().to_string())
}
