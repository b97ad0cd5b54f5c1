//! `scaffold status` command.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::graph::TaskGraph;
use crate::tracker::CompletionTracker;

use super::{Exit, Workspace};

/// Execute the `status` command.
///
/// Displays a table of every task with its phase and completion time,
/// followed by markers left behind by tasks no longer in the manifest.
///
/// # Errors
///
/// Returns an error string if the manifest or the state directory cannot be
/// read.
pub fn run(ctx: &ServiceContext, settings: &Settings) -> Result<Exit, String> {
    let workspace = Workspace::open(ctx, settings)?;
    println!("{}", render(workspace.manifest.graph(), &workspace.tracker)?);
    Ok(Exit::Success)
}

fn render(graph: &TaskGraph, tracker: &CompletionTracker<'_>) -> Result<String, String> {
    let mut markers: BTreeMap<String, DateTime<Utc>> = tracker
        .completed()
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|m| (m.task_id, m.completed_at))
        .collect();

    let rows: Vec<(String, String, String)> = graph
        .tasks()
        .map(|task| {
            let completed = markers
                .remove(&task.id)
                .map_or_else(|| "-".to_string(), |at| at.to_rfc3339_opts(SecondsFormat::Secs, true));
            (task.id.clone(), task.phase.to_string(), completed)
        })
        .collect();
    let done = rows.iter().filter(|r| r.2 != "-").count();

    let id_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(4).max(4);
    let phase_width = 5;
    let mut out = String::new();
    let _ = writeln!(out, "{:<id_width$}  {:<phase_width$}  COMPLETED", "TASK", "PHASE");
    let _ = writeln!(out, "{:-<id_width$}  {:-<phase_width$}  {:-<9}", "", "", "");
    for (id, phase, completed) in &rows {
        let _ = writeln!(out, "{id:<id_width$}  {phase:<phase_width$}  {completed}");
    }
    let _ = write!(out, "\n{done} of {} task(s) complete.", rows.len());

    if !markers.is_empty() {
        let orphans: Vec<&str> = markers.keys().map(String::as_str).collect();
        let _ = write!(
            out,
            "\nMarkers for tasks not in the manifest: {} (see {})",
            orphans.join(", "),
            tracker.state_dir().display()
        );
    }
    Ok(out)
}
