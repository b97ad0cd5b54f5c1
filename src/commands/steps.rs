//! `scaffold rollback` and `scaffold verify` commands.

use crate::collaborator::CollaboratorRegistry;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::error::ExecutionError;
use crate::orchestrator::Orchestrator;

use super::{Exit, Workspace};

/// Execute the `rollback` command: run the task's rollback step, then clear
/// its marker.
///
/// # Errors
///
/// Returns an error string if the task is unknown, declares no rollback step,
/// or its marker cannot be cleared.
pub fn rollback(ctx: &ServiceContext, settings: &Settings, task_id: &str) -> Result<Exit, String> {
    with_orchestrator(ctx, settings, |orchestrator| match orchestrator.rollback(task_id) {
        Ok(cleared) => {
            let note = if cleared { "" } else { " (it was not marked complete)" };
            println!("Rolled back '{task_id}'{note}.");
            Ok(Exit::Success)
        }
        Err(e) => step_failed(e),
    })
}

/// Execute the `verify` command.
///
/// # Errors
///
/// Returns an error string if the task is unknown or declares no verify step.
pub fn verify(ctx: &ServiceContext, settings: &Settings, task_id: &str) -> Result<Exit, String> {
    with_orchestrator(ctx, settings, |orchestrator| match orchestrator.verify(task_id) {
        Ok(()) => {
            println!("'{task_id}' verified.");
            Ok(Exit::Success)
        }
        Err(e) => step_failed(e),
    })
}

fn with_orchestrator(
    ctx: &ServiceContext,
    settings: &Settings,
    f: impl FnOnce(&Orchestrator<'_>) -> Result<Exit, String>,
) -> Result<Exit, String> {
    let workspace = Workspace::open(ctx, settings)?;
    let collaborators = CollaboratorRegistry::new();
    let orchestrator = Orchestrator::new(
        ctx,
        workspace.manifest.graph(),
        &workspace.tools,
        &collaborators,
        &workspace.tracker,
        &settings.project_dir,
    );
    f(&orchestrator)
}

/// A step that ran and failed is a task failure; anything else never ran.
fn step_failed(err: ExecutionError) -> Result<Exit, String> {
    if let ExecutionError::EntryPoint { .. } = err {
        println!("{err}");
        Ok(Exit::TasksFailed)
    } else {
        Err(err.to_string())
    }
}
