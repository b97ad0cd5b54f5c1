//! `scaffold run` command.

use crate::collaborator::CollaboratorRegistry;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::graph::Selector;
use crate::orchestrator::{
    format_duration, install_interrupt_handler, CancelFlag, Orchestrator, Progress, RunOptions,
    RunResult, TaskStatus,
};

use super::check::render_report;
use super::{Exit, Workspace};

/// Execute the `run` command.
///
/// Prints one progress line per task to stderr and the summary to stdout.
///
/// # Errors
///
/// Returns an error string if the manifest cannot be loaded or the selector
/// does not resolve.
pub fn run(
    ctx: &ServiceContext,
    settings: &Settings,
    selector: &Selector,
    options: &RunOptions,
) -> Result<Exit, String> {
    let workspace = Workspace::open(ctx, settings)?;
    let collaborators = CollaboratorRegistry::new();

    let cancel = CancelFlag::new();
    if let Err(e) = install_interrupt_handler(&cancel) {
        tracing::warn!(error = %e, "running without interrupt handling");
    }
    let observer = |progress: &Progress| eprintln!("{}", progress_line(progress));

    let orchestrator = Orchestrator::new(
        ctx,
        workspace.manifest.graph(),
        &workspace.tools,
        &collaborators,
        &workspace.tracker,
        &settings.project_dir,
    )
    .with_cancel(cancel)
    .with_observer(&observer);

    match orchestrator.run(selector, options) {
        RunResult::ResolutionError(e) => Err(format!("Cannot run {selector}: {e}")),
        RunResult::PreflightFailed(report) => {
            println!("{}", render_report(&report, &workspace.tools));
            println!("Nothing was executed.");
            Ok(Exit::Failure)
        }
        RunResult::Completed(summary) => {
            println!("{summary}");
            Ok(Exit::for_summary(&summary))
        }
    }
}

fn progress_line(progress: &Progress) -> String {
    let status = match &progress.outcome.status {
        TaskStatus::Succeeded => "done",
        TaskStatus::DryRun => "dry-run",
        TaskStatus::Failed(_) => "failed",
    };
    let mut line = format!(
        "[{}/{}] {} {status} (elapsed {}",
        progress.index,
        progress.total,
        progress.outcome.task_id,
        format_duration(progress.elapsed),
    );
    if progress.index < progress.total {
        line.push_str(&format!(", eta {}", format_duration(progress.eta)));
    }
    line.push(')');
    line
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::orchestrator::TaskOutcome;

    #[test]
    fn progress_line_shows_eta_until_the_last_task() {
        let mut progress = Progress {
            index: 1,
            total: 3,
            outcome: TaskOutcome {
                task_id: "git".into(),
                status: TaskStatus::Succeeded,
                duration: Duration::from_secs(2),
            },
            elapsed: Duration::from_secs(2),
            eta: Duration::from_secs(4),
        };
        assert_eq!(progress_line(&progress), "[1/3] git done (elapsed 2.0s, eta 4.0s)");
        progress.index = 3;
        assert_eq!(progress_line(&progress), "[3/3] git done (elapsed 2.0s)");
    }
}
