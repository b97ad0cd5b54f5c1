//! Orchestrator: resolves a selector, preflights the batch and runs tasks.
//!
//! A run moves through `Resolving → PreflightValidating → (PreflightFailed |
//! Executing) → Completed`. Tasks run one at a time in resolved order. Each
//! task is re-validated right before it runs, since the machine may have
//! changed since preflight. Cancellation is checked between tasks only.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::collaborator::{CollaboratorRegistry, Invocation, TaskCollaborator};
use crate::context::ServiceContext;
use crate::error::{ExecutionError, ResolutionError};
use crate::graph::{Selector, TaskGraph};
use crate::manifest::Task;
use crate::tools::ToolRegistry;
use crate::tracker::CompletionTracker;
use crate::validator::{BatchReport, PreconditionValidator, PreflightWarning};

/// Run switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Resolve and preflight, but do not execute.
    pub dry_run: bool,
    /// Skip batch preflight and per-task re-validation.
    pub skip_preflight: bool,
    /// Stop at the first failed task instead of continuing.
    pub stop_on_first_failure: bool,
}

/// Stage of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Expanding the selector.
    Resolving,
    /// Checking the whole batch.
    PreflightValidating,
    /// Preflight found blocking errors; nothing ran.
    PreflightFailed,
    /// Running tasks.
    Executing,
    /// Finished, possibly early.
    Completed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolving => "resolving",
            Self::PreflightValidating => "preflight",
            Self::PreflightFailed => "preflight-failed",
            Self::Executing => "executing",
            Self::Completed => "completed",
        })
    }
}

/// How one task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// The entry point succeeded and the marker was written.
    Succeeded,
    /// Dry run; nothing was executed.
    DryRun,
    /// Re-validation, the entry point or the marker write failed.
    Failed(ExecutionError),
}

/// One task's result within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Task id.
    pub task_id: String,
    /// How it ended.
    pub status: TaskStatus,
    /// Time spent on it.
    pub duration: Duration,
}

impl TaskOutcome {
    /// Whether the task was not attempted because re-validation failed.
    #[must_use]
    pub fn skipped_by_preflight(&self) -> bool {
        matches!(self.status, TaskStatus::Failed(ExecutionError::Preconditions { .. }))
    }

    /// Whether the task was attempted and failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        matches!(self.status, TaskStatus::Failed(_)) && !self.skipped_by_preflight()
    }
}

/// Aggregate of a run that reached `Executing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Whether execution was replaced with no-ops.
    pub dry_run: bool,
    /// Number of tasks the selector resolved to.
    pub total: usize,
    /// Outcomes in run order.
    pub outcomes: Vec<TaskOutcome>,
    /// Tasks never started, because of interruption or an early stop.
    pub not_started: Vec<String>,
    /// Whether an interrupt ended the run.
    pub interrupted: bool,
    /// Wall time of the whole run.
    pub elapsed: Duration,
    /// Preflight warnings.
    pub warnings: Vec<PreflightWarning>,
}

impl RunSummary {
    /// Tasks that ran successfully (or would have, in a dry run).
    #[must_use]
    pub fn run(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, TaskStatus::Succeeded | TaskStatus::DryRun))
            .count()
    }

    /// Tasks that were attempted and failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.failed()).count()
    }

    /// Tasks blocked by re-validation.
    #[must_use]
    pub fn skipped_by_preflight(&self) -> usize {
        self.outcomes.iter().filter(|o| o.skipped_by_preflight()).count()
    }

    /// Whether every resolved task succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.failed() == 0 && self.skipped_by_preflight() == 0 && self.not_started.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            let duration = format_duration(outcome.duration);
            match &outcome.status {
                TaskStatus::Succeeded => writeln!(f, "  ok       {} ({duration})", outcome.task_id)?,
                TaskStatus::DryRun => writeln!(f, "  dry-run  {}", outcome.task_id)?,
                TaskStatus::Failed(err) if outcome.skipped_by_preflight() => {
                    writeln!(f, "  skipped  {}: {err}", outcome.task_id)?;
                }
                TaskStatus::Failed(err) => writeln!(f, "  FAILED   {}: {err}", outcome.task_id)?,
            }
        }
        for id in &self.not_started {
            writeln!(f, "  -        {id} (not started)")?;
        }
        for warning in &self.warnings {
            writeln!(f, "  warning: {warning}")?;
        }
        let verb = if self.dry_run { "would run" } else { "run" };
        write!(
            f,
            "{} {verb}, {} failed, {} skipped by preflight, {} of {} tasks in {}",
            self.run(),
            self.failed(),
            self.skipped_by_preflight(),
            self.outcomes.len(),
            self.total,
            format_duration(self.elapsed),
        )?;
        if self.interrupted {
            write!(f, " (interrupted)")?;
        }
        Ok(())
    }
}

/// The result of [`Orchestrator::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    /// The selector or an entry point did not resolve; nothing ran.
    ResolutionError(ResolutionError),
    /// Preflight found blocking errors; nothing ran.
    PreflightFailed(BatchReport),
    /// Execution finished, fully or partially.
    Completed(RunSummary),
}

/// Progress after one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// 1-based index of the task just finished.
    pub index: usize,
    /// Number of tasks in the run.
    pub total: usize,
    /// The task just finished.
    pub outcome: TaskOutcome,
    /// Time since the run started.
    pub elapsed: Duration,
    /// Remaining tasks times this run's average task duration.
    pub eta: Duration,
}

/// Receives progress after every task.
pub trait ProgressObserver {
    /// Called once per finished task.
    fn on_progress(&self, progress: &Progress);
}

impl<F: Fn(&Progress)> ProgressObserver for F {
    fn on_progress(&self, progress: &Progress) {
        self(progress);
    }
}

/// Shared cancellation request, checked between tasks.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that is not set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Exit code used when an interrupt ends the process.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Routes Ctrl-C to `flag`. A second Ctrl-C exits immediately.
///
/// # Errors
///
/// Returns an error if a handler is already installed.
pub fn install_interrupt_handler(flag: &CancelFlag) -> Result<(), String> {
    let flag = flag.clone();
    ctrlc::set_handler(move || {
        if flag.is_cancelled() {
            std::process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("\nInterrupt received; finishing the current task before stopping.");
        flag.cancel();
    })
    .map_err(|e| format!("Failed to install interrupt handler: {e}"))
}

/// Drives runs over one manifest.
pub struct Orchestrator<'a> {
    ctx: &'a ServiceContext,
    graph: &'a TaskGraph,
    tools: &'a ToolRegistry,
    collaborators: &'a CollaboratorRegistry,
    tracker: &'a CompletionTracker<'a>,
    project_dir: PathBuf,
    cancel: CancelFlag,
    observer: Option<&'a dyn ProgressObserver>,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator acting on `project_dir`.
    #[must_use]
    pub fn new(
        ctx: &'a ServiceContext,
        graph: &'a TaskGraph,
        tools: &'a ToolRegistry,
        collaborators: &'a CollaboratorRegistry,
        tracker: &'a CompletionTracker<'a>,
        project_dir: &Path,
    ) -> Self {
        Self {
            ctx,
            graph,
            tools,
            collaborators,
            tracker,
            project_dir: project_dir.to_path_buf(),
            cancel: CancelFlag::new(),
            observer: None,
        }
    }

    /// Uses `flag` for cancellation.
    #[must_use]
    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Reports progress to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn validator(&self) -> PreconditionValidator<'_> {
        PreconditionValidator::new(self.ctx, self.graph, self.tools, self.tracker)
    }

    /// Resolves, preflights and executes `selector`.
    #[must_use]
    pub fn run(&self, selector: &Selector, options: &RunOptions) -> RunResult {
        let started = self.ctx.clock.now();
        let mut state = RunState::Resolving;
        info!(%selector, dry_run = options.dry_run, "run started");

        let tasks = match self.graph.resolve(selector) {
            Ok(tasks) => tasks,
            Err(e) => return RunResult::ResolutionError(e),
        };
        let mut plan: Vec<(&Task, Arc<dyn TaskCollaborator>)> = Vec::with_capacity(tasks.len());
        for &task in &tasks {
            match self.collaborators.resolve(task, &task.entry_point) {
                Ok(collaborator) => plan.push((task, collaborator)),
                Err(e) => return RunResult::ResolutionError(e),
            }
        }

        transition(&mut state, RunState::PreflightValidating);
        let validator = self.validator();
        let warnings = if options.skip_preflight {
            warn!("preflight skipped on request");
            Vec::new()
        } else {
            let report = validator.validate_batch(&tasks);
            if !report.passed() {
                transition(&mut state, RunState::PreflightFailed);
                return RunResult::PreflightFailed(report);
            }
            report.warnings().cloned().collect()
        };

        transition(&mut state, RunState::Executing);
        let total = plan.len();
        let mut outcomes: Vec<TaskOutcome> = Vec::with_capacity(total);
        let mut not_started = Vec::new();
        let mut interrupted = false;

        for (index, (task, collaborator)) in plan.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(task = %task.id, "interrupted; not starting further tasks");
                interrupted = true;
                not_started = plan[index..].iter().map(|(t, _)| t.id.clone()).collect();
                break;
            }

            let task_started = self.ctx.clock.now();
            let status = if options.dry_run {
                info!(task = %task.id, "dry run: would execute");
                TaskStatus::DryRun
            } else {
                self.execute(task, collaborator.as_ref(), &validator, options)
            };
            let finished = self.ctx.clock.now();
            let outcome =
                TaskOutcome { task_id: task.id.clone(), status, duration: between(task_started, finished) };
            let stop = options.stop_on_first_failure && matches!(outcome.status, TaskStatus::Failed(_));
            outcomes.push(outcome);

            if let (Some(observer), Some(progress)) =
                (self.observer, progress(&outcomes, total, between(started, finished)))
            {
                observer.on_progress(&progress);
            }
            if stop {
                warn!(task = %task.id, "stopping after first failure");
                not_started = plan[index + 1..].iter().map(|(t, _)| t.id.clone()).collect();
                break;
            }
        }

        transition(&mut state, RunState::Completed);
        let summary = RunSummary {
            dry_run: options.dry_run,
            total,
            outcomes,
            not_started,
            interrupted,
            elapsed: between(started, self.ctx.clock.now()),
            warnings,
        };
        info!(
            run = summary.run(),
            failed = summary.failed(),
            skipped = summary.skipped_by_preflight(),
            "run finished"
        );
        RunResult::Completed(summary)
    }

    fn execute(
        &self,
        task: &Task,
        collaborator: &dyn TaskCollaborator,
        validator: &PreconditionValidator<'_>,
        options: &RunOptions,
    ) -> TaskStatus {
        if !options.skip_preflight {
            let report = validator.validate_one(task);
            if !report.passed() {
                warn!(task = %task.id, "preconditions no longer hold; skipping");
                return TaskStatus::Failed(ExecutionError::Preconditions {
                    task: task.id.clone(),
                    issues: report.errors,
                });
            }
        }

        info!(task = %task.id, phase = task.phase, "executing task");
        let invocation = Invocation { ctx: self.ctx, task, project_dir: &self.project_dir };
        if let Err(message) = collaborator.invoke(&invocation) {
            warn!(task = %task.id, %message, "task failed");
            return TaskStatus::Failed(ExecutionError::EntryPoint { task: task.id.clone(), message });
        }
        match self.tracker.mark_complete(&task.id) {
            Ok(_) => TaskStatus::Succeeded,
            Err(e) => TaskStatus::Failed(e.into()),
        }
    }

    /// Runs `task_id`'s rollback collaborator, then clears its marker.
    ///
    /// Returns whether a marker was cleared.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] if the task or its rollback reference
    /// does not resolve, the rollback fails, or the marker cannot be removed.
    pub fn rollback(&self, task_id: &str) -> Result<bool, ExecutionError> {
        let task = self.graph.task(task_id)?;
        self.invoke_step(task, task.rollback.as_deref(), "rollback")?;
        Ok(self.tracker.clear(task_id)?)
    }

    /// Runs `task_id`'s verify collaborator.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] if the task or its verify reference does
    /// not resolve or verification fails.
    pub fn verify(&self, task_id: &str) -> Result<(), ExecutionError> {
        let task = self.graph.task(task_id)?;
        self.invoke_step(task, task.verify.as_deref(), "verify")
    }

    fn invoke_step(
        &self,
        task: &Task,
        reference: Option<&str>,
        action: &'static str,
    ) -> Result<(), ExecutionError> {
        let reference =
            reference.ok_or_else(|| ExecutionError::NotDeclared { task: task.id.clone(), action })?;
        let collaborator = self.collaborators.resolve(task, reference)?;
        info!(task = %task.id, action, "invoking collaborator");
        let invocation = Invocation { ctx: self.ctx, task, project_dir: &self.project_dir };
        collaborator
            .invoke(&invocation)
            .map_err(|message| ExecutionError::EntryPoint { task: task.id.clone(), message })
    }
}

fn transition(state: &mut RunState, next: RunState) {
    tracing::debug!(from = %state, to = %next, "run state");
    *state = next;
}

fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    (end - start).to_std().unwrap_or_default()
}

fn progress(outcomes: &[TaskOutcome], total: usize, elapsed: Duration) -> Option<Progress> {
    let latest = outcomes.last()?;
    let done = outcomes.len();
    let spent: Duration = outcomes.iter().map(|o| o.duration).sum();
    let average = spent / u32::try_from(done).unwrap_or(u32::MAX);
    let remaining = u32::try_from(total.saturating_sub(done)).unwrap_or(u32::MAX);
    Some(Progress { index: done, total, outcome: latest.clone(), elapsed, eta: average * remaining })
}

/// Formats a duration as `850ms`, `12.3s` or `4m 05s`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else if secs >= 1 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::PreflightError;
    use crate::manifest::Manifest;
    use crate::testing::{context, FakeShell, MemFs};

    const SCENARIO: &str = r#"{
        "tasks": {
            "git":      {"phase": 1, "category": "vcs", "entry": "sh:git init"},
            "packages": {"phase": 1, "category": "deps", "entry": "sh:npm init -y",
                         "requires": {"tasks": ["git"]}, "rollback": "sh:rm package.json",
                         "verify": "sh:test -f package.json"},
            "lint":     {"phase": 2, "category": "quality", "entry": "sh:npm i -D eslint",
                         "requires": {"tools": [{"name": "npm"}]}},
            "docker":   {"phase": 2, "category": "containers", "entry": "sh:docker init",
                         "requires": {"tools": [{"name": "docker", "version": "20"}]}},
            "ci":       {"phase": 3, "category": "ci", "entry": "sh:mkdir -p .github",
                         "requires": {"tasks": ["packages"]}, "optional": ["gh"]}
        },
        "profiles": {"web": {"tasks": ["git", "packages", "lint", "ci"]}}
    }"#;

    struct Fixture {
        fs: MemFs,
        shell: FakeShell,
        manifest: Manifest,
        tools: ToolRegistry,
        collaborators: CollaboratorRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let shell = FakeShell::new();
            shell.install("npm", "10.2.4");
            shell.install("docker", "Docker version 24.0.7");
            for command in ["git init", "npm init -y", "npm i -D eslint", "docker init", "mkdir -p .github", "rm package.json", "test -f package.json"] {
                shell.respond(command, 0, "");
            }
            Self {
                fs: MemFs::new(),
                shell,
                manifest: Manifest::from_source(Path::new("scaffold.json"), SCENARIO).unwrap(),
                tools: ToolRegistry::with_defaults(),
                collaborators: CollaboratorRegistry::new(),
            }
        }

        fn with<R>(&self, f: impl FnOnce(&Orchestrator<'_>, &CompletionTracker<'_>) -> R) -> R {
            self.with_cancel(CancelFlag::new(), None, f)
        }

        fn with_cancel<R>(
            &self,
            cancel: CancelFlag,
            observer: Option<&dyn ProgressObserver>,
            f: impl FnOnce(&Orchestrator<'_>, &CompletionTracker<'_>) -> R,
        ) -> R {
            let ctx = context(&self.fs, &self.shell);
            let tracker = CompletionTracker::new(&ctx, Path::new("/p/.scaffold"));
            let mut orchestrator = Orchestrator::new(
                &ctx,
                self.manifest.graph(),
                &self.tools,
                &self.collaborators,
                &tracker,
                Path::new("/p"),
            )
            .with_cancel(cancel);
            if let Some(observer) = observer {
                orchestrator = orchestrator.with_observer(observer);
            }
            f(&orchestrator, &tracker)
        }

        fn executed(&self) -> Vec<String> {
            self.shell.log().into_iter().filter(|c| !c.ends_with("--version")).collect()
        }
    }

    fn completed(result: RunResult) -> RunSummary {
        match result {
            RunResult::Completed(summary) => summary,
            other => panic!("expected a completed run, got {other:?}"),
        }
    }

    fn ids(summary: &RunSummary) -> Vec<&str> {
        summary.outcomes.iter().map(|o| o.task_id.as_str()).collect()
    }

    #[test]
    fn phase_one_runs_in_declaration_order_and_marks_completion() {
        let fx = Fixture::new();
        let summary = fx.with(|o, tracker| {
            let summary = completed(o.run(&Selector::Phase(1), &RunOptions::default()));
            assert!(tracker.is_complete("git").unwrap());
            assert!(tracker.is_complete("packages").unwrap());
            summary
        });
        assert_eq!(ids(&summary), ["git", "packages"]);
        assert_eq!((summary.run(), summary.failed(), summary.skipped_by_preflight()), (2, 0, 0));
        assert!(summary.success());
        assert_eq!(fx.executed(), ["git init", "npm init -y"]);
    }

    #[test]
    fn removing_git_marker_blocks_packages_alone() {
        let fx = Fixture::new();
        let result = fx.with(|o, tracker| {
            completed(o.run(&Selector::Phase(1), &RunOptions::default()));
            tracker.clear("git").unwrap();
            o.run(&Selector::SingleTask("packages".into()), &RunOptions::default())
        });
        let RunResult::PreflightFailed(report) = result else { panic!("expected preflight failure") };
        assert_eq!(
            report.errors().cloned().collect::<Vec<_>>(),
            [PreflightError::MissingPrerequisiteTask {
                task: "packages".into(),
                prerequisite: "git".into(),
                command: "scaffold run --task=git".into(),
            }]
        );
        assert_eq!(report.remediation(), ["scaffold run --task=git"]);
    }

    #[test]
    fn preflight_failure_on_third_task_executes_nothing() {
        let fx = Fixture::new();
        fx.shell.uninstall("npm");
        let result = fx.with(|o, tracker| {
            let result = o.run(&Selector::Profile("web".into()), &RunOptions::default());
            assert!(tracker.completed().unwrap().is_empty());
            result
        });
        let RunResult::PreflightFailed(report) = result else { panic!("expected preflight failure") };
        assert_eq!(report.reports.len(), 4);
        assert!(!report.reports[2].passed());
        assert_eq!(report.failing_tools(), ["npm"]);
        assert!(fx.executed().is_empty());
    }

    #[test]
    fn unknown_selector_and_collaborator_are_resolution_errors() {
        let fx = Fixture::new();
        let (phase, task) = fx.with(|o, _| {
            (
                o.run(&Selector::Phase(7), &RunOptions::default()),
                o.run(&Selector::SingleTask("nope".into()), &RunOptions::default()),
            )
        });
        assert_eq!(phase, RunResult::ResolutionError(ResolutionError::UnknownPhase(7)));
        assert_eq!(task, RunResult::ResolutionError(ResolutionError::UnknownTask("nope".into())));

        let mut fx = Fixture::new();
        fx.manifest = Manifest::from_source(
            Path::new("m.json"),
            r#"{"tasks": {"editor": {"phase": 1, "entry": "vscode-settings"}}}"#,
        )
        .unwrap();
        let result = fx.with(|o, _| o.run(&Selector::Phase(1), &RunOptions::default()));
        assert_eq!(
            result,
            RunResult::ResolutionError(ResolutionError::UnknownCollaborator {
                task: "editor".into(),
                reference: "vscode-settings".into(),
            })
        );
    }

    #[test]
    fn failures_are_recorded_and_the_run_continues() {
        let fx = Fixture::new();
        fx.shell.respond("npm init -y", 1, "");
        let summary = fx.with(|o, tracker| {
            let summary = completed(o.run(&Selector::Profile("web".into()), &RunOptions::default()));
            assert!(!tracker.is_complete("packages").unwrap());
            summary
        });
        assert_eq!(ids(&summary), ["git", "packages", "lint", "ci"]);
        assert_eq!((summary.run(), summary.failed(), summary.skipped_by_preflight()), (2, 1, 1));
        // ci's prerequisite failed, so re-validation skips it.
        assert!(summary.outcomes[3].skipped_by_preflight());
        assert!(!summary.success());
        assert!(!fx.executed().contains(&"mkdir -p .github".to_string()));
    }

    #[test]
    fn stop_on_first_failure_leaves_the_rest_unstarted() {
        let fx = Fixture::new();
        fx.shell.respond("git init", 128, "");
        let options = RunOptions { stop_on_first_failure: true, ..RunOptions::default() };
        let summary = completed(fx.with(|o, _| o.run(&Selector::Profile("web".into()), &options)));
        assert_eq!(ids(&summary), ["git"]);
        assert_eq!(summary.not_started, ["packages", "lint", "ci"]);
        assert!(!summary.interrupted);
        assert!(matches!(
            &summary.outcomes[0].status,
            TaskStatus::Failed(ExecutionError::EntryPoint { message, .. }) if message.contains("exited with 128")
        ));
    }

    #[test]
    fn dry_run_executes_nothing_and_writes_no_markers() {
        let fx = Fixture::new();
        let options = RunOptions { dry_run: true, ..RunOptions::default() };
        let summary = fx.with(|o, tracker| {
            let summary = completed(o.run(&Selector::Profile("web".into()), &options));
            assert!(tracker.completed().unwrap().is_empty());
            summary
        });
        assert!(summary.dry_run);
        assert!(summary.outcomes.iter().all(|o| o.status == TaskStatus::DryRun));
        assert_eq!(summary.run(), 4);
        assert!(fx.executed().is_empty());
        assert!(summary.to_string().contains("4 would run"));
    }

    #[test]
    fn skip_preflight_runs_despite_missing_tools() {
        let fx = Fixture::new();
        fx.shell.uninstall("docker");
        let options = RunOptions { skip_preflight: true, ..RunOptions::default() };
        let summary = completed(fx.with(|o, _| o.run(&Selector::SingleTask("docker".into()), &options)));
        assert_eq!(summary.run(), 1);
        assert_eq!(fx.executed(), ["docker init"]);
    }

    #[test]
    fn interrupt_stops_at_the_next_task_boundary() {
        let fx = Fixture::new();
        let cancel = CancelFlag::new();
        let seen = Mutex::new(Vec::new());
        let observer = |p: &Progress| {
            seen.lock().unwrap().push((p.index, p.total, p.outcome.task_id.clone()));
            cancel.cancel();
        };
        let summary = completed(fx.with_cancel(cancel.clone(), Some(&observer), |o, _| {
            o.run(&Selector::Profile("web".into()), &RunOptions::default())
        }));
        assert!(summary.interrupted);
        assert_eq!(ids(&summary), ["git"]);
        assert_eq!(summary.not_started, ["packages", "lint", "ci"]);
        assert_eq!(*seen.lock().unwrap(), [(1, 4, "git".to_string())]);
        assert!(summary.to_string().ends_with("(interrupted)"));
    }

    #[test]
    fn progress_reports_eta_from_running_average() {
        let fx = Fixture::new();
        let seen = Mutex::new(Vec::new());
        let observer = |p: &Progress| seen.lock().unwrap().push(p.clone());
        let options = RunOptions { dry_run: true, ..RunOptions::default() };
        fx.with_cancel(CancelFlag::new(), Some(&observer), |o, _| {
            o.run(&Selector::Profile("web".into()), &options)
        });

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.iter().map(|p| p.index).collect::<Vec<_>>(), [1, 2, 3, 4]);
        // Each dry-run task spans one clock step.
        assert_eq!(seen[0].outcome.duration, Duration::from_secs(1));
        assert_eq!(seen[0].eta, Duration::from_secs(3));
        assert_eq!(seen[3].eta, Duration::ZERO);
        assert!(seen.windows(2).all(|w| w[0].elapsed < w[1].elapsed));
    }

    #[test]
    fn optional_tool_warnings_reach_the_summary() {
        let fx = Fixture::new();
        let summary = fx.with(|o, tracker| {
            tracker.mark_complete("git").unwrap();
            tracker.mark_complete("packages").unwrap();
            completed(o.run(&Selector::Phase(3), &RunOptions::default()))
        });
        assert_eq!(
            summary.warnings,
            [PreflightWarning::MissingOptionalTool { task: "ci".into(), tool: "gh".into() }]
        );
        assert!(summary.to_string().contains("optional tool 'gh' not found"));
    }

    #[test]
    fn rollback_and_verify_use_declared_collaborators() {
        let fx = Fixture::new();
        fx.with(|o, tracker| {
            completed(o.run(&Selector::Phase(1), &RunOptions::default()));
            o.verify("packages").unwrap();
            assert!(o.rollback("packages").unwrap());
            assert!(!tracker.is_complete("packages").unwrap());
            assert!(tracker.is_complete("git").unwrap());

            assert_eq!(
                o.rollback("git").unwrap_err(),
                ExecutionError::NotDeclared { task: "git".into(), action: "rollback" }
            );
            assert!(matches!(
                o.verify("ghost").unwrap_err(),
                ExecutionError::Resolution(ResolutionError::UnknownTask(_))
            ));
        });
        assert!(fx.executed().ends_with(&["test -f package.json".to_string(), "rm package.json".to_string()]));
    }

    #[test]
    fn durations_format_compactly() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_millis(12_300)), "12.3s");
        assert_eq!(format_duration(Duration::from_secs(245)), "4m 05s");
    }
}
