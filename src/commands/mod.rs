//! Command dispatch and handlers.

pub mod check;
pub mod install;
pub mod list;
pub mod reset;
pub mod run;
pub mod status;
pub mod steps;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cassette::session::RecordingSession;
use crate::cli::{Cli, Command};
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::manifest::{Manifest, ManifestStore};
use crate::orchestrator::{RunOptions, RunSummary, EXIT_INTERRUPTED};
use crate::tools::ToolRegistry;
use crate::tracker::CompletionTracker;

/// How a command ended, as a process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Everything succeeded.
    Success,
    /// Nothing was executed: bad manifest, selector or preconditions.
    Failure,
    /// Execution started and at least one task failed or was skipped.
    TasksFailed,
    /// Interrupted with no task failures.
    Interrupted,
}

impl Exit {
    /// The process exit code.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::TasksFailed => 2,
            Self::Interrupted => EXIT_INTERRUPTED,
        }
    }

    /// Exit status for a run that reached execution.
    #[must_use]
    pub fn for_summary(summary: &RunSummary) -> Self {
        if summary.failed() > 0 || summary.skipped_by_preflight() > 0 {
            Self::TasksFailed
        } else if summary.interrupted {
            Self::Interrupted
        } else {
            Self::Success
        }
    }
}

/// What most commands need: the manifest, tool registry and tracker.
pub(crate) struct Workspace<'a> {
    pub manifest: Arc<Manifest>,
    pub tools: ToolRegistry,
    pub tracker: CompletionTracker<'a>,
}

impl<'a> Workspace<'a> {
    /// Loads the manifest named by `settings`.
    pub fn open(ctx: &'a ServiceContext, settings: &Settings) -> Result<Self, String> {
        let mut store = ManifestStore::new(ctx);
        if let Some(dir) = &settings.cache_dir {
            store = store.with_cache_dir(dir);
        }
        let manifest = store.load(&settings.manifest).map_err(|e| e.to_string())?;
        Ok(Self::with_manifest(ctx, settings, manifest))
    }

    /// Like [`open`](Self::open), but an absent manifest yields an empty one.
    pub fn open_optional(ctx: &'a ServiceContext, settings: &Settings) -> Result<Self, String> {
        if ctx.fs.exists(&settings.manifest) {
            return Self::open(ctx, settings);
        }
        let empty = Manifest::from_document(crate::manifest::ManifestDocument::default(), None)
            .map_err(|e| e.to_string())?;
        Ok(Self::with_manifest(ctx, settings, Arc::new(empty)))
    }

    fn with_manifest(ctx: &'a ServiceContext, settings: &Settings, manifest: Arc<Manifest>) -> Self {
        let mut tools = ToolRegistry::with_defaults();
        tools.apply_overrides(manifest.tools());
        Self { manifest, tools, tracker: CompletionTracker::new(ctx, &settings.state_dir) }
    }
}

/// Dispatch a parsed command to its handler.
///
/// When `SCAFFOLD_RECORD` is set to a directory path, all port interactions
/// are recorded to per-port cassette files in that directory.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(cli: &Cli) -> Result<Exit, String> {
    let (ctx, session) = if let Ok(path) = env::var("SCAFFOLD_RECORD") {
        let (ctx, session) = ServiceContext::recording_at(&PathBuf::from(path))?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(), None)
    };

    let result = dispatch_with_context(cli, &ctx);

    // Finish recording after command completes (even on error)
    if let Some(session) = session {
        // Drop context first to release Arc references
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if settings are invalid or the handler fails.
pub fn dispatch_with_context(cli: &Cli, ctx: &ServiceContext) -> Result<Exit, String> {
    let settings = Settings::resolve(&cli.global, ctx.fs.as_ref()).map_err(|e| e.to_string())?;
    match &cli.command {
        Command::Run { selector, dry_run, skip_preflight, stop_on_first_failure } => {
            let options = RunOptions {
                dry_run: *dry_run,
                skip_preflight: *skip_preflight,
                stop_on_first_failure: *stop_on_first_failure,
            };
            run::run(ctx, &settings, &selector.selector(), &options)
        }
        Command::Check { selector } => check::run(ctx, &settings, &selector.selector()),
        Command::List => list::run(ctx, &settings),
        Command::Status => status::run(ctx, &settings),
        Command::Reset { task } => reset::run(ctx, &settings, task),
        Command::Rollback { task } => steps::rollback(ctx, &settings, task),
        Command::Verify { task } => steps::verify(ctx, &settings, task),
        Command::Install { tool, version, yes } => {
            install::run(ctx, &settings, tool, version.as_deref(), *yes)
        }
    }
}

/// Finish a recording session and print the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}
