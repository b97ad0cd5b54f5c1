//! `scaffold reset` command.

use crate::config::Settings;
use crate::context::ServiceContext;

use super::{Exit, Workspace};

/// Execute the `reset` command: clear one task's completion marker.
///
/// Dependent tasks keep their markers.
///
/// # Errors
///
/// Returns an error string if the task is unknown or the marker cannot be
/// removed.
pub fn run(ctx: &ServiceContext, settings: &Settings, task_id: &str) -> Result<Exit, String> {
    let workspace = Workspace::open(ctx, settings)?;
    workspace.manifest.graph().task(task_id).map_err(|e| e.to_string())?;
    if workspace.tracker.clear(task_id).map_err(|e| e.to_string())? {
        println!("Cleared completion marker for '{task_id}'.");
    } else {
        println!("'{task_id}' was not marked complete.");
    }
    Ok(Exit::Success)
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::testing::{context, settings, FakeShell, MemFs};
    use crate::tracker::CompletionTracker;

    #[test]
    fn clears_only_the_named_task() {
        let fs = MemFs::new();
        fs.put(
            "/app/scaffold.json",
            r#"{"tasks": {"git": {"phase": 1}, "packages": {"phase": 1, "requires": {"tasks": ["git"]}}}}"#,
            SystemTime::UNIX_EPOCH,
        );
        let shell = FakeShell::new();
        let ctx = context(&fs, &shell);
        let settings = settings();
        let tracker = CompletionTracker::new(&ctx, &settings.state_dir);
        tracker.mark_complete("git").unwrap();
        tracker.mark_complete("packages").unwrap();

        assert_eq!(run(&ctx, &settings, "git").unwrap(), Exit::Success);
        assert!(!tracker.is_complete("git").unwrap());
        assert!(tracker.is_complete("packages").unwrap());
        assert!(run(&ctx, &settings, "nope").unwrap_err().contains("nope"));
    }
}
