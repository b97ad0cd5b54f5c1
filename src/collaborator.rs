//! Task collaborators: the code that actually performs a task.
//!
//! A task's entry point, rollback and verify fields are collaborator
//! references. `sh:<command>` runs `<command>` in the project directory
//! through the shell port. Any other reference names a collaborator
//! registered in the [`CollaboratorRegistry`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::context::ServiceContext;
use crate::error::ResolutionError;
use crate::manifest::Task;

const SHELL_PREFIX: &str = "sh:";

/// Everything a collaborator gets to see for one call.
pub struct Invocation<'a> {
    /// Ports to act through.
    pub ctx: &'a ServiceContext,
    /// The task being performed.
    pub task: &'a Task,
    /// Project directory the task operates on.
    pub project_dir: &'a Path,
}

/// Performs, undoes or checks a task.
pub trait TaskCollaborator: Send + Sync {
    /// Runs the collaborator.
    ///
    /// # Errors
    ///
    /// Returns a human-readable failure message.
    fn invoke(&self, invocation: &Invocation<'_>) -> Result<(), String>;
}

/// Runs a shell command in the project directory.
#[derive(Debug, Clone)]
pub struct ShellCollaborator {
    command: String,
}

impl ShellCollaborator {
    /// Collaborator running `command`.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self { command: command.to_string() }
    }
}

impl TaskCollaborator for ShellCollaborator {
    fn invoke(&self, invocation: &Invocation<'_>) -> Result<(), String> {
        let output = invocation
            .ctx
            .shell
            .run(&self.command, Some(invocation.project_dir))
            .map_err(|e| format!("`{}` could not run: {e}", self.command))?;
        tracing::debug!(
            task = %invocation.task.id,
            command = %self.command,
            exit_code = output.exit_code,
            stdout = %output.stdout.trim_end(),
            "shell collaborator finished"
        );
        if output.success() {
            return Ok(());
        }
        let detail = output.stderr.trim();
        if detail.is_empty() {
            Err(format!("`{}` exited with {}", self.command, output.exit_code))
        } else {
            Err(format!("`{}` exited with {}: {detail}", self.command, output.exit_code))
        }
    }
}

/// Named collaborators plus built-in `sh:` handling.
#[derive(Clone, Default)]
pub struct CollaboratorRegistry {
    registered: HashMap<String, Arc<dyn TaskCollaborator>>,
}

impl CollaboratorRegistry {
    /// An empty registry; only `sh:` references resolve.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the collaborator for `reference`.
    pub fn register(&mut self, reference: &str, collaborator: impl TaskCollaborator + 'static) {
        self.registered.insert(reference.to_string(), Arc::new(collaborator));
    }

    /// Whether `reference` would resolve.
    #[must_use]
    pub fn contains(&self, reference: &str) -> bool {
        reference.starts_with(SHELL_PREFIX) || self.registered.contains_key(reference)
    }

    /// Resolves `task`'s `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::UnknownCollaborator`] if nothing is
    /// registered under `reference`.
    pub fn resolve(
        &self,
        task: &Task,
        reference: &str,
    ) -> Result<Arc<dyn TaskCollaborator>, ResolutionError> {
        if let Some(command) = reference.strip_prefix(SHELL_PREFIX) {
            return Ok(Arc::new(ShellCollaborator::new(command.trim())));
        }
        self.registered.get(reference).cloned().ok_or_else(|| ResolutionError::UnknownCollaborator {
            task: task.id.clone(),
            reference: reference.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::manifest::Manifest;
    use crate::testing::{context, FakeShell, MemFs};

    struct Counting(Mutex<usize>);

    impl TaskCollaborator for Counting {
        fn invoke(&self, _invocation: &Invocation<'_>) -> Result<(), String> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn task() -> Task {
        Manifest::from_source(Path::new("m.json"), r#"{"tasks": {"git": {"phase": 1}}}"#)
            .unwrap()
            .graph()
            .task("git")
            .unwrap()
            .clone()
    }

    #[test]
    fn shell_reference_runs_in_project_dir() {
        let shell = FakeShell::new();
        shell.respond("git init", 0, "Initialized empty Git repository");
        let ctx = context(&MemFs::new(), &shell);
        let task = task();
        let registry = CollaboratorRegistry::new();

        let collaborator = registry.resolve(&task, "sh: git init").unwrap();
        let invocation = Invocation { ctx: &ctx, task: &task, project_dir: Path::new("/p") };
        collaborator.invoke(&invocation).unwrap();
        assert_eq!(shell.log(), ["git init"]);
    }

    #[test]
    fn failing_shell_command_reports_exit_code() {
        let shell = FakeShell::new();
        let ctx = context(&MemFs::new(), &shell);
        let task = task();
        let invocation = Invocation { ctx: &ctx, task: &task, project_dir: Path::new("/p") };
        let err = ShellCollaborator::new("make setup").invoke(&invocation).unwrap_err();
        assert!(err.starts_with("`make setup` exited with 127"), "{err}");
    }

    #[test]
    fn registered_reference_resolves_and_unknown_fails() {
        let mut registry = CollaboratorRegistry::new();
        registry.register("git", Counting(Mutex::new(0)));
        let task = task();

        assert!(registry.contains("git"));
        assert!(registry.contains("sh:true"));
        assert!(registry.resolve(&task, "git").is_ok());
        assert_eq!(
            registry.resolve(&task, "editor").err(),
            Some(ResolutionError::UnknownCollaborator { task: "git".into(), reference: "editor".into() })
        );
    }
}
