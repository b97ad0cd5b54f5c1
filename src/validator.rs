//! Precondition validator: tool presence, tool versions and prerequisite tasks.
//!
//! For each task:
//!
//! 1. Optional tools are located; absence is a warning.
//! 2. Required tools are probed, one worker per distinct tool, and every
//!    declared requirement is evaluated against its tool's probe in order.
//! 3. Prerequisite tasks are checked against the completion tracker,
//!    sequentially and in declared order.
//!
//! [`PreconditionValidator::validate_batch`] reports on every task before
//! anything runs. Installing missing tools is a separate, explicit call to
//! [`PreconditionValidator::remediate`].

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::context::ServiceContext;
use crate::error::{PreflightError, RemediationError};
use crate::graph::{run_command, TaskGraph};
use crate::manifest::{Task, ToolRequirement};
use crate::tools::ToolRegistry;
use crate::tracker::CompletionTracker;
use crate::version;

/// A non-blocking precondition finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightWarning {
    /// An optional tool is not on `PATH`.
    MissingOptionalTool {
        /// Task id.
        task: String,
        /// Tool name.
        tool: String,
    },
}

impl fmt::Display for PreflightWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOptionalTool { task, tool } => {
                write!(f, "task '{task}': optional tool '{tool}' not found")
            }
        }
    }
}

/// What one probe worker found out about a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolProbe {
    /// Tool name.
    pub tool: String,
    /// Where the tool was found, if anywhere.
    pub path: Option<PathBuf>,
    /// Detected version, when a constraint needed one.
    pub version: Option<Result<String, String>>,
}

impl ToolProbe {
    /// Whether the tool is on `PATH`.
    #[must_use]
    pub fn present(&self) -> bool {
        self.path.is_some()
    }
}

/// How required-tool probes are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProbeMode {
    /// One worker thread per distinct tool.
    #[default]
    Parallel,
    /// One tool after another on the calling thread.
    Sequential,
}

/// Preconditions of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    /// Task id.
    pub task_id: String,
    /// Blocking findings, tool checks first, then prerequisites.
    pub errors: Vec<PreflightError>,
    /// Non-blocking findings.
    pub warnings: Vec<PreflightWarning>,
    /// Required-tool probes in declared order.
    pub probes: Vec<ToolProbe>,
    /// Commands completing the missing prerequisites, dependencies first.
    pub remediation: Vec<String>,
}

impl TaskReport {
    /// Whether the task may run.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Preconditions of an ordered task list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// One report per task, in run order.
    pub reports: Vec<TaskReport>,
}

impl BatchReport {
    /// Whether every task may run.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.reports.iter().all(TaskReport::passed)
    }

    /// All blocking findings in run order.
    pub fn errors(&self) -> impl Iterator<Item = &PreflightError> {
        self.reports.iter().flat_map(|r| r.errors.iter())
    }

    /// All warnings in run order.
    pub fn warnings(&self) -> impl Iterator<Item = &PreflightWarning> {
        self.reports.iter().flat_map(|r| r.warnings.iter())
    }

    /// Commands to run first, in order, without duplicates.
    #[must_use]
    pub fn remediation(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.reports
            .iter()
            .flat_map(|r| r.remediation.iter())
            .filter(|command| seen.insert(command.as_str()))
            .cloned()
            .collect()
    }

    /// Names of failing tools, first occurrence order.
    #[must_use]
    pub fn failing_tools(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.errors()
            .filter_map(PreflightError::tool)
            .filter(|tool| seen.insert(*tool))
            .map(str::to_string)
            .collect()
    }
}

/// Checks task preconditions against the machine and the tracker.
pub struct PreconditionValidator<'a> {
    ctx: &'a ServiceContext,
    graph: &'a TaskGraph,
    tools: &'a ToolRegistry,
    tracker: &'a CompletionTracker<'a>,
    mode: ProbeMode,
}

impl<'a> PreconditionValidator<'a> {
    /// Creates a validator probing in parallel.
    #[must_use]
    pub fn new(
        ctx: &'a ServiceContext,
        graph: &'a TaskGraph,
        tools: &'a ToolRegistry,
        tracker: &'a CompletionTracker<'a>,
    ) -> Self {
        Self { ctx, graph, tools, tracker, mode: ProbeMode::Parallel }
    }

    /// Switches probe scheduling.
    #[must_use]
    pub fn with_mode(mut self, mode: ProbeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validates one task on its own.
    #[must_use]
    pub fn validate_one(&self, task: &Task) -> TaskReport {
        self.validate(task, &HashSet::new())
    }

    /// Validates every task of an ordered run before any of it executes.
    ///
    /// A prerequisite scheduled earlier in the same list counts as satisfied,
    /// since it will have completed by the time its dependent runs.
    #[must_use]
    pub fn validate_batch(&self, tasks: &[&Task]) -> BatchReport {
        let mut planned: HashSet<&str> = HashSet::new();
        let mut reports = Vec::with_capacity(tasks.len());
        for task in tasks {
            reports.push(self.validate(task, &planned));
            planned.insert(task.id.as_str());
        }
        BatchReport { reports }
    }

    fn validate(&self, task: &Task, planned: &HashSet<&str>) -> TaskReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for tool in &task.optional_tools {
            if self.ctx.shell.locate(tool).is_none() {
                warnings.push(PreflightWarning::MissingOptionalTool {
                    task: task.id.clone(),
                    tool: tool.clone(),
                });
            }
        }

        let probes = self.probe_all(&task.required_tools);
        let mut reported_missing = HashSet::new();
        for requirement in &task.required_tools {
            let Some(probe) = probes.iter().find(|p| p.tool == requirement.name) else { continue };
            if !probe.present() {
                if reported_missing.insert(requirement.name.as_str()) {
                    errors.push(PreflightError::MissingTool {
                        task: task.id.clone(),
                        tool: requirement.name.clone(),
                    });
                }
                continue;
            }
            if let Some(error) = evaluate(&task.id, requirement, probe) {
                errors.push(error);
            }
        }

        let mut missing = Vec::new();
        for prerequisite in &task.required_tasks {
            if planned.contains(prerequisite.as_str()) {
                continue;
            }
            match self.tracker.is_complete(prerequisite) {
                Ok(true) => {}
                Ok(false) => {
                    errors.push(PreflightError::MissingPrerequisiteTask {
                        task: task.id.clone(),
                        prerequisite: prerequisite.clone(),
                        command: run_command(prerequisite),
                    });
                    missing.push(prerequisite.as_str());
                }
                Err(source) => {
                    errors.push(PreflightError::TrackerUnavailable { task: task.id.clone(), source });
                }
            }
        }
        let remediation = self
            .graph
            .remediation_order(&missing, |id| {
                !planned.contains(id) && !self.tracker.is_complete(id).unwrap_or(false)
            })
            .into_iter()
            .map(|t| run_command(&t.id))
            .collect();

        debug!(task = %task.id, errors = errors.len(), warnings = warnings.len(), "preconditions checked");
        TaskReport { task_id: task.id.clone(), errors, warnings, probes, remediation }
    }

    /// Probes each distinct required tool once, results in declared order.
    fn probe_all(&self, requirements: &[ToolRequirement]) -> Vec<ToolProbe> {
        let mut distinct: Vec<(&str, bool)> = Vec::new();
        for requirement in requirements {
            let needs_version = requirement.version.is_some();
            match distinct.iter_mut().find(|(name, _)| *name == requirement.name) {
                Some(entry) => entry.1 |= needs_version,
                None => distinct.push((requirement.name.as_str(), needs_version)),
            }
        }

        if self.mode == ProbeMode::Sequential || distinct.len() < 2 {
            return distinct.iter().map(|(tool, v)| self.probe(tool, *v)).collect();
        }
        match rayon::ThreadPoolBuilder::new().num_threads(distinct.len()).build() {
            // `collect` on an indexed parallel iterator keeps input order.
            Ok(pool) => {
                pool.install(|| {
                    distinct.par_iter().map(|(tool, v)| self.probe(tool, *v)).collect::<Vec<_>>()
                })
            }
            Err(e) => {
                warn!(error = %e, "probe pool unavailable; probing sequentially");
                distinct.iter().map(|(tool, v)| self.probe(tool, *v)).collect()
            }
        }
    }

    fn probe(&self, tool: &str, needs_version: bool) -> ToolProbe {
        let path = self.ctx.shell.locate(tool);
        let version = (path.is_some() && needs_version)
            .then(|| self.tools.detect_version(self.ctx.shell.as_ref(), tool));
        debug!(tool, found = path.is_some(), version = ?version, "tool probed");
        ToolProbe { tool: tool.to_string(), path, version }
    }

    /// Installs `requirement`'s tool with its known installer, then re-checks
    /// just that tool.
    ///
    /// Only call this with the user's consent.
    ///
    /// # Errors
    ///
    /// Returns [`RemediationError::NoInstaller`] if no installer is known, or
    /// [`RemediationError::InstallerFailed`] if it could not run or exited
    /// non-zero.
    pub fn remediate(&self, requirement: &ToolRequirement) -> Result<ToolProbe, RemediationError> {
        let tool = &requirement.name;
        let command = self
            .tools
            .installer(tool)
            .ok_or_else(|| RemediationError::NoInstaller(tool.clone()))?;
        tracing::info!(tool = %tool, command, "installing tool");

        let failed = |message: String| RemediationError::InstallerFailed {
            tool: tool.clone(),
            command: command.to_string(),
            message,
        };
        let output = self.ctx.shell.run(command, None).map_err(|e| failed(e.to_string()))?;
        if !output.success() {
            return Err(failed(format!("exit code {}: {}", output.exit_code, output.stderr.trim())));
        }
        Ok(self.probe(tool, requirement.version.is_some()))
    }

    /// Whether a probe satisfies `requirement`.
    #[must_use]
    pub fn satisfied(requirement: &ToolRequirement, probe: &ToolProbe) -> bool {
        probe.present() && evaluate("", requirement, probe).is_none()
    }
}

fn evaluate(task_id: &str, requirement: &ToolRequirement, probe: &ToolProbe) -> Option<PreflightError> {
    let expected = requirement.version.as_ref()?;
    match probe.version.as_ref()? {
        Ok(actual) if version::satisfies(actual, expected, requirement.comparator) => None,
        Ok(actual) => Some(PreflightError::VersionMismatch {
            task: task_id.to_string(),
            tool: requirement.name.clone(),
            comparator: requirement.comparator,
            expected: expected.clone(),
            actual: actual.clone(),
        }),
        Err(message) => Some(PreflightError::VersionUndetermined {
            task: task_id.to_string(),
            tool: requirement.name.clone(),
            comparator: requirement.comparator,
            expected: expected.clone(),
            message: message.clone(),
        }),
    }
}
