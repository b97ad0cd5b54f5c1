//! `scaffold check` command.

use std::fmt::Write as _;

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::graph::Selector;
use crate::tools::ToolRegistry;
use crate::validator::{BatchReport, PreconditionValidator};

use super::{Exit, Workspace};

/// Execute the `check` command: preflight only, nothing runs.
///
/// # Errors
///
/// Returns an error string if the manifest cannot be loaded or the selector
/// does not resolve.
pub fn run(ctx: &ServiceContext, settings: &Settings, selector: &Selector) -> Result<Exit, String> {
    let workspace = Workspace::open(ctx, settings)?;
    let graph = workspace.manifest.graph();
    let tasks = graph.resolve(selector).map_err(|e| format!("Cannot check {selector}: {e}"))?;

    let validator = PreconditionValidator::new(ctx, graph, &workspace.tools, &workspace.tracker);
    let report = validator.validate_batch(&tasks);
    println!("{}", render_report(&report, &workspace.tools));
    Ok(if report.passed() { Exit::Success } else { Exit::Failure })
}

/// Formats a preflight report: errors, warnings, then what to do about them.
#[must_use]
pub fn render_report(report: &BatchReport, tools: &ToolRegistry) -> String {
    let mut out = String::new();
    let total = report.reports.len();
    let blocked = report.reports.iter().filter(|r| !r.passed()).count();

    if blocked == 0 {
        let _ = write!(out, "Preflight passed for {total} task(s).");
    } else {
        let _ = write!(out, "Preflight failed for {blocked} of {total} task(s):");
        for error in report.errors() {
            let _ = write!(out, "\n  error: {error}");
        }
    }
    for warning in report.warnings() {
        let _ = write!(out, "\n  warning: {warning}");
    }

    let remediation = report.remediation();
    if !remediation.is_empty() {
        out.push_str("\n\nRun these first, in this order:");
        for command in remediation {
            let _ = write!(out, "\n  {command}");
        }
    }

    let installable: Vec<String> =
        report.failing_tools().into_iter().filter(|tool| tools.installer(tool).is_some()).collect();
    if !installable.is_empty() {
        out.push_str("\n\nThese tools can be installed automatically:");
        for tool in installable {
            let _ = write!(out, "\n  scaffold install {tool} --yes");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreflightError;
    use crate::validator::{PreflightWarning, TaskReport};

    fn report(task_id: &str, errors: Vec<PreflightError>, remediation: &[&str]) -> TaskReport {
        TaskReport {
            task_id: task_id.into(),
            errors,
            warnings: Vec::new(),
            probes: Vec::new(),
            remediation: remediation.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn passing_report_is_one_line() {
        let batch = BatchReport { reports: vec![report("git", vec![], &[])] };
        assert_eq!(render_report(&batch, &ToolRegistry::with_defaults()), "Preflight passed for 1 task(s).");
    }

    #[test]
    fn failing_report_lists_errors_remediation_and_installers() {
        let mut packages = report(
            "packages",
            vec![
                PreflightError::MissingTool { task: "packages".into(), tool: "pnpm".into() },
                PreflightError::MissingPrerequisiteTask {
                    task: "packages".into(),
                    prerequisite: "git".into(),
                    command: "scaffold run --task=git".into(),
                },
            ],
            &["scaffold run --task=git"],
        );
        packages.warnings.push(PreflightWarning::MissingOptionalTool {
            task: "packages".into(),
            tool: "gh".into(),
        });
        let batch = BatchReport { reports: vec![report("editor", vec![], &[]), packages] };

        let text = render_report(&batch, &ToolRegistry::with_defaults());
        assert!(text.starts_with("Preflight failed for 1 of 2 task(s):"));
        assert!(text.contains("error: task 'packages': required tool 'pnpm' not found"));
        assert!(text.contains("warning: task 'packages': optional tool 'gh' not found"));
        assert!(text.contains("Run these first, in this order:\n  scaffold run --task=git"));
        assert!(text.ends_with("scaffold install pnpm --yes"));
    }
}
