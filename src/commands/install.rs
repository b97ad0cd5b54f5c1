//! `scaffold install` command.

use crate::config::Settings;
use crate::context::ServiceContext;
use crate::manifest::ToolRequirement;
use crate::validator::PreconditionValidator;
use crate::version::Comparator;

use super::{Exit, Workspace};

/// Execute the `install` command.
///
/// Runs the tool's installer only when `confirmed`, then re-probes the tool
/// against `version` as a minimum. Works without a manifest; one that exists
/// can override installers.
///
/// # Errors
///
/// Returns an error string if no installer is known or it fails.
pub fn run(
    ctx: &ServiceContext,
    settings: &Settings,
    tool: &str,
    version: Option<&str>,
    confirmed: bool,
) -> Result<Exit, String> {
    let workspace = Workspace::open_optional(ctx, settings)?;
    let Some(command) = workspace.tools.installer(tool) else {
        let known: Vec<&str> = workspace.tools.installable().collect();
        return Err(format!("No installer known for '{tool}'. Known: {}", known.join(", ")));
    };
    if !confirmed {
        println!("Would run `{command}`. Re-run with --yes to install '{tool}'.");
        return Ok(Exit::Failure);
    }

    let validator = PreconditionValidator::new(
        ctx,
        workspace.manifest.graph(),
        &workspace.tools,
        &workspace.tracker,
    );
    let requirement = ToolRequirement {
        name: tool.to_string(),
        version: version.map(str::to_string),
        comparator: Comparator::Min,
    };
    let probe = validator.remediate(&requirement).map_err(|e| e.to_string())?;

    if PreconditionValidator::satisfied(&requirement, &probe) {
        match &probe.version {
            Some(Ok(found)) => println!("Installed '{tool}' ({found})."),
            _ => println!("Installed '{tool}'."),
        }
        Ok(Exit::Success)
    } else if !probe.present() {
        println!("`{command}` succeeded but '{tool}' is still not on PATH.");
        Ok(Exit::Failure)
    } else {
        let found = match &probe.version {
            Some(Ok(found)) => found.clone(),
            Some(Err(message)) => message.clone(),
            None => "unknown".to_string(),
        };
        println!("'{tool}' is installed but does not satisfy >= {}: {found}", version.unwrap_or(""));
        Ok(Exit::Failure)
    }
}
