//! Tool registry: how each tool's version is detected and how it is installed.
//!
//! Adding a tool is a registration, not a new branch: the registry maps a
//! tool name to a [`VersionStrategy`] and, optionally, an installer command.
//! Unregistered tools fall back to `<tool> --version`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::manifest::ToolSettings;
use crate::ports::ShellExecutor;
use crate::version::extract_version;

/// Detects the installed version of one tool.
pub trait VersionStrategy: Send + Sync {
    /// Returns the tool's dotted version string.
    ///
    /// # Errors
    ///
    /// Returns a message if the probe fails or prints no version.
    fn detect(&self, shell: &dyn ShellExecutor, tool: &str) -> Result<String, String>;
}

/// Runs `<tool> <flag>` and reads the version from stdout or stderr.
#[derive(Debug, Clone)]
pub struct FlagProbe {
    flag: String,
}

impl FlagProbe {
    /// Probe passing `flag` to the tool itself.
    #[must_use]
    pub fn new(flag: &str) -> Self {
        Self { flag: flag.to_string() }
    }
}

impl VersionStrategy for FlagProbe {
    fn detect(&self, shell: &dyn ShellExecutor, tool: &str) -> Result<String, String> {
        probe(shell, &format!("{tool} {}", self.flag))
    }
}

/// Runs a fixed command and reads the version from its output.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    command: String,
}

impl CommandProbe {
    /// Probe running `command` verbatim.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self { command: command.to_string() }
    }
}

impl VersionStrategy for CommandProbe {
    fn detect(&self, shell: &dyn ShellExecutor, _tool: &str) -> Result<String, String> {
        probe(shell, &self.command)
    }
}

fn probe(shell: &dyn ShellExecutor, command: &str) -> Result<String, String> {
    let output = shell.run(command, None).map_err(|e| format!("`{command}` could not run: {e}"))?;
    if !output.success() {
        return Err(format!("`{command}` exited with {}", output.exit_code));
    }
    // Some tools (java) print their version on stderr.
    extract_version(&output.combined())
        .ok_or_else(|| format!("no version number in output of `{command}`"))
}

/// Version strategies and installers by tool name.
#[derive(Clone)]
pub struct ToolRegistry {
    strategies: HashMap<String, Arc<dyn VersionStrategy>>,
    installers: BTreeMap<String, String>,
    fallback: Arc<dyn VersionStrategy>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ToolRegistry {
    /// A registry with no tool-specific entries.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
            installers: BTreeMap::new(),
            fallback: Arc::new(FlagProbe::new("--version")),
        }
    }

    /// A registry preloaded with common project tooling.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for tool in [
            "node", "npm", "npx", "pnpm", "yarn", "git", "docker", "python3", "pip3", "cargo",
            "rustc", "code", "make",
        ] {
            registry.register(tool, FlagProbe::new("--version"));
        }
        registry.register("java", FlagProbe::new("-version"));
        registry.register("go", FlagProbe::new("version"));
        registry.register("docker-compose", FlagProbe::new("version"));

        registry.register_installer("pnpm", "npm install -g pnpm");
        registry.register_installer("yarn", "npm install -g yarn");
        registry.register_installer("typescript", "npm install -g typescript");
        registry.register_installer("rustup", "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y");
        registry
    }

    /// Registers (or replaces) the version strategy for `tool`.
    pub fn register(&mut self, tool: &str, strategy: impl VersionStrategy + 'static) {
        self.strategies.insert(tool.to_string(), Arc::new(strategy));
    }

    /// Registers (or replaces) the installer command for `tool`.
    pub fn register_installer(&mut self, tool: &str, command: &str) {
        self.installers.insert(tool.to_string(), command.to_string());
    }

    /// Applies manifest-declared overrides on top of the registered entries.
    pub fn apply_overrides(&mut self, tools: &BTreeMap<String, ToolSettings>) {
        for (tool, settings) in tools {
            if let Some(command) = &settings.version_command {
                self.register(tool, CommandProbe::new(command));
            }
            if let Some(install) = &settings.install {
                self.register_installer(tool, install);
            }
        }
    }

    /// The strategy used to detect `tool`'s version.
    #[must_use]
    pub fn strategy(&self, tool: &str) -> &dyn VersionStrategy {
        self.strategies.get(tool).unwrap_or(&self.fallback).as_ref()
    }

    /// Detects `tool`'s version through its registered strategy.
    ///
    /// # Errors
    ///
    /// Returns the strategy's failure message.
    pub fn detect_version(&self, shell: &dyn ShellExecutor, tool: &str) -> Result<String, String> {
        self.strategy(tool).detect(shell, tool)
    }

    /// The installer command for `tool`, if one is known.
    #[must_use]
    pub fn installer(&self, tool: &str) -> Option<&str> {
        self.installers.get(tool).map(String::as_str)
    }

    /// Tools with a known installer, sorted.
    pub fn installable(&self) -> impl Iterator<Item = &str> {
        self.installers.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeShell;

    #[test]
    fn default_flag_probe_reads_stdout() {
        let shell = FakeShell::new();
        shell.install("git", "git version 2.43.0");
        let registry = ToolRegistry::with_defaults();
        assert_eq!(registry.detect_version(&shell, "git").unwrap(), "2.43.0");
        assert_eq!(shell.log(), ["git --version"]);
    }

    #[test]
    fn java_uses_single_dash_flag() {
        let shell = FakeShell::new();
        shell.respond("java -version", 0, "openjdk version \"21.0.2\" 2024-01-16");
        let registry = ToolRegistry::with_defaults();
        assert_eq!(registry.detect_version(&shell, "java").unwrap(), "21.0.2");
    }

    #[test]
    fn unregistered_tool_falls_back_to_version_flag() {
        let shell = FakeShell::new();
        shell.install("terraform", "Terraform v1.7.4");
        let registry = ToolRegistry::empty();
        assert_eq!(registry.detect_version(&shell, "terraform").unwrap(), "1.7.4");
    }

    #[test]
    fn failed_or_silent_probe_is_an_error() {
        let shell = FakeShell::new();
        shell.respond("node --version", 0, "no digits");
        let registry = ToolRegistry::with_defaults();
        assert!(registry.detect_version(&shell, "node").unwrap_err().contains("no version number"));
        assert!(registry.detect_version(&shell, "docker").unwrap_err().contains("exited with 127"));
    }

    #[test]
    fn manifest_overrides_replace_probe_and_installer() {
        let shell = FakeShell::new();
        shell.respond("deno eval 'console.log(Deno.version.deno)'", 0, "1.41.0");
        let mut registry = ToolRegistry::with_defaults();
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "deno".to_string(),
            ToolSettings {
                version_command: Some("deno eval 'console.log(Deno.version.deno)'".into()),
                install: Some("curl -fsSL https://deno.land/install.sh | sh".into()),
            },
        );
        registry.apply_overrides(&overrides);

        assert_eq!(registry.detect_version(&shell, "deno").unwrap(), "1.41.0");
        assert_eq!(registry.installer("deno"), Some("curl -fsSL https://deno.land/install.sh | sh"));
        assert!(registry.installable().any(|t| t == "pnpm"));
        assert!(registry.installer("git").is_none());
    }
}
