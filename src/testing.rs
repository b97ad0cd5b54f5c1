//! In-memory port fakes shared by unit tests.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, TimeZone, Utc};

use crate::context::ServiceContext;
use crate::ports::{Clock, FileSystem, PortError, ShellExecutor, ShellOutput};

/// In-memory filesystem with explicit modification times.
#[derive(Clone, Default)]
pub struct MemFs {
    files: Arc<Mutex<BTreeMap<PathBuf, (String, SystemTime)>>>,
    reads: Arc<Mutex<usize>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets contents, stamping the file with `modified`.
    pub fn put(&self, path: impl Into<PathBuf>, contents: &str, modified: SystemTime) {
        self.files.lock().unwrap().insert(path.into(), (contents.to_string(), modified));
    }

    /// Bumps a file's modification time without changing its contents.
    pub fn touch(&self, path: &Path, modified: SystemTime) {
        if let Some(entry) = self.files.lock().unwrap().get_mut(path) {
            entry.1 = modified;
        }
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.lock().unwrap().get(path).map(|(c, _)| c.clone())
    }

    /// Number of `read_to_string` calls served so far.
    pub fn reads(&self) -> usize {
        *self.reads.lock().unwrap()
    }
}

impl FileSystem for MemFs {
    fn read_to_string(&self, path: &Path) -> Result<String, PortError> {
        *self.reads.lock().unwrap() += 1;
        self.contents(path).ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError> {
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1);
        self.put(path, contents, stamp);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path) || files.keys().any(|k| k.starts_with(path) && k != path)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, PortError> {
        let files = self.files.lock().unwrap();
        Ok(files
            .keys()
            .filter(|k| k.parent() == Some(path))
            .filter_map(|k| k.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect())
    }

    fn modified(&self, path: &Path) -> Result<SystemTime, PortError> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|(_, m)| *m)
            .ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn remove(&self, path: &Path) -> Result<bool, PortError> {
        Ok(self.files.lock().unwrap().remove(path).is_some())
    }
}

/// Clock that advances by a fixed step on every reading.
#[derive(Clone)]
pub struct StepClock {
    next: Arc<Mutex<DateTime<Utc>>>,
    step: chrono::Duration,
}

impl StepClock {
    pub fn new(step_secs: i64) -> Self {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Self { next: Arc::new(Mutex::new(start)), step: chrono::Duration::seconds(step_secs) }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap();
        let current = *next;
        *next = current + self.step;
        current
    }
}

/// Scriptable shell: installed tools, canned command outputs, call log.
#[derive(Clone, Default)]
pub struct FakeShell {
    tools: Arc<Mutex<HashMap<String, String>>>,
    commands: Arc<Mutex<HashMap<String, ShellOutput>>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `tool` on the fake `PATH`, answering `<tool> --version` with `version_output`.
    pub fn install(&self, tool: &str, version_output: &str) -> &Self {
        self.tools.lock().unwrap().insert(tool.to_string(), version_output.to_string());
        self
    }

    pub fn uninstall(&self, tool: &str) {
        self.tools.lock().unwrap().remove(tool);
    }

    /// Answers `command` with the given exit code and stdout.
    pub fn respond(&self, command: &str, exit_code: i32, stdout: &str) -> &Self {
        self.commands.lock().unwrap().insert(
            command.to_string(),
            ShellOutput { exit_code, stdout: stdout.to_string(), stderr: String::new() },
        );
        self
    }

    /// Commands run so far, in order.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl ShellExecutor for FakeShell {
    fn run(&self, command: &str, _cwd: Option<&Path>) -> Result<ShellOutput, PortError> {
        self.log.lock().unwrap().push(command.to_string());
        if let Some(output) = self.commands.lock().unwrap().get(command) {
            return Ok(output.clone());
        }
        let tools = self.tools.lock().unwrap();
        if let Some(version) = tools
            .iter()
            .find(|(tool, _)| command.starts_with(&format!("{tool} ")))
            .map(|(_, version)| version)
        {
            return Ok(ShellOutput {
                exit_code: 0,
                stdout: format!("{version}\n"),
                stderr: String::new(),
            });
        }
        Ok(ShellOutput {
            exit_code: 127,
            stdout: String::new(),
            stderr: format!("sh: {command}: not found"),
        })
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.tools
            .lock()
            .unwrap()
            .contains_key(program)
            .then(|| PathBuf::from(format!("/usr/bin/{program}")))
    }
}

/// A context over the given fakes.
pub fn context(fs: &MemFs, shell: &FakeShell) -> ServiceContext {
    ServiceContext::from_ports(
        Box::new(StepClock::new(1)),
        Box::new(fs.clone()),
        Box::new(shell.clone()),
    )
}

/// Settings for a project at `/app` with default paths.
pub fn settings() -> crate::config::Settings {
    crate::config::Settings {
        project_dir: PathBuf::from("/app"),
        manifest: PathBuf::from("/app/scaffold.json"),
        state_dir: PathBuf::from("/app/.scaffold"),
        cache_dir: None,
    }
}
