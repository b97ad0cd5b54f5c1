//! Service context bundling all port trait objects.

use std::path::Path;

use crate::adapters::live::{LiveClock, LiveFileSystem, LiveShellExecutor};
use crate::adapters::recording::{RecordingClock, RecordingFileSystem, RecordingShellExecutor};
use crate::adapters::replaying::{ReplayingClock, ReplayingFileSystem, ReplayingShellExecutor};
use crate::cassette::format::Cassette;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::session::RecordingSession;
use crate::ports::{Clock, FileSystem, ShellExecutor};

/// Bundles all port trait objects into a single context.
///
/// Constructors wire up different adapter implementations (live, recording,
/// replaying). Everything above the adapters only ever sees this struct.
pub struct ServiceContext {
    /// Clock for timestamps and run timing.
    pub clock: Box<dyn Clock>,
    /// Filesystem for manifest, cache and marker I/O.
    pub fs: Box<dyn FileSystem>,
    /// Shell executor for tool probes, installers and task entry points.
    pub shell: Box<dyn ShellExecutor>,
}

impl ServiceContext {
    /// Creates a context from explicit port implementations.
    #[must_use]
    pub fn from_ports(
        clock: Box<dyn Clock>,
        fs: Box<dyn FileSystem>,
        shell: Box<dyn ShellExecutor>,
    ) -> Self {
        Self { clock, fs, shell }
    }

    /// Creates a live context backed by the real machine.
    #[must_use]
    pub fn live() -> Self {
        Self::from_ports(Box::new(LiveClock), Box::new(LiveFileSystem), Box::new(LiveShellExecutor))
    }

    /// Creates a live context whose port calls are recorded under `root`.
    ///
    /// Drop the context before calling [`RecordingSession::finish`].
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory cannot be created.
    pub fn recording_at(root: &Path) -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new(root)?;
        let ctx = Self::from_ports(
            Box::new(RecordingClock::new(Box::new(LiveClock), session.clock.clone())),
            Box::new(RecordingFileSystem::new(Box::new(LiveFileSystem), session.fs.clone())),
            Box::new(RecordingShellExecutor::new(
                Box::new(LiveShellExecutor),
                session.shell.clone(),
            )),
        );
        Ok((ctx, session))
    }

    /// Creates a replaying context.
    ///
    /// `path` is either a session directory holding `<port>.cassette.yaml`
    /// files or a single cassette serving every port.
    ///
    /// # Errors
    ///
    /// Returns an error if a cassette cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let load = |file: &Path| -> Result<CassetteReplayer, String> {
            let yaml = std::fs::read_to_string(file)
                .map_err(|e| format!("Failed to read cassette file {}: {e}", file.display()))?;
            let cassette = Cassette::from_yaml(&yaml)
                .map_err(|e| format!("{e} ({})", file.display()))?;
            Ok(CassetteReplayer::new(&cassette))
        };

        if path.is_dir() {
            let port = |name: &str| load(&path.join(format!("{name}.cassette.yaml")));
            return Ok(Self::from_ports(
                Box::new(ReplayingClock::new(port("clock")?)),
                Box::new(ReplayingFileSystem::new(port("fs")?)),
                Box::new(ReplayingShellExecutor::new(port("shell")?)),
            ));
        }

        // Each port gets its own replayer so per-port queues are independent.
        Ok(Self::from_ports(
            Box::new(ReplayingClock::new(load(path)?)),
            Box::new(ReplayingFileSystem::new(load(path)?)),
            Box::new(ReplayingShellExecutor::new(load(path)?)),
        ))
    }
}
