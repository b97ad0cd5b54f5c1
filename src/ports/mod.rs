//! Port traits defining external boundaries.
//!
//! Each trait is a boundary between the orchestration core and the machine
//! it runs on (time, disk, processes). Implementations live in
//! `src/adapters/`.

pub mod clock;
pub mod filesystem;
pub mod shell;

pub use clock::Clock;
pub use filesystem::FileSystem;
pub use shell::{ShellExecutor, ShellOutput};

/// Boxed error type returned by port methods.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;
