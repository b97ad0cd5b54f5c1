//! Live adapters backed by the real machine.

pub mod clock;
pub mod filesystem;
pub mod shell;

pub use clock::LiveClock;
pub use filesystem::LiveFileSystem;
pub use shell::LiveShellExecutor;
