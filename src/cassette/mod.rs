//! Cassettes: ordered logs of port interactions for record and replay.

pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;
