//! Recording adapters: delegate to an inner port and log every call.

pub mod clock;
pub mod filesystem;
pub mod shell;

pub use clock::RecordingClock;
pub use filesystem::RecordingFileSystem;
pub use shell::RecordingShellExecutor;

use serde::Serialize;
use serde_json::{json, Value};

use crate::cassette::session::SharedRecorder;

/// Record an infallible call.
pub(crate) fn record_interaction<I, O>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    output: &O,
) where
    I: Serialize,
    O: Serialize,
{
    push(recorder, port, method, to_value(input), to_value(output));
}

/// Record a fallible call as `{"ok": value}` or `{"err": message}`.
pub(crate) fn record_result<T, E, I>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: std::fmt::Display,
    I: Serialize,
{
    let output = match result {
        Ok(value) => json!({ "ok": to_value(value) }),
        Err(err) => json!({ "err": err.to_string() }),
    };
    push(recorder, port, method, to_value(input), output);
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "unserializable": e.to_string() }))
}

fn push(recorder: &SharedRecorder, port: &str, method: &str, input: Value, output: Value) {
    match recorder.lock() {
        Ok(mut guard) => guard.record(port, method, input, output),
        Err(_) => tracing::warn!(port, method, "cassette recorder poisoned; interaction dropped"),
    }
}
