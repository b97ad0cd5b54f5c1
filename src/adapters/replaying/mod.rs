//! Replaying adapters: answer port calls from a recorded cassette.

pub mod clock;
pub mod filesystem;
pub mod shell;

pub use clock::ReplayingClock;
pub use filesystem::ReplayingFileSystem;
pub use shell::ReplayingShellExecutor;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ports::PortError;

/// Decode a recorded `{"ok": ..}` / `{"err": ".."}` output.
pub(crate) fn replay_result<T: DeserializeOwned>(output: &Value, context: &str) -> Result<T, PortError> {
    if let Some(err) = output.get("err") {
        return Err(err.as_str().unwrap_or("unknown error").to_string().into());
    }
    let value = output.get("ok").unwrap_or(output);
    serde_json::from_value(value.clone())
        .map_err(|e| format!("{context}: failed to deserialize recorded output: {e}").into())
}
