//! Cassette data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One call made through a port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Position in the cassette, assigned by the recorder.
    pub seq: u64,
    /// Port name: `clock`, `fs` or `shell`.
    pub port: String,
    /// Method invoked on the port.
    pub method: String,
    /// Arguments of the call.
    pub input: serde_json::Value,
    /// Returned value; fallible calls use `{"ok": ..}` / `{"err": ".."}`.
    pub output: serde_json::Value,
}

/// A named, ordered sequence of interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name for this cassette.
    pub name: String,
    /// When recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Version of the binary that recorded it.
    pub tool_version: String,
    /// Ordered list of interactions.
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    /// Parses a cassette from its YAML form.
    ///
    /// # Errors
    ///
    /// Returns an error string if the YAML does not match the cassette schema.
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse cassette: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_hand_written_yaml() {
        let yaml = r#"
name: probe-node
recorded_at: 2025-03-15T14:30:00Z
tool_version: 0.1.0
interactions:
  - seq: 0
    port: shell
    method: locate
    input: {program: node}
    output: /usr/bin/node
"#;
        let cassette = Cassette::from_yaml(yaml).unwrap();
        assert_eq!(cassette.name, "probe-node");
        assert_eq!(cassette.interactions.len(), 1);
        assert_eq!(cassette.interactions[0].output, json!("/usr/bin/node"));
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(Cassette::from_yaml("name: x\n").is_err());
    }
}
