//! Serves recorded interactions back in order.

use std::collections::{HashMap, VecDeque};

use super::format::{Cassette, Interaction};

/// Replays interactions from a loaded cassette.
///
/// Each `port::method` pair has its own queue, so interleaving between ports
/// may differ from the recording (tool probes run concurrently).
pub struct CassetteReplayer {
    queues: HashMap<(String, String), VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Create a new replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<(String, String), VecDeque<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_default()
                .push_back(interaction.clone());
        }
        Self { queues }
    }

    /// Take the next interaction recorded for `port` and `method`.
    ///
    /// # Panics
    ///
    /// Panics when the cassette has no (more) interactions for the pair; a
    /// replay that diverges from its recording is a test failure.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Interaction {
        let key = (port.to_string(), method.to_string());
        match self.queues.get_mut(&key).and_then(VecDeque::pop_front) {
            Some(interaction) => interaction,
            None => {
                let mut available: Vec<String> = self
                    .queues
                    .iter()
                    .filter(|(_, queue)| !queue.is_empty())
                    .map(|((p, m), queue)| format!("{p}::{m} ({})", queue.len()))
                    .collect();
                available.sort();
                panic!(
                    "Cassette exhausted: no interactions left for port={port:?} method={method:?}. \
                     Remaining: [{}]",
                    available.join(", ")
                );
            }
        }
    }

    /// Pop the next interaction whose input matches `input`, falling back to
    /// the head of the queue when none matches.
    ///
    /// Concurrent callers (parallel probes) consume a shared queue in a
    /// nondeterministic order; matching on input keeps replay stable.
    ///
    /// # Panics
    ///
    /// Panics when the queue for the pair is empty.
    pub fn take_matching(
        &mut self,
        port: &str,
        method: &str,
        input: &serde_json::Value,
    ) -> Interaction {
        let key = (port.to_string(), method.to_string());
        if let Some(queue) = self.queues.get_mut(&key) {
            if let Some(pos) = queue.iter().position(|i| &i.input == input) {
                if let Some(found) = queue.remove(pos) {
                    return found;
                }
            }
        }
        self.next_interaction(port, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn interaction(seq: u64, port: &str, method: &str, input: serde_json::Value) -> Interaction {
        Interaction {
            seq,
            port: port.into(),
            method: method.into(),
            input,
            output: json!(seq),
        }
    }

    fn cassette(interactions: Vec<Interaction>) -> Cassette {
        Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            tool_version: "0.0.0".into(),
            interactions,
        }
    }

    #[test]
    fn queues_are_per_port_and_method() {
        let mut replayer = CassetteReplayer::new(&cassette(vec![
            interaction(0, "clock", "now", json!({})),
            interaction(1, "fs", "exists", json!({"path": "/a"})),
            interaction(2, "clock", "now", json!({})),
        ]));

        assert_eq!(replayer.next_interaction("fs", "exists").seq, 1);
        assert_eq!(replayer.next_interaction("clock", "now").seq, 0);
        assert_eq!(replayer.next_interaction("clock", "now").seq, 2);
    }

    #[test]
    fn take_matching_prefers_equal_input() {
        let mut replayer = CassetteReplayer::new(&cassette(vec![
            interaction(0, "shell", "locate", json!({"program": "git"})),
            interaction(1, "shell", "locate", json!({"program": "node"})),
        ]));

        let node = replayer.take_matching("shell", "locate", &json!({"program": "node"}));
        assert_eq!(node.seq, 1);
        let other = replayer.take_matching("shell", "locate", &json!({"program": "docker"}));
        assert_eq!(other.seq, 0);
    }

    #[test]
    #[should_panic(expected = "Cassette exhausted")]
    fn exhausted_queue_panics() {
        let mut replayer =
            CassetteReplayer::new(&cassette(vec![interaction(0, "clock", "now", json!({}))]));
        let _ = replayer.next_interaction("clock", "now");
        let _ = replayer.next_interaction("clock", "now");
    }
}
