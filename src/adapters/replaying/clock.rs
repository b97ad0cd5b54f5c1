//! Replaying adapter for the `Clock` port.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::cassette::replayer::CassetteReplayer;
use crate::ports::clock::Clock;

/// Serves recorded clock readings.
pub struct ReplayingClock {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingClock {
    /// Creates a replaying clock.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl Clock for ReplayingClock {
    fn now(&self) -> DateTime<Utc> {
        let interaction =
            self.replayer.lock().expect("replayer lock poisoned").next_interaction("clock", "now");
        serde_json::from_value(interaction.output)
            .expect("clock::now: recorded output is not a timestamp")
    }
}
