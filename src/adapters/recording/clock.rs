//! Recording adapter for the `Clock` port.

use chrono::{DateTime, Utc};

use super::record_interaction;
use crate::cassette::session::SharedRecorder;
use crate::ports::Clock;

/// Records clock readings while delegating to an inner clock.
pub struct RecordingClock {
    inner: Box<dyn Clock>,
    recorder: SharedRecorder,
}

impl RecordingClock {
    /// Wraps `inner`, logging into `recorder`.
    pub fn new(inner: Box<dyn Clock>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

impl Clock for RecordingClock {
    fn now(&self) -> DateTime<Utc> {
        let result = self.inner.now();
        record_interaction(&self.recorder, "clock", "now", &(), &result);
        result
    }
}
