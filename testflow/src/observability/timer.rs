//! Wall-clock timing for stage invocations.

use crate::utils::{now_utc, Timestamp};
use std::time::Instant;

/// Measures one stage invocation.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    started_at: Timestamp,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            started_at: now_utc(),
            name: name.into(),
        }
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns when the span started.
    #[must_use]
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Returns the elapsed time in whole milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Finishes the span, returning its start time and duration.
    #[must_use]
    pub fn finish(self) -> (Timestamp, u64) {
        (self.started_at, self.elapsed_ms())
    }
}
