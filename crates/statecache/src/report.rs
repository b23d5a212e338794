use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::counters::RedundantCalls;
use crate::tracker::StateTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameReport {
    pub frames: u64,
    #[serde(with = "millis")]
    pub elapsed: Duration,
    pub calls: RedundantCalls,
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Drains the tracker's counters once per frame and emits a summary each
/// time the configured interval elapses.
#[derive(Debug)]
pub struct FrameReporter {
    tracker: Arc<StateTracker>,
    interval: Duration,
    include_idle: bool,
    window_start: Option<Instant>,
    frames: u64,
    calls: RedundantCalls,
}

impl FrameReporter {
    pub fn new(tracker: Arc<StateTracker>) -> Self {
        let report = &tracker.config().report;
        let (interval, include_idle) = (report.interval, report.include_idle);
        Self {
            tracker,
            interval,
            include_idle,
            window_start: None,
            frames: 0,
            calls: RedundantCalls::default(),
        }
    }

    /// Call once per presented frame. Returns the accumulated report when the
    /// interval has elapsed since the window opened.
    pub fn on_frame(&mut self, now: Instant) -> Option<FrameReport> {
        let frame = self.tracker.get_and_reset_redundant_call_info();
        self.calls.accumulate(&frame);
        self.frames += 1;

        let start = *self.window_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.interval {
            return None;
        }

        let report = FrameReport {
            frames: self.frames,
            elapsed,
            calls: std::mem::take(&mut self.calls),
        };
        self.frames = 0;
        self.window_start = Some(now);

        if self.include_idle || report.calls.total() > 0 {
            let counts = serde_json::to_string(&report.calls).unwrap_or_default();
            info!(
                frames = report.frames,
                resources = report.calls.resource_total(),
                total = report.calls.total(),
                %counts,
                "redundant state calls"
            );
        }
        Some(report)
    }
}
