//! Wall-clock frame pacing.

use std::time::{Duration, Instant};

/// Caps the loop at a target frame rate by sleeping out the rest of each
/// frame period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePacer {
    period: Option<Duration>,
}

impl FramePacer {
    /// `max_fps <= 0` disables pacing.
    #[must_use]
    pub fn new(max_fps: i32) -> Self {
        let period = u32::try_from(max_fps)
            .ok()
            .filter(|fps| *fps > 0)
            .map(|fps| Duration::from_secs(1) / fps);
        Self { period }
    }

    #[must_use]
    pub const fn uncapped() -> Self {
        Self { period: None }
    }

    pub const fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Sleep until one period has passed since `frame_start`. Returns
    /// immediately when uncapped or when the frame already overran.
    pub fn wait(&self, frame_start: Instant) {
        if let Some(remaining) = self.remaining(frame_start, Instant::now()) {
            std::thread::sleep(remaining);
        }
    }

    fn remaining(&self, frame_start: Instant, now: Instant) -> Option<Duration> {
        let deadline = frame_start + self.period?;
        deadline.checked_duration_since(now).filter(|d| !d.is_zero())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
