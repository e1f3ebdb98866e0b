//! Monotonic audio clock shared between the rendering path and the control loop.
//!
//! All scheduling in this crate (beat times, auto-release, deferred voice
//! teardown) is expressed in seconds on this clock, never on wall-clock
//! timers. Only the rendering path advances it; every other component holds a
//! read-only handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cheap cloneable handle to the audio timeline.
///
/// Time is derived from a frame counter, so `now()` moves in block-sized
/// steps: it reports the time of the *start* of the block currently being
/// rendered. That granularity is fine for the control loop, which only needs
/// to schedule ahead of it.
#[derive(Clone)]
pub struct AudioClock {
    frames: Arc<AtomicU64>,
    sample_rate: f32,
}

impl AudioClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    /// Current time in seconds since the clock was created.
    pub fn now(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    /// Total frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Advance the clock by one rendered block. Called by the rendering path
    /// only.
    pub(crate) fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_in_seconds() {
        let clock = AudioClock::new(48_000.0);
        assert_eq!(clock.now(), 0.0);

        clock.advance(48_000);
        assert!((clock.now() - 1.0).abs() < 1e-9);

        clock.advance(24_000);
        assert!((clock.now() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn handles_share_the_timeline() {
        let clock = AudioClock::new(1_000.0);
        let reader = clock.clone();

        clock.advance(500);
        assert!((reader.now() - 0.5).abs() < 1e-9);
    }
}
