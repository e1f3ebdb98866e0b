#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pitch estimate for one analysis window, as produced by an external pitch
/// tracker. Confidence is 0.0-1.0; low-confidence estimates are treated as
/// "no pitch" by the consumers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    pub frequency: f32,
    pub confidence: f32,
}

/// One tick's worth of analysis input: an amplitude window plus an optional
/// pitch estimate, stamped with the audio-clock time it was captured at.
///
/// Frames borrow their sample window - they live for exactly one polling
/// tick and are never stored.
pub struct AnalysisFrame<'a> {
    pub samples: &'a [f32],
    pub pitch: Option<PitchEstimate>,
    pub time: f64,
}

impl<'a> AnalysisFrame<'a> {
    pub fn new(samples: &'a [f32], pitch: Option<PitchEstimate>, time: f64) -> Self {
        Self {
            samples,
            pitch,
            time,
        }
    }

    /// Root-mean-square amplitude of the window, the loudness proxy the
    /// onset detector thresholds against.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_squares: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum_squares / self.samples.len() as f32).sqrt()
    }
}
