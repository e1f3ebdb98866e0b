//! Voice analysis: classifying a continuous amplitude/pitch stream into
//! discrete note events.
//!
//! Nothing in this module touches a synthesis graph. The detector is a pure
//! state machine over caller-supplied frames, which is what makes it
//! testable with hand-built RMS sequences.

/// Per-tick analysis input.
pub mod frame;
/// Note naming and equal-tempered pitch math.
pub mod note;
/// Onset/offset detection with hysteresis.
pub mod onset;

pub use frame::{AnalysisFrame, PitchEstimate};
pub use onset::{DetectorConfig, DetectorState, NoteEvent, OnsetDetector};
