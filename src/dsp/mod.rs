//! Low-level DSP primitives used by the higher level graph nodes.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside voice structs. They intentionally stay focused on the
//! signal-processing math so graph combinators can layer on orchestration and
//! modulation.

/// Feedback delay line used for string-resonance voices.
pub mod delay;
/// Waveshaping transfer functions for distorted voices.
pub mod distortion;
/// Envelope generators: linear ADSR and exponential decay.
pub mod envelope;
/// State-variable filter implementation with multiple responses.
pub mod filter;
/// Parameter modulation helpers.
pub mod modulate;
/// Oscillator waveforms and noise sources.
pub mod oscillator;

pub use envelope::EnvelopeState;
