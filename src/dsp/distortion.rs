//! Distortion / Waveshaping
//!
//! A waveshaper applies a nonlinear transfer function to each sample:
//! `output = f(input * drive)`. At low drive the signal stays in the linear
//! region of f() and passes mostly unchanged; as drive increases, the curve
//! compresses the peaks and adds harmonics.
//!
//! Drive values: 1.0 is clean, 2-4 is warm saturation, 5-10 is obvious
//! distortion, 10+ is heavy.

/// Soft clipping using the x / (1 + |x|) transfer function.
///
/// Produces warm saturation that gradually compresses peaks without harsh
/// artifacts - the tube-amp end of the distortion spectrum.
#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

/// Hard clipping - clamps the signal at a threshold.
///
/// Harsh, buzzy, rich in odd harmonics. Lower threshold = more distortion.
#[inline]
pub fn hard_clip(sample: f32, drive: f32, threshold: f32) -> f32 {
    let x = sample * drive;
    x.clamp(-threshold, threshold)
}

/// Apply soft clipping to an entire buffer in place.
pub fn soft_clip_buffer(buffer: &mut [f32], drive: f32) {
    for sample in buffer.iter_mut() {
        *sample = soft_clip(*sample, drive);
    }
}

/// Apply hard clipping to an entire buffer in place.
pub fn hard_clip_buffer(buffer: &mut [f32], drive: f32, threshold: f32) {
    for sample in buffer.iter_mut() {
        *sample = hard_clip(*sample, drive, threshold);
    }
}
