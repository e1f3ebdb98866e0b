//! FFT-based autocorrelation pitch tracker.
//!
//! This is the "pitch collaborator" the engine consumes: it turns each mic
//! window into an optional (frequency, confidence) estimate. Autocorrelation
//! via FFT: forward transform, power spectrum, inverse transform. The lag of
//! the strongest peak inside the vocal range is the period; the peak's
//! height relative to lag zero is the confidence.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use voxband::analysis::PitchEstimate;

/// Vocal pitch search range in Hz.
const MIN_FREQUENCY: f32 = 60.0;
const MAX_FREQUENCY: f32 = 1_000.0;

pub struct PitchTracker {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    /// FFT length: window size padded x2 so the circular autocorrelation
    /// doesn't wrap.
    fft_len: usize,
    window_len: usize,
    buffer: Vec<Complex<f32>>,
}

impl PitchTracker {
    pub fn new(window_len: usize) -> Self {
        let fft_len = (window_len * 2).next_power_of_two();
        let mut planner = FftPlanner::new();
        Self {
            forward: planner.plan_fft_forward(fft_len),
            inverse: planner.plan_fft_inverse(fft_len),
            fft_len,
            window_len,
            buffer: vec![Complex::new(0.0, 0.0); fft_len],
        }
    }

    /// Estimate the pitch of one window. Returns None when the signal has no
    /// usable periodicity.
    pub fn estimate(&mut self, samples: &[f32], sample_rate: f32) -> Option<PitchEstimate> {
        let len = samples.len().min(self.window_len);
        if len < 64 {
            return None;
        }

        self.buffer.fill(Complex::new(0.0, 0.0));
        for (slot, &sample) in self.buffer.iter_mut().zip(samples[..len].iter()) {
            *slot = Complex::new(sample, 0.0);
        }

        self.forward.process(&mut self.buffer);
        for value in self.buffer.iter_mut() {
            *value = Complex::new(value.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut self.buffer);

        let energy = self.buffer[0].re;
        if energy <= f32::EPSILON {
            return None;
        }

        let min_lag = (sample_rate / MAX_FREQUENCY).floor().max(1.0) as usize;
        let max_lag = ((sample_rate / MIN_FREQUENCY).ceil() as usize).min(len - 1);
        if min_lag >= max_lag {
            return None;
        }

        let mut best_lag = 0;
        let mut best_value = 0.0f32;
        for lag in min_lag..=max_lag {
            let value = self.buffer[lag].re;
            if value > best_value {
                best_value = value;
                best_lag = lag;
            }
        }
        if best_lag == 0 {
            return None;
        }

        let confidence = (best_value / energy).clamp(0.0, 1.0);
        Some(PitchEstimate {
            frequency: sample_rate / best_lag as f32,
            confidence,
        })
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    #[allow(dead_code)]
    pub fn fft_len(&self) -> usize {
        self.fft_len
    }
}
