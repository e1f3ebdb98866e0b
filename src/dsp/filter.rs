use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::node::RenderCtx;

/*
| type              | passes          | rejects      | used by              |
| ----------------- | --------------- | ------------ | -------------------- |
| low-pass          | below cutoff    | above cutoff | every instrument     |
| high-pass         | above cutoff    | below cutoff | clean guitar         |
| band-pass         | around cutoff   | outside      | clean guitar, piano  |
|                   |                 |              | hammer transient     |
| notch / band-stop | outside         | around       | (kept for symmetry)  |
| peaking           | all, boosted at | -            | acoustic guitar body |
|                   | cutoff          |              | resonance            |

The state-variable topology provides all responses from the same two
integrators, stays stable under resonance, and takes cutoff/resonance
changes per block without re-derivation, which is what the swept and
LFO-modulated styles rely on.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
    /// Unity gain plus a resonant boost around the cutoff.
    Peaking,
}

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
    pub notch: f32,
}

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    pub cutoff_hz: f32,
    pub resonance: f32,
    /// Linear gain of the bandpass boost, Peaking type only.
    pub peak_gain: f32,
    filter_type: FilterType,
}

impl SVFilter {
    pub fn new(filter_type: FilterType) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz: 1000.0,
            resonance: 0.0,
            peak_gain: 1.0,
            filter_type,
        }
    }

    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            ..Self::new(FilterType::LowPass)
        }
    }

    pub fn highpass(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            ..Self::new(FilterType::HighPass)
        }
    }

    pub fn bandpass(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            ..Self::new(FilterType::BandPass)
        }
    }

    pub fn notch(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            ..Self::new(FilterType::Notch)
        }
    }

    pub fn peaking(cutoff_hz: f32, peak_gain: f32) -> Self {
        Self {
            cutoff_hz,
            peak_gain,
            ..Self::new(FilterType::Peaking)
        }
    }

    #[inline]
    fn compute_g(&self, ctx: &RenderCtx) -> f32 {
        let wd = TAU * self.cutoff_hz;
        let wa = (2.0 * ctx.sample_rate) * (wd / (2.0 * ctx.sample_rate)).tan();
        wa / (2.0 * ctx.sample_rate)
    }

    pub fn next_sample(&mut self, sample: f32, k: f32, g: f32) -> FilterOutputs {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
            notch: sample - k * v1,
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        let g = self.compute_g(ctx);
        let k = 2.0 - (2.0 * self.resonance.clamp(0.0, 0.98));

        for sample in buffer.iter_mut() {
            let input = *sample;
            let outputs = self.next_sample(input, k, g);

            *sample = match self.filter_type {
                FilterType::LowPass => outputs.lowpass,
                FilterType::HighPass => outputs.highpass,
                FilterType::BandPass => outputs.bandpass,
                FilterType::Notch => outputs.notch,
                FilterType::Peaking => input + (self.peak_gain - 1.0) * outputs.bandpass,
            }
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff_hz = cutoff;
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::OscillatorBlock;

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        let skip = buffer.len().min(32);
        buffer
            .get(skip..)
            .unwrap_or(buffer)
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    fn rendered_sine(frequency: f32, len: usize) -> (Vec<f32>, RenderCtx) {
        let ctx = RenderCtx::from_freq(48_000.0, frequency, 1.0);
        let mut osc = OscillatorBlock::sine();
        let mut buffer = vec![0.0f32; len];
        osc.render(&mut buffer, &ctx);
        (buffer, ctx)
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut filter = SVFilter::lowpass(500.0);
        let mut buffer = vec![1.0; 128];
        let ctx = RenderCtx::from_freq(48_000.0, 440.0, 1.0);

        filter.render(&mut buffer, &ctx);

        assert!(buffer[127] > 0.99);
    }

    #[test]
    fn highpass_rejects_dc() {
        let mut filter = SVFilter::highpass(500.0);
        let mut buffer = vec![1.0; 128];
        let ctx = RenderCtx::from_freq(48_000.0, 440.0, 1.0);

        filter.render(&mut buffer, &ctx);

        assert!(buffer[127].abs() < 0.001);
    }

    #[test]
    fn lowpass_attenuates_above_cutoff() {
        let mut filter = SVFilter::lowpass(500.0);
        let (mut buffer, ctx) = rendered_sine(5_000.0, 128); // 10x cutoff

        filter.render(&mut buffer, &ctx);

        let peak = peak_after_transient(&buffer);
        assert!(peak < 0.3, "expected attenuation, got peak {peak}");
    }

    #[test]
    fn bandpass_emphasizes_cutoff_frequency() {
        let cutoff = 1_000.0;
        let mut filter = SVFilter::bandpass(cutoff);
        filter.resonance = 0.5;

        let (mut pass_buffer, pass_ctx) = rendered_sine(cutoff, 512);
        filter.render(&mut pass_buffer, &pass_ctx);
        let pass_peak = peak_after_transient(&pass_buffer);

        filter.reset();
        let (mut off_buffer, off_ctx) = rendered_sine(200.0, 512);
        filter.render(&mut off_buffer, &off_ctx);
        let off_peak = peak_after_transient(&off_buffer);

        assert!(
            pass_peak > off_peak * 2.0,
            "expected bandpass emphasis, pass={pass_peak} off={off_peak}"
        );
    }

    #[test]
    fn peaking_boosts_cutoff_and_passes_elsewhere() {
        let cutoff = 1_000.0;
        let mut filter = SVFilter::peaking(cutoff, 3.0);
        filter.resonance = 0.5;

        let (mut center_buffer, center_ctx) = rendered_sine(cutoff, 512);
        filter.render(&mut center_buffer, &center_ctx);
        let center_peak = peak_after_transient(&center_buffer);

        filter.reset();
        let (mut off_buffer, off_ctx) = rendered_sine(150.0, 512);
        filter.render(&mut off_buffer, &off_ctx);
        let off_peak = peak_after_transient(&off_buffer);

        assert!(center_peak > 1.2, "cutoff band should be boosted");
        assert!(
            off_peak > 0.7 && off_peak < 1.3,
            "off-band signal should pass near unity, got {off_peak}"
        );
    }

    #[test]
    fn set_cutoff_affects_filtering() {
        let mut filter = SVFilter::lowpass(200.0);
        let (mut buffer1, ctx) = rendered_sine(1_000.0, 256);
        filter.render(&mut buffer1, &ctx);
        let peak_low_cutoff = peak_after_transient(&buffer1);

        filter.reset();
        filter.set_cutoff(5_000.0);
        let (mut buffer2, _) = rendered_sine(1_000.0, 256);
        filter.render(&mut buffer2, &ctx);
        let peak_high_cutoff = peak_after_transient(&buffer2);

        assert!(
            peak_high_cutoff > peak_low_cutoff * 2.0,
            "raising the cutoff should pass more signal: high={peak_high_cutoff} low={peak_low_cutoff}"
        );
    }

    #[test]
    fn resonance_boosts_signal_at_cutoff() {
        let cutoff = 1_000.0;
        let mut filter = SVFilter::lowpass(cutoff);
        filter.set_resonance(0.05);
        let (mut buffer1, ctx) = rendered_sine(cutoff, 512);
        filter.render(&mut buffer1, &ctx);
        let peak_low_res = peak_after_transient(&buffer1);

        filter.reset();
        filter.set_resonance(0.9);
        let (mut buffer2, _) = rendered_sine(cutoff, 512);
        filter.render(&mut buffer2, &ctx);
        let peak_high_res = peak_after_transient(&buffer2);

        assert!(
            peak_high_res > peak_low_res * 1.2,
            "resonance should emphasize the cutoff: high={peak_high_res} low={peak_low_res}"
        );
    }
}
