use crate::dsp::oscillator::OscillatorBlock;
use crate::graph::node::{GraphNode, Modulatable, RenderCtx};

/*
Oscillator Node
===============

The fundamental sound source. By default the pitch comes from the render
context, so one oscillator serves every note the voice plays. Two deviations
are supported for instrument design:

  with_frequency(hz)   Fixed pitch, ignoring the note. Used by clicks and
                       other sounds that must not track the voice.

  with_ratio(r)        Track the note at a fixed ratio. 0.5 gives the
                       sub-octave sine layered under synth/pluck bass,
                       2.0 would give an octave doubling.

  with_detune(cents)   Constant detune, for thickness when layering.

Typical subtractive chain: saw -> filter -> envelope:

  OscNode::sawtooth()
      .through(FilterNode::lowpass(2000.0))
      .amplify(EnvNode::adsr(0.01, 0.1, 0.7, 0.3));
*/

pub struct OscNode {
    osc: OscillatorBlock,
    /// Fixed frequency (Hz). If Some, ignores ctx.frequency entirely.
    base_frequency: Option<f32>,
    /// Current frequency after modulation (only used when base_frequency is Some)
    current_frequency: f32,
    /// Multiplier applied to the note frequency (sub-octaves, doublings).
    frequency_ratio: f32,
    /// Detune in cents. 100 cents = 1 semitone.
    detune_cents: f32,
}

/// Parameters that can be modulated on an oscillator
#[derive(Clone, Copy, Debug)]
pub enum OscParam {
    /// Oscillator frequency in Hz
    Frequency,
    /// Detune in cents (100 cents = 1 semitone)
    Detune,
}

impl OscNode {
    fn new(osc: OscillatorBlock) -> Self {
        Self {
            osc,
            base_frequency: None,
            current_frequency: 440.0,
            frequency_ratio: 1.0,
            detune_cents: 0.0,
        }
    }

    pub fn sine() -> Self {
        Self::new(OscillatorBlock::sine())
    }

    pub fn sawtooth() -> Self {
        Self::new(OscillatorBlock::sawtooth())
    }

    pub fn square() -> Self {
        Self::new(OscillatorBlock::square())
    }

    pub fn triangle() -> Self {
        Self::new(OscillatorBlock::triangle())
    }

    pub fn noise() -> Self {
        Self::new(OscillatorBlock::noise())
    }

    /// Set a fixed frequency, ignoring the note pitch from RenderCtx.
    pub fn with_frequency(mut self, freq: f32) -> Self {
        self.base_frequency = Some(freq);
        self.current_frequency = freq;
        self
    }

    /// Track the note frequency at a fixed ratio (0.5 = one octave down).
    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.frequency_ratio = ratio.max(0.0);
        self
    }

    /// Set detune in cents (100 cents = 1 semitone).
    pub fn with_detune(mut self, cents: f32) -> Self {
        self.detune_cents = cents;
        self
    }
}

impl GraphNode for OscNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let base_freq = if self.base_frequency.is_some() {
            self.current_frequency
        } else {
            ctx.frequency * self.frequency_ratio
        };

        let final_freq = if self.detune_cents != 0.0 {
            base_freq * 2.0_f32.powf(self.detune_cents / 1200.0)
        } else {
            base_freq
        };

        let modified_ctx = RenderCtx {
            frequency: final_freq,
            ..*ctx
        };
        self.osc.render(out, &modified_ctx);
    }

    fn note_on(&mut self, _ctx: &RenderCtx) {
        // Restart the cycle so every trigger has an identical attack, and
        // reset any modulated frequency back to its base.
        self.osc.reset_phase();
        if let Some(base) = self.base_frequency {
            self.current_frequency = base;
        }
    }
}

impl Modulatable for OscNode {
    type Param = OscParam;

    fn get_param(&self, param: Self::Param) -> f32 {
        match param {
            OscParam::Frequency => self.base_frequency.unwrap_or(440.0),
            OscParam::Detune => self.detune_cents,
        }
    }

    fn apply_modulation(&mut self, param: Self::Param, base: f32, modulation: f32) {
        match param {
            OscParam::Frequency => {
                // Clamp to audible range
                self.current_frequency = (base + modulation).clamp(20.0, 20_000.0);
            }
            OscParam::Detune => {
                self.detune_cents = (base + modulation).clamp(-200.0, 200.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    #[test]
    fn renders_context_frequency() {
        let sample_rate = 48_000.0;
        let ctx = RenderCtx::from_freq(sample_rate, 440.0, 1.0);
        let mut osc = OscNode::sine();

        let mut buffer = vec![0.0f32; 128];
        osc.render_block(&mut buffer, &ctx);

        let n = 12;
        let expected = (TAU * 440.0 * n as f32 / sample_rate).sin();
        assert!((buffer[n] - expected).abs() < 1e-5);
    }

    #[test]
    fn ratio_renders_sub_octave() {
        let sample_rate = 48_000.0;
        let ctx = RenderCtx::from_freq(sample_rate, 220.0, 1.0);
        let mut sub = OscNode::sine().with_ratio(0.5);

        let mut buffer = vec![0.0f32; 128];
        sub.render_block(&mut buffer, &ctx);

        let n = 30;
        let expected = (TAU * 110.0 * n as f32 / sample_rate).sin();
        assert!((buffer[n] - expected).abs() < 1e-5);
    }

    #[test]
    fn fixed_frequency_ignores_note() {
        let sample_rate = 48_000.0;
        let mut osc = OscNode::sine().with_frequency(1_000.0);

        let mut a = vec![0.0f32; 64];
        let mut b = vec![0.0f32; 64];
        osc.render_block(&mut a, &RenderCtx::from_freq(sample_rate, 220.0, 1.0));
        osc.note_on(&RenderCtx::from_freq(sample_rate, 880.0, 1.0));
        osc.render_block(&mut b, &RenderCtx::from_freq(sample_rate, 880.0, 1.0));

        assert_eq!(a, b);
    }
}
