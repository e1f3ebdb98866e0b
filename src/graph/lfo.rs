use crate::{
    dsp::oscillator::OscillatorBlock,
    graph::node::{GraphNode, RenderCtx},
};

/// Low frequency oscillator: the same waveform math as the audio oscillators
/// but at control rate (0.1-20 Hz) and with a fixed frequency, independent of
/// the note being played. Output is bipolar (-1.0 to +1.0).
///
/// The wobble bass style runs a 4 Hz sine LFO into its filter cutoff.
pub struct LfoNode {
    osc: OscillatorBlock,
    frequency: f32,
}

impl LfoNode {
    pub fn sine(frequency: f32) -> Self {
        Self {
            osc: OscillatorBlock::sine(),
            frequency,
        }
    }

    pub fn triangle(frequency: f32) -> Self {
        Self {
            osc: OscillatorBlock::triangle(),
            frequency,
        }
    }

    pub fn sawtooth(frequency: f32) -> Self {
        Self {
            osc: OscillatorBlock::sawtooth(),
            frequency,
        }
    }

    pub fn square(frequency: f32) -> Self {
        Self {
            osc: OscillatorBlock::square(),
            frequency,
        }
    }
}

impl GraphNode for LfoNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        // Render with the LFO's own frequency, not the note pitch
        let lfo_ctx = RenderCtx::from_freq(ctx.sample_rate, self.frequency, 1.0);
        self.osc.render(out, &lfo_ctx);
    }

    fn note_on(&mut self, _ctx: &RenderCtx) {
        // Phase-synced: every note gets the same modulation shape
        self.osc.reset_phase();
    }
}
