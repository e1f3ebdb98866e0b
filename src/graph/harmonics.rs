use std::f32::consts::TAU;

use crate::{
    dsp::envelope::Envelope,
    graph::node::{GraphNode, RenderCtx},
};

/*
Harmonic Stack
==============

Additive building block for the piano voices: a bank of sine partials at
integer multiples of the note frequency, each with its own amplitude and its
own attack/decay envelope.

Two details sell the piano-like character:

  - the amplitude table rolls off roughly as 1/n, with a brightness tilt
    that attenuates higher partials further for mellower styles;
  - higher partials decay faster than the fundamental, so the tone darkens
    as the note rings - the same thing a real string does.

note_off sends every partial into its (short) release, which is how the
voice pool implements its 50 ms release ramp.
*/

struct Partial {
    ratio: f32,
    amplitude: f32,
    phase: f32,
    env: Envelope,
}

pub struct HarmonicStack {
    partials: Vec<Partial>,
}

impl HarmonicStack {
    /// Build a stack from a per-harmonic amplitude table.
    ///
    /// `brightness` in (0, 1] tilts the spectrum: each successive partial is
    /// scaled by one more power of it. `decay` is the fundamental's decay
    /// time; partial n decays in `decay / (1 + 0.5 n)`.
    pub fn new(
        amplitudes: &[f32],
        attack: f32,
        decay: f32,
        release: f32,
        brightness: f32,
    ) -> Self {
        let brightness = brightness.clamp(0.05, 1.0);
        let partials = amplitudes
            .iter()
            .enumerate()
            .map(|(i, &amp)| Partial {
                ratio: (i + 1) as f32,
                amplitude: amp * brightness.powi(i as i32),
                phase: 0.0,
                env: Envelope::adsr(attack, decay / (1.0 + 0.5 * i as f32), 0.0, release),
            })
            .collect();

        Self { partials }
    }
}

impl GraphNode for HarmonicStack {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let nyquist = ctx.sample_rate * 0.5;

        for sample in out.iter_mut() {
            let mut acc = 0.0;
            for partial in self.partials.iter_mut() {
                partial.env.next_sample(ctx);

                let freq = ctx.frequency * partial.ratio;
                if freq >= nyquist {
                    continue; // partial folded above Nyquist: skip, don't alias
                }

                acc += (TAU * partial.phase).sin() * partial.amplitude * partial.env.level();

                partial.phase += freq / ctx.sample_rate;
                if partial.phase >= 1.0 {
                    partial.phase -= 1.0;
                }
            }
            *sample = acc;
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        for partial in self.partials.iter_mut() {
            partial.phase = 0.0;
            partial.env.note_on(ctx);
        }
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        for partial in self.partials.iter_mut() {
            partial.env.note_off(ctx);
        }
    }

    fn is_active(&self) -> bool {
        self.partials.iter().any(|p| p.env.is_active())
    }
}
