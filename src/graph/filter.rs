use crate::{
    dsp::filter::SVFilter,
    graph::node::{GraphNode, Modulatable, RenderCtx},
};

/*
Filter Node
===========

Subtractive synthesis: start from a harmonically rich waveform and carve away.
The state-variable core provides every response the style recipes need:

  lowpass    every instrument's tone shaping
  highpass   clearing low-end mud (clean guitar)
  bandpass   focused, vocal quality (clean guitar, hammer transients)
  peaking    body resonance bump (acoustic guitar)

Cutoff and resonance are modulatable, which is how the swept styles work:
a decaying envelope on Cutoff gives the pluck-bass sweep, a 4 Hz LFO on
Cutoff gives wobble bass. Resonance is normalized 0.0-1.0 here; values near
1.0 are aggressively "squelchy" and values above it are clamped for
stability.
*/

#[derive(Clone, Copy, Debug)]
pub enum FilterParam {
    Cutoff,
    Resonance,
}

pub struct FilterNode {
    filter: SVFilter,
    base_cutoff: f32,
    base_resonance: f32,
}

impl FilterNode {
    fn with_filter(filter: SVFilter) -> Self {
        let base_cutoff = filter.cutoff_hz;
        let base_resonance = filter.resonance;
        FilterNode {
            filter,
            base_cutoff,
            base_resonance,
        }
    }

    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self::with_filter(SVFilter::lowpass(cutoff_hz))
    }

    pub fn highpass(cutoff_hz: f32) -> Self {
        Self::with_filter(SVFilter::highpass(cutoff_hz))
    }

    pub fn bandpass(cutoff_hz: f32) -> Self {
        Self::with_filter(SVFilter::bandpass(cutoff_hz))
    }

    pub fn peaking(cutoff_hz: f32, gain: f32) -> Self {
        Self::with_filter(SVFilter::peaking(cutoff_hz, gain))
    }

    /// Builder-style resonance, 0.0 (none) to 1.0 (squelchy).
    pub fn with_resonance(mut self, resonance: f32) -> Self {
        let resonance = resonance.clamp(0.0, 0.98);
        self.filter.set_resonance(resonance);
        self.base_resonance = resonance;
        self
    }

    #[cfg(test)]
    pub fn current_cutoff(&self) -> f32 {
        self.filter.cutoff_hz
    }
}

impl Modulatable for FilterNode {
    type Param = FilterParam;

    fn get_param(&self, param: Self::Param) -> f32 {
        match param {
            FilterParam::Cutoff => self.base_cutoff,
            FilterParam::Resonance => self.base_resonance,
        }
    }

    fn apply_modulation(&mut self, param: Self::Param, base: f32, modulation: f32) {
        let final_value = base + modulation;
        match param {
            FilterParam::Cutoff => {
                self.base_cutoff = base;
                self.filter.set_cutoff(final_value.clamp(20.0, 20_000.0));
            }
            FilterParam::Resonance => {
                self.base_resonance = base;
                self.filter.set_resonance(final_value.clamp(0.0, 0.98));
            }
        }
    }
}

impl GraphNode for FilterNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.filter.render(out, ctx);
    }

    fn note_on(&mut self, _ctx: &RenderCtx) {
        // Clear integrator memory so the previous note's tail can't bleed
        // into this attack.
        self.filter.reset();
    }
}
