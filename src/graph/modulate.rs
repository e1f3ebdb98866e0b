use crate::{
    dsp::modulate::block_average,
    graph::node::{GraphNode, Modulatable, RenderCtx},
    MAX_BLOCK_SIZE,
};

/// Connect a modulation source to a parameter of another node.
///
/// The modulator is rendered first, averaged over the block, and applied as
/// `base + average * depth` before the source renders. An LFO on a filter
/// cutoff gives wobble; a decaying envelope on the same parameter gives the
/// pluck-style sweep.
pub struct Modulate<S, M>
where
    S: GraphNode + Modulatable,
    M: GraphNode,
{
    source: S,
    modulator: M,
    param: S::Param,
    depth: f32,
    mod_buffer: Vec<f32>,
}

impl<S, M> Modulate<S, M>
where
    S: GraphNode + Modulatable,
    M: GraphNode,
{
    pub fn new(source: S, modulator: M, param: S::Param, depth: f32) -> Self {
        Self {
            source,
            modulator,
            param,
            depth,
            mod_buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }
}

impl<S, M> GraphNode for Modulate<S, M>
where
    S: GraphNode + Modulatable,
    M: GraphNode,
{
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let len = out.len();

        self.modulator.render_block(&mut self.mod_buffer[..len], ctx);
        let level = block_average(&self.mod_buffer[..len]);

        let base_value = self.source.get_param(self.param);
        let modulation = level * self.depth;
        self.source
            .apply_modulation(self.param, base_value, modulation);

        self.source.render_block(out, ctx);
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.source.note_on(ctx);
        self.modulator.note_on(ctx);
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.source.note_off(ctx);
        self.modulator.note_off(ctx);
    }

    fn is_active(&self) -> bool {
        self.source.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        envelope::EnvNode,
        extensions::NodeExt,
        filter::{FilterNode, FilterParam},
        lfo::LfoNode,
    };

    #[test]
    fn lfo_modulation_renders_finite_output() {
        let lfo = LfoNode::sine(4.0);
        let mut filter = FilterNode::lowpass(1_000.0).modulate(lfo, FilterParam::Cutoff, 500.0);

        let mut buffer = vec![1.0f32; 512];
        let ctx = RenderCtx::from_freq(48_000.0, 110.0, 1.0);
        filter.render_block(&mut buffer, &ctx);

        assert!(buffer.iter().all(|&s| s.is_finite()));
    }

    #[test]
    fn envelope_sweep_moves_cutoff_downward() {
        // Decaying envelope, depth 600: cutoff starts near 1600 and settles
        // back at the 1000 Hz base as the envelope dies.
        let env = EnvNode::adsr(0.001, 0.01, 0.0, 0.01);
        let mut swept = FilterNode::lowpass(1_000.0).modulate(env, FilterParam::Cutoff, 600.0);

        let ctx = RenderCtx::from_freq(48_000.0, 110.0, 1.0);
        swept.note_on(&ctx);

        let mut early = vec![0.0f32; 64];
        swept.render_block(&mut early, &ctx);
        let early_cutoff = swept.source.current_cutoff();

        for _ in 0..20 {
            let mut block = vec![0.0f32; 64];
            swept.render_block(&mut block, &ctx);
        }
        let late_cutoff = swept.source.current_cutoff();

        assert!(early_cutoff > late_cutoff, "sweep should decay toward base");
        assert!((late_cutoff - 1_000.0).abs() < 50.0);
    }

    #[test]
    fn huge_depth_is_clamped_by_target() {
        let lfo = LfoNode::square(1.0);
        let mut filter =
            FilterNode::lowpass(1_000.0).modulate(lfo, FilterParam::Cutoff, 100_000.0);

        let mut buffer = vec![1.0f32; 1024];
        let ctx = RenderCtx::from_freq(48_000.0, 110.0, 1.0);
        filter.render_block(&mut buffer, &ctx);

        assert!(buffer.iter().all(|&s| s.is_finite()));
    }
}
