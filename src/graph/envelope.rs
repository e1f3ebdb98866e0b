use crate::{
    dsp::envelope::{Envelope, ExpDecay},
    graph::node::{GraphNode, RenderCtx},
};

/// ADSR envelope as a graph node. Renders its level curve, so it is almost
/// always used as the modulator side of `.amplify()`.
pub struct EnvNode {
    env: Envelope,
}

impl EnvNode {
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            env: Envelope::adsr(attack, decay, sustain, release),
        }
    }
}

impl GraphNode for EnvNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.env.render(out, ctx);
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.env.note_on(ctx);
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.env.note_off(ctx);
    }

    fn is_active(&self) -> bool {
        self.env.is_active()
    }
}

/// One-shot exponential decay as a graph node. Ignores note_off: once
/// triggered it rings out on its own, which is what percussive transients
/// and damped strings want.
pub struct DecayNode {
    env: ExpDecay,
}

impl DecayNode {
    pub fn new(decay_time: f32) -> Self {
        Self {
            env: ExpDecay::new(decay_time),
        }
    }
}

impl GraphNode for DecayNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.env.render(out, ctx.sample_rate);
    }

    fn note_on(&mut self, _ctx: &RenderCtx) {
        self.env.trigger();
    }

    fn is_active(&self) -> bool {
        self.env.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderCtx {
        RenderCtx::from_freq(1_000.0, 440.0, 1.0)
    }

    #[test]
    fn env_node_tracks_gate() {
        let mut node = EnvNode::adsr(0.01, 0.05, 0.6, 0.02);
        assert!(!node.is_active());

        let ctx = ctx();
        node.note_on(&ctx);
        let mut buffer = vec![0.0f32; 64];
        node.render_block(&mut buffer, &ctx);
        assert!(node.is_active());
        assert!(buffer.iter().any(|&s| s > 0.0));

        node.note_off(&ctx);
        let mut tail = vec![0.0f32; 64];
        node.render_block(&mut tail, &ctx);
        assert!(!node.is_active());
    }

    #[test]
    fn decay_node_ignores_note_off() {
        let mut node = DecayNode::new(0.05);
        let ctx = ctx();

        node.note_on(&ctx);
        node.note_off(&ctx);
        assert!(node.is_active(), "decay keeps ringing after note_off");

        let mut buffer = vec![0.0f32; 128];
        node.render_block(&mut buffer, &ctx);
        assert!(!node.is_active(), "decay finishes on its own");
    }
}
