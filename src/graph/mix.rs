use crate::{
    graph::node::{GraphNode, RenderCtx},
    MAX_BLOCK_SIZE,
};

/*
Parallel Signal Mixing
======================

Combines two sources with a linear crossfade:

  output = A * (1 - balance) + B * balance

Linear (rather than equal-power) blending is predictable and cheap; the
styles that layer oscillators only need a fixed static balance, so the
mid-fade loudness dip of linear mixing never shows up in practice.

Both sources receive note_on/note_off. If only one side should be gated,
apply the envelope after mixing:

  osc1.mix(osc2, 0.5).amplify(env)   // envelope gates both
  osc1.amplify(env).mix(osc2, 0.5)   // osc2 drones
*/

pub struct Mix<A, B> {
    pub source_a: A,
    pub source_b: B,
    pub balance: f32, // 0.0 = all A, 1.0 = all B
    temp_buffer: Vec<f32>,
}

impl<A, B> Mix<A, B> {
    pub fn new(source_a: A, source_b: B, balance: f32) -> Self {
        Mix {
            source_a,
            source_b,
            balance: balance.clamp(0.0, 1.0),
            temp_buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }
}

impl<A: GraphNode, B: GraphNode> GraphNode for Mix<A, B> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.source_a.render_block(out, ctx);

        let frames = &mut self.temp_buffer[..out.len()];
        frames.fill(0.0);
        self.source_b.render_block(frames, ctx);

        let weight_a = 1.0 - self.balance;
        let weight_b = self.balance;
        for (o, b) in out.iter_mut().zip(frames.iter()) {
            *o = (*o * weight_a) + (*b * weight_b);
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.source_a.note_on(ctx);
        self.source_b.note_on(ctx);
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.source_a.note_off(ctx);
        self.source_b.note_off(ctx);
    }

    fn is_active(&self) -> bool {
        self.source_a.is_active() || self.source_b.is_active()
    }
}
