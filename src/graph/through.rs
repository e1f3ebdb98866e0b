use crate::graph::node::{GraphNode, RenderCtx};

/// Serial signal chain: render the source into the buffer, then let the
/// effect process it in place. This is the building block for chains like
/// oscillator -> filter -> waveshaper.
///
/// Through vs Amplify vs Mix:
/// - Through: serial processing (source -> effect -> output)
/// - Amplify: multiplication (signal x modulator)
/// - Mix:     parallel blending (dry + wet)
pub struct Through<S, F> {
    source: S,
    effect: F,
}

impl<S, F> Through<S, F> {
    pub fn new(source: S, effect: F) -> Self {
        Self { source, effect }
    }
}

impl<S: GraphNode, F: GraphNode> GraphNode for Through<S, F> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.source.render_block(out, ctx);
        self.effect.render_block(out, ctx);
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.source.note_on(ctx);
        self.effect.note_on(ctx);
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.source.note_off(ctx);
        self.effect.note_off(ctx);
    }

    fn is_active(&self) -> bool {
        self.source.is_active() || self.effect.is_active()
    }
}
