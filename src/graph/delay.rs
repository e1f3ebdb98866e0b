use crate::{dsp::delay::DelayLine, graph::node::{GraphNode, RenderCtx}};

/// Feedback delay tuned to the period of the note being rendered.
///
/// Feeding a short excitation (a noise burst) into a delay of one period with
/// high feedback makes the energy recirculate at the note's frequency - a
/// rough plucked-string resonance. The acoustic guitar style drives this with
/// a triangle oscillator plus a decaying noise burst.
pub struct StringDelayNode {
    delay_line: DelayLine,
    feedback: f32,
}

impl StringDelayNode {
    pub fn new(feedback: f32) -> Self {
        Self {
            delay_line: DelayLine::new(),
            feedback: feedback.clamp(0.0, 0.98),
        }
    }
}

impl GraphNode for StringDelayNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let period_samples = if ctx.frequency > 0.0 {
            (ctx.sample_rate / ctx.frequency) as usize
        } else {
            1
        };
        self.delay_line.render(out, period_samples.max(1), self.feedback);
    }

    fn note_on(&mut self, _ctx: &RenderCtx) {
        // Clear the previous note's resonance to avoid clicks
        self.delay_line.reset();
    }
}

/// Plain fixed-time feedback delay, kept for echo-style effects.
pub struct DelayNode {
    delay_line: DelayLine,
    delay_ms: f32,
    feedback: f32,
}

impl DelayNode {
    pub fn new(delay_ms: f32, feedback: f32) -> Self {
        Self {
            delay_line: DelayLine::new(),
            delay_ms,
            feedback: feedback.clamp(0.0, 0.98),
        }
    }
}

impl GraphNode for DelayNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let delay_samples = ((self.delay_ms / 1000.0) * ctx.sample_rate) as usize;
        self.delay_line.render(out, delay_samples.max(1), self.feedback);
    }

    fn note_on(&mut self, _ctx: &RenderCtx) {
        self.delay_line.reset();
    }
}
