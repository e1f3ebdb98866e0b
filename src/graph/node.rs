/// Context passed to graph nodes during rendering.
///
/// Contains what to render this block:
/// - sample_rate: audio sample rate (e.g., 48000.0)
/// - frequency: pitch to render (Hz)
/// - velocity: intensity/loudness, 0.0-1.0
/// - time: block start time on the audio clock, seconds
pub struct RenderCtx {
    pub sample_rate: f32,
    pub frequency: f32,
    pub velocity: f32,
    pub time: f64,
}

impl RenderCtx {
    pub fn from_freq(sample_rate: f32, frequency: f32, velocity: f32) -> Self {
        Self {
            sample_rate,
            frequency,
            velocity,
            time: 0.0,
        }
    }

    pub fn at_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }
}

/// Trait for nodes that support parameter modulation
pub trait Modulatable: Send {
    type Param: Copy + Send;

    fn get_param(&self, param: Self::Param) -> f32;

    fn apply_modulation(&mut self, param: Self::Param, base: f32, modulation: f32);
}

/// Core trait for audio processing graph nodes
///
/// Nodes can render audio and respond to note events.
pub trait GraphNode: Send {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx);

    /// Triggered when a note starts.
    ///
    /// Default implementation does nothing (passthrough nodes).
    fn note_on(&mut self, _ctx: &RenderCtx) {}

    /// Triggered when a note is released.
    ///
    /// Default implementation does nothing (passthrough nodes).
    fn note_off(&mut self, _ctx: &RenderCtx) {}

    /// Check if this node is still producing sound.
    ///
    /// Voice managers use this to know when a voice graph can be freed.
    fn is_active(&self) -> bool {
        true
    }
}

/// Allow boxed graph nodes to be used as graph nodes (for dynamic dispatch)
impl GraphNode for Box<dyn GraphNode> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        (**self).render_block(out, ctx)
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        (**self).note_on(ctx)
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        (**self).note_off(ctx)
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}
