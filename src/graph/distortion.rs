use crate::{
    dsp::distortion::soft_clip_buffer,
    graph::node::{GraphNode, RenderCtx},
};

/// Nonlinear waveshaper. Sits between two filters in the distorted guitar
/// chain: the pre-filter tames what hits the curve, the post-filter rounds
/// off the harmonics the curve adds.
pub struct ShaperNode {
    drive: f32,
}

impl ShaperNode {
    pub fn soft(drive: f32) -> Self {
        Self {
            drive: drive.max(1.0),
        }
    }
}

impl GraphNode for ShaperNode {
    fn render_block(&mut self, out: &mut [f32], _ctx: &RenderCtx) {
        soft_clip_buffer(out, self.drive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{extensions::NodeExt, oscillator::OscNode};

    #[test]
    fn shaping_compresses_peaks() {
        let mut clean = OscNode::sawtooth();
        let mut driven = OscNode::sawtooth().through(ShaperNode::soft(8.0));
        let ctx = RenderCtx::from_freq(48_000.0, 220.0, 1.0);

        let mut clean_buffer = vec![0.0f32; 512];
        let mut driven_buffer = vec![0.0f32; 512];
        clean.render_block(&mut clean_buffer, &ctx);
        driven.render_block(&mut driven_buffer, &ctx);

        let driven_peak = driven_buffer.iter().fold(0.0f32, |a, &x| a.max(x.abs()));
        assert!(driven_peak < 1.0, "soft clip must stay under unity");

        // Drive flattens the waveform: the average level rises relative to
        // the peak compared to the clean saw.
        let avg = |b: &[f32]| b.iter().map(|s| s.abs()).sum::<f32>() / b.len() as f32;
        assert!(avg(&driven_buffer) / driven_peak > avg(&clean_buffer) / 1.0);
    }
}
