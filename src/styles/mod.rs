//! Per-style parameter tables and graph-construction recipes.
//!
//! Every playing style is a variant of a small enum with two jobs: report its
//! immutable `StyleParams`, and build the DSP graph for one note. The voice
//! managers stay completely generic over style - they trigger, glide, and
//! tear down whatever graph the recipe hands them.
//!
//! Recipes are written with the fluent graph combinators; each one reads as
//! its signal chain. They take the (already folded) note frequency because
//! filter cutoffs and sweep depths scale with the note being played.

mod bass;
mod guitar;
mod piano;

pub use bass::BassStyle;
pub use guitar::GuitarStyle;
pub use piano::{PianoParams, PianoStyle};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::GraphNode;

/// Immutable per-style parameters for the monophonic instruments.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct StyleParams {
    /// Gain applied to every note of this style, scaled by note velocity.
    pub base_volume: f32,
    /// Octaves added to the instrument's user octave shift before folding.
    pub octave_offset: i32,
    /// Portamento time in seconds (0 = retune instantly), capped at 50 ms.
    pub glide_time: f32,
}

/// A monophonic playing style: parameter table plus graph recipe.
pub trait MonoStyle: Copy + Send + 'static {
    fn params(&self) -> StyleParams;

    /// Build the per-note graph for a note at `frequency` Hz.
    fn build(&self, frequency: f32) -> Box<dyn GraphNode>;
}

/// Release ramp applied when a monophonic note stops: long enough to avoid a
/// click, short enough to feel immediate.
pub(crate) const MONO_RELEASE: f32 = 0.005;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::RenderCtx;

    fn renders_nonsilent_finite(mut graph: Box<dyn GraphNode>, frequency: f32) {
        let ctx = RenderCtx::from_freq(48_000.0, frequency, 0.8);
        graph.note_on(&ctx);

        let mut buffer = vec![0.0f32; 2048];
        graph.render_block(&mut buffer, &ctx);

        assert!(
            buffer.iter().any(|&s| s.abs() > 1e-3),
            "style graph should produce sound after note_on"
        );
        assert!(buffer.iter().all(|&s| s.is_finite()));
    }

    #[test]
    fn every_bass_style_builds_a_sounding_graph() {
        for style in [
            BassStyle::Sub,
            BassStyle::Synth,
            BassStyle::Pluck,
            BassStyle::Wobble,
        ] {
            renders_nonsilent_finite(style.build(80.0), 80.0);
        }
    }

    #[test]
    fn every_guitar_style_builds_a_sounding_graph() {
        for style in [
            GuitarStyle::Clean,
            GuitarStyle::Distorted,
            GuitarStyle::Acoustic,
            GuitarStyle::Muted,
        ] {
            renders_nonsilent_finite(style.build(196.0), 196.0);
        }
    }

    #[test]
    fn every_piano_style_builds_a_sounding_graph() {
        for style in [PianoStyle::Grand, PianoStyle::Electric] {
            renders_nonsilent_finite(style.build(261.63), 261.63);
        }
    }

    #[test]
    fn glide_times_stay_within_portamento_cap() {
        for params in [
            BassStyle::Sub.params(),
            BassStyle::Synth.params(),
            BassStyle::Pluck.params(),
            BassStyle::Wobble.params(),
            GuitarStyle::Clean.params(),
            GuitarStyle::Distorted.params(),
            GuitarStyle::Acoustic.params(),
            GuitarStyle::Muted.params(),
        ] {
            assert!((0.0..=0.050).contains(&params.glide_time));
            assert!((0.0..=1.0).contains(&params.base_volume));
        }
    }
}
