//! Guitar styles, playing range 82-659 Hz.
//!
//! - `Clean`: triangle + sine focused through a bandpass, then a highpass to
//!   clear the mud.
//! - `Distorted`: saw + square driven through a soft-clip curve between two
//!   lowpasses (pre-filter tames the input, post-filter rounds the fizz).
//! - `Acoustic`: triangle plus a decaying noise burst fed into a feedback
//!   delay tuned to the note's period - a rough plucked-string resonance -
//!   then a lowpass/peaking pair for body.
//! - `Muted`: square + triangle into a resonant lowpass, damped by a fast
//!   exponential decay. Palm-mute chug.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::{
    delay::StringDelayNode,
    distortion::ShaperNode,
    envelope::{DecayNode, EnvNode},
    extensions::NodeExt,
    filter::FilterNode,
    oscillator::OscNode,
    GraphNode,
};
use crate::styles::{MonoStyle, StyleParams, MONO_RELEASE};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuitarStyle {
    Clean,
    Distorted,
    Acoustic,
    Muted,
}

impl MonoStyle for GuitarStyle {
    fn params(&self) -> StyleParams {
        match self {
            GuitarStyle::Clean => StyleParams {
                base_volume: 0.8,
                octave_offset: 0,
                glide_time: 0.020,
            },
            GuitarStyle::Distorted => StyleParams {
                base_volume: 0.6,
                octave_offset: 0,
                glide_time: 0.030,
            },
            GuitarStyle::Acoustic => StyleParams {
                base_volume: 0.9,
                octave_offset: 0,
                glide_time: 0.010,
            },
            GuitarStyle::Muted => StyleParams {
                base_volume: 0.8,
                octave_offset: 0,
                glide_time: 0.0,
            },
        }
    }

    fn build(&self, frequency: f32) -> Box<dyn GraphNode> {
        match self {
            GuitarStyle::Clean => Box::new(
                OscNode::triangle()
                    .mix(OscNode::sine(), 0.35)
                    .through(FilterNode::bandpass(2.0 * frequency).with_resonance(0.3))
                    .through(FilterNode::highpass(0.75 * frequency))
                    .amplify(EnvNode::adsr(0.008, 0.15, 0.7, MONO_RELEASE)),
            ),

            GuitarStyle::Distorted => Box::new(
                OscNode::sawtooth()
                    .mix(OscNode::square(), 0.5)
                    .through(FilterNode::lowpass(3.0 * frequency))
                    .through(ShaperNode::soft(8.0))
                    .through(FilterNode::lowpass(4.0 * frequency))
                    .amplify(EnvNode::adsr(0.005, 0.10, 0.8, MONO_RELEASE)),
            ),

            GuitarStyle::Acoustic => Box::new(
                OscNode::triangle()
                    .mix(OscNode::noise().amplify(DecayNode::new(0.030)), 0.4)
                    .through(StringDelayNode::new(0.85))
                    .through(FilterNode::lowpass(5.0 * frequency))
                    .through(FilterNode::peaking(2.0 * frequency, 2.0))
                    .amplify(EnvNode::adsr(0.003, 0.80, 0.0, MONO_RELEASE)),
            ),

            GuitarStyle::Muted => Box::new(
                OscNode::square()
                    .mix(OscNode::triangle(), 0.5)
                    .through(FilterNode::lowpass(1.5 * frequency).with_resonance(0.6))
                    .amplify(DecayNode::new(0.120)),
            ),
        }
    }
}
