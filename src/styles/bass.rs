//! Bass styles.
//!
//! Four takes on the low end, all folded into the 41-165 Hz playing range by
//! the instrument before the recipe runs:
//!
//! - `Sub`: one pure sine. Felt more than heard.
//! - `Synth`: saw + square + sub-octave sine through a resonant lowpass that
//!   opens up to 4x the note frequency as the note starts.
//! - `Pluck`: saw + sub-octave sine with the classic filter "plonk" - the
//!   cutoff sweeps from 8x down to 2x the note over 150 ms.
//! - `Wobble`: saw + square with a 4 Hz LFO riding the filter cutoff.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::{
    envelope::EnvNode,
    extensions::NodeExt,
    filter::{FilterNode, FilterParam},
    lfo::LfoNode,
    oscillator::OscNode,
    GraphNode,
};
use crate::styles::{MonoStyle, StyleParams, MONO_RELEASE};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BassStyle {
    Sub,
    Synth,
    Pluck,
    Wobble,
}

impl MonoStyle for BassStyle {
    fn params(&self) -> StyleParams {
        match self {
            BassStyle::Sub => StyleParams {
                base_volume: 0.9,
                octave_offset: 0,
                glide_time: 0.030,
            },
            BassStyle::Synth => StyleParams {
                base_volume: 0.7,
                octave_offset: 0,
                glide_time: 0.020,
            },
            BassStyle::Pluck => StyleParams {
                base_volume: 0.8,
                octave_offset: 0,
                glide_time: 0.0,
            },
            BassStyle::Wobble => StyleParams {
                base_volume: 0.7,
                octave_offset: 0,
                glide_time: 0.040,
            },
        }
    }

    fn build(&self, frequency: f32) -> Box<dyn GraphNode> {
        match self {
            BassStyle::Sub => Box::new(
                OscNode::sine().amplify(EnvNode::adsr(0.010, 0.08, 0.9, MONO_RELEASE)),
            ),

            BassStyle::Synth => Box::new(
                OscNode::sawtooth()
                    .mix(OscNode::square(), 0.5)
                    .mix(OscNode::sine().with_ratio(0.5), 0.35)
                    .through(
                        // Cutoff rises from the fundamental up to 4x as the
                        // sweep envelope decays away
                        FilterNode::lowpass(4.0 * frequency)
                            .with_resonance(0.6)
                            .modulate(
                                EnvNode::adsr(0.001, 0.06, 0.0, MONO_RELEASE),
                                FilterParam::Cutoff,
                                -3.0 * frequency,
                            ),
                    )
                    .amplify(EnvNode::adsr(0.008, 0.10, 0.8, MONO_RELEASE)),
            ),

            BassStyle::Pluck => Box::new(
                OscNode::sawtooth()
                    .mix(OscNode::sine().with_ratio(0.5), 0.35)
                    .through(
                        // 8x down to 2x the note over 150 ms
                        FilterNode::lowpass(2.0 * frequency).modulate(
                            EnvNode::adsr(0.001, 0.150, 0.0, MONO_RELEASE),
                            FilterParam::Cutoff,
                            6.0 * frequency,
                        ),
                    )
                    .amplify(EnvNode::adsr(0.002, 0.30, 0.0, MONO_RELEASE)),
            ),

            BassStyle::Wobble => Box::new(
                OscNode::sawtooth()
                    .mix(OscNode::square(), 0.5)
                    .through(
                        FilterNode::lowpass(3.0 * frequency)
                            .with_resonance(0.7)
                            .modulate(LfoNode::sine(4.0), FilterParam::Cutoff, 2.0 * frequency),
                    )
                    .amplify(EnvNode::adsr(0.010, 0.10, 0.8, MONO_RELEASE)),
            ),
        }
    }
}
