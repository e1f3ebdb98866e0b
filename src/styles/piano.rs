//! Piano styles: additive harmonic stacks with a hammer transient.
//!
//! Each voice is an 8-partial harmonic stack (amplitudes rolling off roughly
//! as 1/n, higher partials decaying faster) layered with a bandpass-filtered
//! noise burst that approximates the hammer strike. Styles differ in their
//! harmonic curve, sustain length, and brightness tilt.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::{
    envelope::DecayNode,
    extensions::NodeExt,
    filter::FilterNode,
    harmonics::HarmonicStack,
    oscillator::OscNode,
    GraphNode,
};

/// Release ramp applied when a pooled voice is released.
pub(crate) const PIANO_RELEASE: f32 = 0.050;

/// Immutable per-style parameters for the pooled piano voices.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct PianoParams {
    pub base_volume: f32,
    pub octave_offset: i32,
    /// Fixed per-harmonic amplitude curve, fundamental first.
    pub harmonic_amps: [f32; 8],
    pub attack: f32,
    /// Decay time of the fundamental; how long a held note rings.
    pub sustain: f32,
    /// Spectral tilt in (0, 1]: lower = mellower upper partials.
    pub brightness: f32,
    /// Wet amount of the hammer-strike noise layer.
    pub transient_mix: f32,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PianoStyle {
    Grand,
    Electric,
}

impl PianoStyle {
    pub fn params(&self) -> PianoParams {
        match self {
            PianoStyle::Grand => PianoParams {
                base_volume: 0.8,
                octave_offset: 0,
                harmonic_amps: [1.0, 0.5, 0.33, 0.25, 0.2, 0.16, 0.14, 0.125],
                attack: 0.003,
                sustain: 3.0,
                brightness: 0.9,
                transient_mix: 0.25,
            },
            PianoStyle::Electric => PianoParams {
                base_volume: 0.7,
                octave_offset: 0,
                harmonic_amps: [1.0, 0.7, 0.2, 0.4, 0.1, 0.05, 0.04, 0.03],
                attack: 0.002,
                sustain: 1.2,
                brightness: 0.6,
                transient_mix: 0.35,
            },
        }
    }

    /// Build the per-note graph for a (folded and snapped) note frequency.
    pub fn build(&self, frequency: f32) -> Box<dyn GraphNode> {
        let params = self.params();

        let stack = HarmonicStack::new(
            &params.harmonic_amps,
            params.attack,
            params.sustain,
            PIANO_RELEASE,
            params.brightness,
        );

        // Hammer strike: a fast noise burst focused around the upper
        // partials of the note
        let strike_center = (frequency * 6.0).min(8_000.0);
        let transient = OscNode::noise()
            .through(FilterNode::bandpass(strike_center).with_resonance(0.4))
            .amplify(DecayNode::new(0.020));

        Box::new(stack.mix(transient, params.transient_mix))
    }
}
