//! Instrument management: the shared per-instrument infrastructure and the
//! two voice-ownership models built on top of it.
//!
//! `InstrumentCore` is the common base every instrument composes: master
//! volume, octave shift, frequency-range folding, and the secondary output
//! tap. `MonoInstrument` (bass, guitar) owns at most one sounding note;
//! `PianoInstrument` owns a pool of independently-releasing voices.

/// Monophonic voice manager (bass, guitar).
pub mod mono;
/// Polyphonic voice pool (piano).
pub mod piano;

pub use mono::MonoInstrument;
pub use piano::PianoInstrument;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Playable range of an instrument. Frequencies outside it are folded back
/// in by octave shifts, never rejected.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyRange {
    pub min: f32,
    pub max: f32,
}

impl FrequencyRange {
    /// Electric bass: E1 up a couple of octaves.
    pub const BASS: FrequencyRange = FrequencyRange { min: 41.0, max: 165.0 };
    /// Guitar: low E2 to E5.
    pub const GUITAR: FrequencyRange = FrequencyRange { min: 82.0, max: 659.0 };
    /// Piano: A0 to C8.
    pub const PIANO: FrequencyRange = FrequencyRange { min: 27.5, max: 4186.0 };

    /// Fold a positive frequency into the range by halving while above the
    /// maximum and doubling while below the minimum.
    ///
    /// Terminates for any finite positive input because the range spans at
    /// least one octave (max >= 2 * min), so each loop makes progress and
    /// they never fight each other.
    pub fn fold(&self, frequency: f32) -> f32 {
        debug_assert!(self.max >= self.min * 2.0, "range must span an octave");

        if !frequency.is_finite() || frequency <= 0.0 {
            return self.min;
        }

        let mut folded = frequency;
        while folded > self.max {
            folded *= 0.5;
        }
        while folded < self.min {
            folded *= 2.0;
        }
        folded
    }

    pub fn contains(&self, frequency: f32) -> bool {
        (self.min..=self.max).contains(&frequency)
    }
}

/// Shared per-instrument state: the master output stage and pitch placement.
///
/// Instruments embed this by composition and run every rendered block
/// through `finish_block`, which applies the master gain and feeds the
/// secondary tap.
pub struct InstrumentCore {
    sample_rate: f32,
    range: FrequencyRange,
    volume: f32,
    octave_shift: i32,
    #[cfg(feature = "rtrb")]
    tap: Option<rtrb::Producer<f32>>,
}

impl InstrumentCore {
    pub fn new(sample_rate: f32, range: FrequencyRange) -> Self {
        Self {
            sample_rate,
            range,
            volume: 1.0,
            octave_shift: 0,
            #[cfg(feature = "rtrb")]
            tap: None,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn range(&self) -> FrequencyRange {
        self.range
    }

    /// Master volume, clamped to [0, 1].
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Octave shift, clamped to [-2, 2].
    pub fn set_octave_shift(&mut self, shift: i32) {
        self.octave_shift = shift.clamp(-2, 2);
    }

    pub fn octave_shift(&self) -> i32 {
        self.octave_shift
    }

    /// Place a voiced frequency on this instrument: apply the octave shift
    /// (user shift plus the style's offset), then fold into range.
    pub fn voice_frequency(&self, frequency: f32, style_octave_offset: i32) -> f32 {
        let shifted = frequency * 2.0_f32.powi(self.octave_shift + style_octave_offset);
        self.range.fold(shifted)
    }

    /// Tap the master output for simultaneous monitoring and capture. The
    /// consumer side is owned by a recorder; samples are dropped when it
    /// falls behind.
    #[cfg(feature = "rtrb")]
    pub fn connect_secondary(&mut self, tap: rtrb::Producer<f32>) {
        self.tap = Some(tap);
    }

    #[cfg(feature = "rtrb")]
    pub fn disconnect_secondary(&mut self) {
        self.tap = None;
    }

    /// Master output stage: apply the master gain, then feed the tap.
    pub fn finish_block(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample *= self.volume;
        }

        #[cfg(feature = "rtrb")]
        if let Some(tap) = self.tap.as_mut() {
            for &sample in out.iter() {
                let _ = tap.push(sample); // recorder fell behind: drop
            }
        }
    }
}

/// The surface every instrument exposes to the rest of the system. Styles
/// differ per instrument, so `set_style` and direct triggering live on the
/// concrete types.
pub trait Instrument: Send {
    /// Continuous pitch-follow path. Low confidence means "no signal".
    fn update_from_pitch(&mut self, frequency: f32, confidence: f32, now: f64);

    fn frequency_range(&self) -> FrequencyRange;

    fn set_volume(&mut self, volume: f32);

    fn set_octave_shift(&mut self, shift: i32);

    /// Render one block of this instrument's master output into `out`
    /// (overwrites), with `now` the block-start time on the audio clock.
    fn render_block(&mut self, out: &mut [f32], now: f64);

    /// Tear everything down. Must tolerate being called more than once.
    fn dispose(&mut self);
}
