use crate::{graph::node::RenderCtx, MIN_TIME};

/*
Envelope Generators
===================

Two generators live here:

  Envelope   Linear ADSR. The workhorse for note dynamics. note_on starts the
             attack from zero; note_off starts the release from the CURRENT
             level, whatever stage we are in. Snapshotting the current level
             at note_off implicitly cancels any in-flight ramp and replaces
             it with a single ramp to zero, so ramps never compound.

  ExpDecay   One-shot exponential decay. Used for percussive layers that
             never sustain: metronome clicks, hammer/pluck noise transients,
             muted-string damping.

The ADSR shape:

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release

Release is special: we snapshot the starting level and total samples at
note_off time, then interpolate linearly. This ensures we hit exactly 0.0.
*/

/// The current stage of the envelope state machine.
#[derive(Debug, Clone, Copy)]
pub enum EnvelopeState {
    Idle,    // Gate low, envelope inactive, level = 0
    Attack,  // Gate just went high, ramping up to 1.0
    Decay,   // Reached peak, ramping down to sustain level
    Sustain, // Holding at sustain level while gate is high
    Release, // Gate went low, ramping down to 0
}

pub struct Envelope {
    // ADSR parameters (set once, define the envelope shape)
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,

    // Runtime state (changes every sample)
    stage: EnvelopeState,
    level: f32,

    decay_start_level: f32,

    // Release bookkeeping (pre-calculated at note_off for precision)
    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Envelope {
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack_time: attack.max(MIN_TIME),
            decay_time: decay.max(MIN_TIME),
            sustain_level: sustain.clamp(0.0, 1.0),
            release_time: release.max(MIN_TIME),

            stage: EnvelopeState::Idle,
            level: 0.0,
            decay_start_level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        }
    }

    /// Gate high: start the attack phase from zero.
    ///
    /// This resets the envelope for a clean retrigger, so repeated notes
    /// sound distinct rather than "tied together".
    pub fn note_on(&mut self, _ctx: &RenderCtx) {
        self.level = 0.0;
        self.stage = EnvelopeState::Attack;
        self.release_elapsed_samples = 0;
    }

    /// Gate low: start the release phase from the current level.
    pub fn note_off(&mut self, ctx: &RenderCtx) {
        if matches!(self.stage, EnvelopeState::Idle) {
            return;
        }

        // Snapshot current level - we'll interpolate from here to 0
        self.release_start_level = self.level;

        if self.release_time <= MIN_TIME {
            self.release_total_samples = 1;
        } else {
            self.release_total_samples =
                (self.release_time * ctx.sample_rate).round().max(1.0) as u32;
        }

        self.release_elapsed_samples = 0;
        self.stage = EnvelopeState::Release;
    }

    /// Advance the envelope by one sample.
    pub fn next_sample(&mut self, ctx: &RenderCtx) {
        match self.stage {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                let increment = 1.0 / (self.attack_time * ctx.sample_rate);
                self.level += increment;

                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.decay_start_level = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                let target = self.sustain_level;
                let total_drop = self.decay_start_level - target;
                let decrement = total_drop / (self.decay_time * ctx.sample_rate);
                self.level -= decrement;

                if self.level <= target {
                    self.level = target;
                    // A zero-sustain envelope is one-shot: done when the
                    // decay reaches the floor, no gate-low needed
                    self.stage = if target <= 0.0 {
                        EnvelopeState::Idle
                    } else {
                        EnvelopeState::Sustain
                    };
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.sustain_level;
            }

            EnvelopeState::Release => {
                // Linear interpolation from release_start_level to 0
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);

                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);

                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
    }

    /// Render a block of envelope values into the buffer.
    pub fn render(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        for sample in buffer.iter_mut() {
            self.next_sample(ctx);
            *sample = self.level;
        }
    }

    /// Returns true if the envelope is producing output (not idle).
    pub fn is_active(&self) -> bool {
        !matches!(self.stage, EnvelopeState::Idle)
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.decay_start_level = 0.0;
        self.release_elapsed_samples = 0;
        self.release_start_level = 0.0;
    }

    /// Get the current envelope level (0.0 to 1.0)
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }
}

/// One-shot exponential decay: jumps to 1.0 on trigger, then decays by a
/// constant per-sample factor. Considered finished below an audibility floor.
pub struct ExpDecay {
    decay_time: f32,
    level: f32,
    active: bool,
}

/// Level below which the decay is treated as silence.
const DECAY_FLOOR: f32 = 1e-4;

impl ExpDecay {
    pub fn new(decay_time: f32) -> Self {
        Self {
            decay_time: decay_time.max(MIN_TIME),
            level: 0.0,
            active: false,
        }
    }

    pub fn trigger(&mut self) {
        self.level = 1.0;
        self.active = true;
    }

    /// Per-sample multiplier so the level crosses the floor after
    /// `decay_time` seconds: coeff = floor^(1 / (decay_time * sr)).
    #[inline]
    fn coefficient(&self, sample_rate: f32) -> f32 {
        DECAY_FLOOR.powf(1.0 / (self.decay_time * sample_rate))
    }

    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        if !self.active {
            return 0.0;
        }

        let out = self.level;
        self.level *= self.coefficient(sample_rate);
        if self.level < DECAY_FLOOR {
            self.level = 0.0;
            self.active = false;
        }
        out
    }

    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(sample_rate);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
        self.active = false;
    }
}
