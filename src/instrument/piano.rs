use log::debug;

use crate::analysis::note::{nearest_midi, nearest_semitone};
use crate::graph::{node::RenderCtx, GraphNode};
use crate::instrument::{FrequencyRange, Instrument, InstrumentCore};
use crate::styles::PianoStyle;
use crate::MAX_BLOCK_SIZE;

/*
Polyphonic Voice Pool
=====================

The piano allocates a NEW voice for every played note - voices release
independently, so a held chord rings while new notes start. Ids increase
monotonically and are never reused; releasing an unknown or already-released
id is a no-op.

Lifecycle of one voice:

  play_note     graph built, note_on, voice enters the pool
  release_voice note_off (50 ms ramp), dispose time = now + 100 ms
  (render)      voice removed once the clock passes its dispose time,
                or earlier if its graph reports itself finished

The pool is capped at MAX_VOICES. At the cap the voice closest to disposal
is stolen (releasing with the earliest dispose time, else the oldest), which
keeps rapid retriggering bounded while letting chords ring. An unbounded
pool would grow without limit under a fast trill.

Pitch placement differs from the monophonic instruments in one way: after
range folding, the frequency snaps to the nearest equal-tempered semitone.
A piano has keys, not a fretless neck.

The pitch-follow path is deliberately monophonic: a new note name releases
everything first, so following a singer never stacks voices. True polyphony
is only exercised through direct `play_note` calls (an on-screen keyboard,
a replayed recording).
*/

/// Hard cap on simultaneously live voices.
pub const MAX_VOICES: usize = 32;

/// Delay from release to graph disposal; covers the 50 ms ramp with margin.
const TEARDOWN_DELAY: f64 = 0.100;

/// Velocity used when a note is started by the pitch-follow path.
const PITCH_FOLLOW_VELOCITY: f32 = 0.8;

/// Identifier of one pooled voice. Monotonically increasing, never reused.
pub type VoiceId = u64;

struct PoolVoice {
    id: VoiceId,
    graph: Box<dyn GraphNode>,
    frequency: f32,
    velocity: f32,
    gain: f32,
    started_at: f64,
    auto_release_at: Option<f64>,
    /// Clock time at which the graph is dropped, set on release.
    dispose_at: Option<f64>,
}

impl PoolVoice {
    fn is_releasing(&self) -> bool {
        self.dispose_at.is_some()
    }
}

pub struct PianoInstrument {
    core: InstrumentCore,
    style: PianoStyle,
    voices: Vec<PoolVoice>,
    next_id: VoiceId,
    /// Nearest-semitone note the pitch-follow path is currently holding.
    held_midi: Option<i32>,
    scratch: Vec<f32>,
}

impl PianoInstrument {
    pub fn new(sample_rate: f32, style: PianoStyle) -> Self {
        Self {
            core: InstrumentCore::new(sample_rate, FrequencyRange::PIANO),
            style,
            voices: Vec::with_capacity(MAX_VOICES),
            next_id: 0,
            held_midi: None,
            scratch: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn style(&self) -> PianoStyle {
        self.style
    }

    /// New voices use the new style; voices already sounding keep the graphs
    /// they were built with.
    pub fn set_style(&mut self, style: PianoStyle) {
        self.style = style;
    }

    pub fn core(&self) -> &InstrumentCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut InstrumentCore {
        &mut self.core
    }

    /// Number of live voices (sounding or releasing).
    pub fn live_voices(&self) -> usize {
        self.voices.len()
    }

    /// Fold into the piano range, then snap to the nearest equal-tempered
    /// semitone.
    pub fn voice_frequency(&self, frequency: f32) -> f32 {
        let folded = self
            .core
            .voice_frequency(frequency, self.style.params().octave_offset);
        nearest_semitone(folded)
    }

    /// Play a note on a fresh voice and return its id.
    pub fn play_note(&mut self, frequency: f32, velocity: f32, now: f64) -> VoiceId {
        self.start_voice(frequency, velocity, None, now)
    }

    /// Play a note that releases itself after `duration` seconds. Used when
    /// replaying recorded notes with known lengths.
    pub fn play_note_for(
        &mut self,
        frequency: f32,
        velocity: f32,
        duration: f64,
        now: f64,
    ) -> VoiceId {
        self.start_voice(frequency, velocity, Some(now + duration.max(0.0)), now)
    }

    fn start_voice(
        &mut self,
        frequency: f32,
        velocity: f32,
        auto_release_at: Option<f64>,
        now: f64,
    ) -> VoiceId {
        let snapped = self.voice_frequency(frequency);
        let velocity = velocity.clamp(0.0, 1.0);

        if self.voices.len() >= MAX_VOICES {
            self.steal_voice();
        }

        let mut graph = self.style.build(snapped);
        let ctx = RenderCtx::from_freq(self.core.sample_rate(), snapped, velocity).at_time(now);
        graph.note_on(&ctx);

        let id = self.next_id;
        self.next_id += 1;

        debug!("piano voice {id}: {snapped:.1} Hz velocity {velocity:.2}");

        self.voices.push(PoolVoice {
            id,
            graph,
            frequency: snapped,
            velocity,
            gain: self.style.params().base_volume * velocity,
            started_at: now,
            auto_release_at,
            dispose_at: None,
        });
        self.held_midi = Some(nearest_midi(snapped));

        id
    }

    /// Drop the voice closest to disposal: releasing with the earliest
    /// dispose time, else the oldest sounding voice.
    fn steal_voice(&mut self) {
        let victim = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_releasing())
            .min_by(|(_, a), (_, b)| {
                a.dispose_at
                    .partial_cmp(&b.dispose_at)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .or_else(|| {
                self.voices
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| {
                        a.started_at
                            .partial_cmp(&b.started_at)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .map(|(i, _)| i)
            });

        if let Some(index) = victim {
            let voice = self.voices.swap_remove(index);
            debug!("piano pool full: stealing voice {}", voice.id);
        }
    }

    /// Start a voice's 50 ms release ramp; the graph is disposed and removed
    /// 100 ms later. Idempotent: unknown and already-released ids are
    /// no-ops.
    pub fn release_voice(&mut self, id: VoiceId, now: f64) {
        let sample_rate = self.core.sample_rate();
        if let Some(voice) = self
            .voices
            .iter_mut()
            .find(|v| v.id == id && !v.is_releasing())
        {
            let ctx =
                RenderCtx::from_freq(sample_rate, voice.frequency, voice.velocity).at_time(now);
            voice.graph.note_off(&ctx);
            voice.dispose_at = Some(now + TEARDOWN_DELAY);
        }
    }

    /// Release every live voice.
    pub fn release_all(&mut self, now: f64) {
        let ids: Vec<VoiceId> = self
            .voices
            .iter()
            .filter(|v| !v.is_releasing())
            .map(|v| v.id)
            .collect();
        for id in ids {
            self.release_voice(id, now);
        }
        self.held_midi = None;
    }
}

impl Instrument for PianoInstrument {
    /// Pitch-follow is monophonic by policy: a new note name releases every
    /// live voice before the new one starts; the same note sustains.
    fn update_from_pitch(&mut self, frequency: f32, confidence: f32, now: f64) {
        if confidence < 0.5 || frequency <= 0.0 {
            self.release_all(now);
            return;
        }

        let snapped = self.voice_frequency(frequency);
        let midi = nearest_midi(snapped);

        let holding_same = self.held_midi == Some(midi)
            && self.voices.iter().any(|v| !v.is_releasing());
        if holding_same {
            return; // same key held: piano pitch is discrete, no glide
        }

        self.release_all(now);
        self.play_note(snapped, PITCH_FOLLOW_VELOCITY, now);
    }

    fn frequency_range(&self) -> FrequencyRange {
        self.core.range()
    }

    fn set_volume(&mut self, volume: f32) {
        self.core.set_volume(volume);
    }

    fn set_octave_shift(&mut self, shift: i32) {
        self.core.set_octave_shift(shift);
    }

    fn render_block(&mut self, out: &mut [f32], now: f64) {
        out.fill(0.0);
        let sample_rate = self.core.sample_rate();

        // Auto-release timed voices whose duration has elapsed
        let due: Vec<VoiceId> = self
            .voices
            .iter()
            .filter(|v| !v.is_releasing() && v.auto_release_at.is_some_and(|at| at <= now))
            .map(|v| v.id)
            .collect();
        for id in due {
            self.release_voice(id, now);
        }

        // Remove voices whose teardown time has passed or whose graph has
        // rung itself out
        self.voices.retain(|voice| {
            voice.dispose_at.map_or(true, |at| at > now) && voice.graph.is_active()
        });

        for voice in self.voices.iter_mut() {
            let block = &mut self.scratch[..out.len()];
            block.fill(0.0);

            let ctx =
                RenderCtx::from_freq(sample_rate, voice.frequency, voice.velocity).at_time(now);
            voice.graph.render_block(block, &ctx);

            for (o, s) in out.iter_mut().zip(block.iter()) {
                *o += s * voice.gain;
            }
        }

        self.core.finish_block(out);
    }

    fn dispose(&mut self) {
        self.voices.clear();
        self.held_midi = None;
    }
}
