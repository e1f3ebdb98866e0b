use log::debug;

use crate::graph::{node::RenderCtx, GraphNode};
use crate::instrument::{FrequencyRange, Instrument, InstrumentCore};
use crate::styles::{MonoStyle, StyleParams};
use crate::MAX_BLOCK_SIZE;

/*
Monophonic Voice Manager
========================

Bass and guitar play one note at a time. The manager owns at most one
SOUNDING per-note graph; stopping a note does not destroy it immediately:

  stop_note
    -> graph.note_off         (5 ms release ramp, from the current level)
    -> moved to `draining`    (keeps rendering so the ramp is audible)
    -> dropped 10 ms later    (teardown deferred past the ramp's end)

so a fast retrigger overlaps the dying note's last milliseconds instead of
clicking. The pitch-follow path glides rather than retriggers: while a note
is sounding, a new pitch ramps the oscillator frequency linearly over the
style's glide time (legato), and only a loss of pitch confidence releases
the note.

Velocity is applied as a one-shot gain on the triggered note (style base
volume x velocity), captured at trigger time. It does not persist as
instrument state.
*/

/// Delay between the release ramp starting and the graph being dropped.
const TEARDOWN_DELAY: f64 = 0.010;

/// Velocity used when a note is started by the pitch-follow path, which has
/// no amplitude of its own.
const PITCH_FOLLOW_VELOCITY: f32 = 0.8;

struct ActiveNote {
    graph: Box<dyn GraphNode>,
    /// Current oscillator frequency; moves toward `target_frequency` while
    /// gliding.
    frequency: f32,
    target_frequency: f32,
    /// Hz per second toward the target; 0 retunes instantly.
    glide_rate: f32,
    /// One-shot note gain: style base volume x trigger velocity.
    gain: f32,
    velocity: f32,
    auto_release_at: Option<f64>,
    /// Set once released; the graph is dropped when the clock passes it.
    dispose_at: Option<f64>,
}

pub struct MonoInstrument<S: MonoStyle> {
    core: InstrumentCore,
    style: S,
    active: Option<ActiveNote>,
    /// Released notes still rendering out their declick ramp.
    draining: Vec<ActiveNote>,
    scratch: Vec<f32>,
}

impl<S: MonoStyle> MonoInstrument<S> {
    pub fn new(sample_rate: f32, range: FrequencyRange, style: S) -> Self {
        Self {
            core: InstrumentCore::new(sample_rate, range),
            style,
            active: None,
            draining: Vec::with_capacity(4),
            scratch: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn style(&self) -> S {
        self.style
    }

    pub fn core(&self) -> &InstrumentCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut InstrumentCore {
        &mut self.core
    }

    pub fn is_sounding(&self) -> bool {
        self.active.is_some()
    }

    /// Frequency of the currently sounding note (its glide target).
    pub fn sounding_frequency(&self) -> Option<f32> {
        self.active.as_ref().map(|note| note.target_frequency)
    }

    #[cfg(test)]
    pub(crate) fn draining_count(&self) -> usize {
        self.draining.len()
    }

    /// Trigger a note, folding the frequency into the instrument's range.
    /// Any sounding note is stopped first. With `duration` set, the note
    /// auto-releases that many seconds later.
    pub fn trigger_note(&mut self, frequency: f32, velocity: f32, duration: Option<f64>, now: f64) {
        let folded = self
            .core
            .voice_frequency(frequency, self.style.params().octave_offset);
        self.start_note(folded, velocity, duration, now);
    }

    /// Trigger at an exact frequency, skipping range folding. Used to replay
    /// previously captured frequencies verbatim.
    pub fn play_note_at_frequency(&mut self, frequency: f32, velocity: f32, now: f64) {
        if frequency <= 0.0 || !frequency.is_finite() {
            return;
        }
        self.start_note(frequency, velocity, None, now);
    }

    fn start_note(&mut self, frequency: f32, velocity: f32, duration: Option<f64>, now: f64) {
        self.stop_note(now);

        let params: StyleParams = self.style.params();
        let velocity = velocity.clamp(0.0, 1.0);

        let mut graph = self.style.build(frequency);
        let ctx = RenderCtx::from_freq(self.core.sample_rate(), frequency, velocity).at_time(now);
        graph.note_on(&ctx);

        debug!("mono trigger: {frequency:.1} Hz velocity {velocity:.2}");

        self.active = Some(ActiveNote {
            graph,
            frequency,
            target_frequency: frequency,
            glide_rate: 0.0,
            gain: params.base_volume * velocity,
            velocity,
            auto_release_at: duration.map(|d| now + d.max(0.0)),
            dispose_at: None,
        });
    }

    /// Release the sounding note: 5 ms ramp to silence, teardown 10 ms
    /// later. No-op when silent.
    pub fn stop_note(&mut self, now: f64) {
        if let Some(mut note) = self.active.take() {
            let ctx = RenderCtx::from_freq(self.core.sample_rate(), note.frequency, note.velocity)
                .at_time(now);
            note.graph.note_off(&ctx);
            note.dispose_at = Some(now + TEARDOWN_DELAY);
            self.draining.push(note);
        }
    }

    /// Glide the sounding note toward a new frequency over the style's
    /// glide time. No-op when silent.
    pub fn glide_to_frequency(&mut self, frequency: f32, _now: f64) {
        let folded = self
            .core
            .voice_frequency(frequency, self.style.params().octave_offset);
        let glide_time = self.style.params().glide_time.clamp(0.0, 0.050);

        if let Some(note) = self.active.as_mut() {
            note.target_frequency = folded;
            if glide_time <= 0.0 {
                note.frequency = folded;
                note.glide_rate = 0.0;
            } else {
                note.glide_rate = (folded - note.frequency) / glide_time;
            }
        }
    }

    /// Switch style. A sounding note is stopped and immediately re-triggered
    /// at its held frequency with the new style's topology.
    pub fn set_style(&mut self, style: S, now: f64) {
        self.style = style;
        if let Some(note) = self.active.as_ref() {
            let frequency = note.target_frequency;
            let velocity = note.velocity;
            self.start_note(frequency, velocity, None, now);
        }
    }

    fn render_note(
        scratch: &mut [f32],
        out: &mut [f32],
        note: &mut ActiveNote,
        sample_rate: f32,
        now: f64,
    ) {
        let block = &mut scratch[..out.len()];
        block.fill(0.0);

        let ctx = RenderCtx::from_freq(sample_rate, note.frequency, note.velocity).at_time(now);
        note.graph.render_block(block, &ctx);

        for (o, s) in out.iter_mut().zip(block.iter()) {
            *o += s * note.gain;
        }

        // Advance any glide, block-granular
        if note.frequency != note.target_frequency && note.glide_rate != 0.0 {
            let step = note.glide_rate * (out.len() as f32 / sample_rate);
            let next = note.frequency + step;
            let overshot = (note.glide_rate > 0.0 && next >= note.target_frequency)
                || (note.glide_rate < 0.0 && next <= note.target_frequency);
            note.frequency = if overshot { note.target_frequency } else { next };
        }
    }
}

impl<S: MonoStyle> Instrument for MonoInstrument<S> {
    /// Continuous pitch tracking: low confidence releases, silence-to-pitch
    /// triggers, pitch-to-pitch glides.
    fn update_from_pitch(&mut self, frequency: f32, confidence: f32, now: f64) {
        if confidence < 0.5 || frequency <= 0.0 {
            self.stop_note(now);
        } else if self.active.is_some() {
            self.glide_to_frequency(frequency, now);
        } else {
            self.trigger_note(frequency, PITCH_FOLLOW_VELOCITY, None, now);
        }
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

        // Auto-release one-shot notes whose duration has elapsed
        if let Some(note) = self.active.as_ref() {
            if note.auto_release_at.is_some_and(|at| at <= now) {
                self.stop_note(now);
            }
        }

        let mut note_finished = false;
        if let Some(note) = self.active.as_mut() {
            Self::render_note(&mut self.scratch, out, note, sample_rate, now);
            // A self-terminating graph (e.g. a fully decayed mute) frees the
            // voice without an explicit stop
            note_finished = !note.graph.is_active();
        }
        if note_finished {
            self.active = None;
        }

        // Draining notes keep sounding until their teardown time passes
        self.draining
            .retain(|note| note.dispose_at.map_or(true, |at| at > now));
        for note in self.draining.iter_mut() {
            Self::render_note(&mut self.scratch, out, note, sample_rate, now);
        }

        self.core.finish_block(out);
    }

    fn dispose(&mut self) {
        self.active = None;
        self.draining.clear();
    }
}
