use log::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::analysis::frame::AnalysisFrame;
use crate::analysis::note::note_name;

/*
Onset / Offset Detection
========================

A two-state machine over smoothed loudness:

          smoothed >= onset_threshold
          AND pitch is valid
          AND onset interval elapsed
  Silent ─────────────────────────────→ Sustaining
         ←─────────────────────────────
          smoothed < offset_threshold

The two thresholds are deliberately different (hysteresis): a single
threshold would chatter on/off every frame while the level hovers around it.
The offset threshold sits at half the onset threshold by default, so a note
has to fall well below its trigger level before it ends.

Loudness is the RMS of each frame, smoothed with a 5-frame moving average so
a single hot or dropped frame can't flip the state.

Two time guards keep the event stream musical rather than literal:

  min_onset_interval  a new onset can't start within 100 ms of the previous
                      one (vocal flutter isn't retriggering)

  min_duration        an offset computed less than 50 ms after its onset
                      resets the state but reports NO event - sub-50 ms
                      blips are treated as noise and silently discarded.
                      This is policy, not an accident: the consumer never
                      sees a note too short to have been intentional.
*/

/// Thresholds and timing guards. All times in seconds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Smoothed RMS level that starts a note.
    pub onset_threshold: f32,
    /// Smoothed RMS level that ends a note. Kept below the onset threshold.
    pub offset_threshold: f32,
    /// Minimum pitch confidence for an onset to fire.
    pub min_confidence: f32,
    /// Minimum spacing between consecutive onsets.
    pub min_onset_interval: f64,
    /// Notes shorter than this are dropped without an event.
    pub min_duration: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            onset_threshold: 0.03,
            offset_threshold: 0.015,
            min_confidence: 0.6,
            min_onset_interval: 0.100,
            min_duration: 0.050,
        }
    }
}

impl DetectorConfig {
    /// Enforce the hysteresis invariant: the offset threshold must sit below
    /// the onset threshold. Invalid configurations are normalized, not
    /// rejected.
    fn normalized(mut self) -> Self {
        self.onset_threshold = self.onset_threshold.max(0.0);
        if self.offset_threshold >= self.onset_threshold {
            self.offset_threshold = self.onset_threshold * 0.5;
        }
        self.min_onset_interval = self.min_onset_interval.max(0.0);
        self.min_duration = self.min_duration.max(0.0);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Silent,
    Sustaining,
}

/// The note currently being held, captured at its onset.
#[derive(Debug, Clone)]
pub struct HeldNote {
    pub frequency: f32,
    pub name: String,
    pub velocity: f32,
    pub onset_time: f64,
}

/// A detected note boundary. Exactly one `Onset` precedes any `Offset`.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteEvent {
    Onset {
        frequency: f32,
        note: String,
        velocity: f32,
        time: f64,
    },
    Offset {
        frequency: f32,
        note: String,
        velocity: f32,
        time: f64,
        /// Seconds between the onset and this offset.
        duration: f64,
    },
}

/// Smoothed RMS level used as velocity reference: a smoothed RMS of 0.1 maps
/// to full velocity.
const FULL_VELOCITY_RMS: f32 = 0.1;

const SMOOTHING_WINDOW: usize = 5;

/// Moving average over the last few RMS values. Averages over however many
/// samples have arrived until the window fills.
struct RmsSmoother {
    window: [f32; SMOOTHING_WINDOW],
    next: usize,
    filled: usize,
}

impl RmsSmoother {
    fn new() -> Self {
        Self {
            window: [0.0; SMOOTHING_WINDOW],
            next: 0,
            filled: 0,
        }
    }

    fn push(&mut self, rms: f32) -> f32 {
        self.window[self.next] = rms;
        self.next = (self.next + 1) % SMOOTHING_WINDOW;
        self.filled = (self.filled + 1).min(SMOOTHING_WINDOW);

        self.window[..self.filled.max(1)].iter().sum::<f32>() / self.filled.max(1) as f32
    }

    fn reset(&mut self) {
        self.window = [0.0; SMOOTHING_WINDOW];
        self.next = 0;
        self.filled = 0;
    }
}

/// Classifies a continuous amplitude+pitch stream into onset/offset events.
///
/// Purely a state machine: call `analyze` once per polling tick with the
/// current frame. Performs no audio-graph work.
pub struct OnsetDetector {
    config: DetectorConfig,
    state: DetectorState,
    smoother: RmsSmoother,
    held: Option<HeldNote>,
    last_onset_time: f64,
}

impl OnsetDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config: config.normalized(),
            state: DetectorState::Silent,
            smoother: RmsSmoother::new(),
            held: None,
            last_onset_time: f64::NEG_INFINITY,
        }
    }

    pub fn set_config(&mut self, config: DetectorConfig) {
        self.config = config.normalized();
    }

    pub fn config(&self) -> DetectorConfig {
        self.config
    }

    /// Reset to a clean silent state, ready for a new take.
    pub fn start(&mut self) {
        self.state = DetectorState::Silent;
        self.smoother.reset();
        self.held = None;
        self.last_onset_time = f64::NEG_INFINITY;
    }

    /// Force an offset for any held note, then reset to silent.
    pub fn stop(&mut self, now: f64) -> Option<NoteEvent> {
        let event = self.force_offset(now);
        self.start();
        event
    }

    pub fn is_sustaining(&self) -> bool {
        self.state == DetectorState::Sustaining
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// The note currently being held, if any.
    pub fn current_note(&self) -> Option<&HeldNote> {
        self.held.as_ref()
    }

    /// Classify one frame. Returns at most one event per tick.
    pub fn analyze(&mut self, frame: &AnalysisFrame<'_>) -> Option<NoteEvent> {
        let smoothed = self.smoother.push(frame.rms());

        match self.state {
            DetectorState::Silent => self.try_onset(frame, smoothed),
            DetectorState::Sustaining => {
                if smoothed < self.config.offset_threshold {
                    self.finish_note(frame.time)
                } else {
                    None
                }
            }
        }
    }

    /// End a held note from outside the frame stream (e.g. when recording
    /// stops). Applies the same minimum-duration policy as a level-driven
    /// offset. No-op while silent.
    pub fn force_offset(&mut self, now: f64) -> Option<NoteEvent> {
        if self.state != DetectorState::Sustaining {
            return None;
        }
        self.finish_note(now)
    }

    fn try_onset(&mut self, frame: &AnalysisFrame<'_>, smoothed: f32) -> Option<NoteEvent> {
        if smoothed < self.config.onset_threshold {
            return None;
        }

        let pitch = frame.pitch.filter(|p| {
            p.frequency > 0.0 && p.confidence >= self.config.min_confidence
        })?;

        if frame.time - self.last_onset_time < self.config.min_onset_interval {
            trace!(
                "onset suppressed: {:.1} ms since previous",
                (frame.time - self.last_onset_time) * 1000.0
            );
            return None;
        }

        let velocity = (smoothed / FULL_VELOCITY_RMS).clamp(0.0, 1.0);
        let name = note_name(pitch.frequency);
        debug!(
            "onset: {} ({:.1} Hz) velocity {:.2}",
            name, pitch.frequency, velocity
        );

        self.held = Some(HeldNote {
            frequency: pitch.frequency,
            name: name.clone(),
            velocity,
            onset_time: frame.time,
        });
        self.last_onset_time = frame.time;
        self.state = DetectorState::Sustaining;

        Some(NoteEvent::Onset {
            frequency: pitch.frequency,
            note: name,
            velocity,
            time: frame.time,
        })
    }

    /// Transition to silent. Reports the offset only if the note lasted long
    /// enough; spurious blips reset the state without an event.
    fn finish_note(&mut self, now: f64) -> Option<NoteEvent> {
        self.state = DetectorState::Silent;
        let held = self.held.take()?;

        let duration = now - held.onset_time;
        if duration < self.config.min_duration {
            trace!("discarding {:.1} ms blip", duration * 1000.0);
            return None;
        }

        debug!("offset: {} after {:.1} ms", held.name, duration * 1000.0);
        Some(NoteEvent::Offset {
            frequency: held.frequency,
            note: held.name,
            velocity: held.velocity,
            time: now,
            duration,
        })
    }
}

impl Default for OnsetDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::frame::PitchEstimate;

    const TICK: f64 = 0.02; // 50 Hz polling for easy arithmetic

    fn pitch(frequency: f32) -> Option<PitchEstimate> {
        Some(PitchEstimate {
            frequency,
            confidence: 0.9,
        })
    }

    /// Feed a frame whose window is a constant level, so rms == level.
    fn feed(
        detector: &mut OnsetDetector,
        level: f32,
        pitch: Option<PitchEstimate>,
        time: f64,
    ) -> Option<NoteEvent> {
        let samples = vec![level; 64];
        detector.analyze(&AnalysisFrame::new(&samples, pitch, time))
    }

    #[test]
    fn rise_and_fall_yields_one_onset_one_offset() {
        let mut detector = OnsetDetector::default();
        let mut events = Vec::new();

        // Rise 0 -> 0.05 over 3 frames, then fall to 0.01 and hold
        let levels = [0.0, 0.05, 0.08, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01];
        for (i, &level) in levels.iter().enumerate() {
            if let Some(event) = feed(&mut detector, level, pitch(220.0), i as f64 * TICK) {
                events.push(event);
            }
        }

        assert_eq!(events.len(), 2, "exactly one onset then one offset");
        let onset_time = match &events[0] {
            NoteEvent::Onset { frequency, time, .. } => {
                assert!((frequency - 220.0).abs() < 1e-6);
                *time
            }
            other => panic!("expected onset first, got {other:?}"),
        };
        match &events[1] {
            NoteEvent::Offset { duration, time, .. } => {
                assert!((duration - (time - onset_time)).abs() < 1e-9);
                assert!(*duration >= 0.050);
            }
            other => panic!("expected offset second, got {other:?}"),
        }
    }

    #[test]
    fn short_blip_resets_without_event() {
        let mut detector = OnsetDetector::new(DetectorConfig {
            min_duration: 0.050,
            ..DetectorConfig::default()
        });

        let onset = feed(&mut detector, 0.2, pitch(220.0), 0.0);
        assert!(matches!(onset, Some(NoteEvent::Onset { .. })));
        assert!(detector.is_sustaining());

        // Silence arrives fast enough that the smoothed level crosses the
        // offset threshold within 25 ms: too short to report
        let mut events = Vec::new();
        for i in 1..=6 {
            if let Some(event) = feed(&mut detector, 0.0, pitch(220.0), i as f64 * 0.004) {
                events.push(event);
            }
        }
        assert!(events.is_empty(), "sub-minimum blip reports no event");
        assert!(!detector.is_sustaining(), "state still resets to silent");
        assert!(detector.current_note().is_none());
    }

    #[test]
    fn onset_requires_valid_pitch() {
        let mut detector = OnsetDetector::default();

        assert!(feed(&mut detector, 0.2, None, 0.0).is_none());

        let weak = Some(PitchEstimate {
            frequency: 220.0,
            confidence: 0.3,
        });
        assert!(feed(&mut detector, 0.2, weak, TICK).is_none());

        assert!(feed(&mut detector, 0.2, pitch(220.0), 2.0 * TICK).is_some());
    }

    #[test]
    fn onsets_respect_minimum_interval() {
        let mut detector = OnsetDetector::new(DetectorConfig {
            min_onset_interval: 0.5,
            ..DetectorConfig::default()
        });

        assert!(feed(&mut detector, 0.2, pitch(220.0), 0.0).is_some());

        // Five silent frames flush the moving average; the offset lands at
        // t = 0.10 with a reportable 100 ms duration
        let mut offset = None;
        for i in 1..=5 {
            offset = feed(&mut detector, 0.0, pitch(220.0), i as f64 * TICK).or(offset);
        }
        assert!(matches!(offset, Some(NoteEvent::Offset { .. })));

        // Loud again, but within the 0.5 s interval guard: suppressed
        assert!(feed(&mut detector, 0.2, pitch(220.0), 0.12).is_none());
        assert!(feed(&mut detector, 0.2, pitch(220.0), 0.30).is_none());
        // Past the interval: fires
        assert!(feed(&mut detector, 0.2, pitch(220.0), 0.52).is_some());
    }

    #[test]
    fn no_two_onsets_without_offset_between() {
        let mut detector = OnsetDetector::default();
        let mut onsets = 0;
        let mut offsets = 0;

        // Loud the whole time: a single sustained note
        for i in 0..50 {
            match feed(&mut detector, 0.2, pitch(330.0), i as f64 * TICK) {
                Some(NoteEvent::Onset { .. }) => onsets += 1,
                Some(NoteEvent::Offset { .. }) => offsets += 1,
                None => {}
            }
        }

        assert_eq!(onsets, 1);
        assert_eq!(offsets, 0);
        assert!(detector.is_sustaining());
    }

    #[test]
    fn hysteresis_holds_between_thresholds() {
        let mut detector = OnsetDetector::default();

        assert!(feed(&mut detector, 0.2, pitch(220.0), 0.0).is_some());

        // Level hovers between offset (0.015) and onset (0.03) thresholds:
        // the note must keep sustaining
        for i in 1..20 {
            let event = feed(&mut detector, 0.02, pitch(220.0), i as f64 * TICK);
            assert!(event.is_none());
        }
        assert!(detector.is_sustaining());
    }

    #[test]
    fn velocity_scales_with_level() {
        let mut detector = OnsetDetector::default();

        let event = feed(&mut detector, 0.05, pitch(440.0), 0.0);
        match event {
            Some(NoteEvent::Onset { velocity, .. }) => {
                // First frame: smoothed == rms == 0.05 -> velocity 0.5
                assert!((velocity - 0.5).abs() < 1e-6);
            }
            other => panic!("expected onset, got {other:?}"),
        }

        // A very loud onset clamps to 1.0
        let mut loud = OnsetDetector::default();
        match feed(&mut loud, 0.5, pitch(440.0), 0.0) {
            Some(NoteEvent::Onset { velocity, .. }) => assert_eq!(velocity, 1.0),
            other => panic!("expected onset, got {other:?}"),
        }
    }

    #[test]
    fn force_offset_ends_a_held_note() {
        let mut detector = OnsetDetector::default();

        assert!(feed(&mut detector, 0.2, pitch(196.0), 0.0).is_some());
        let event = detector.force_offset(0.3);
        match event {
            Some(NoteEvent::Offset { note, duration, .. }) => {
                assert_eq!(note, "G3");
                assert!((duration - 0.3).abs() < 1e-9);
            }
            other => panic!("expected offset, got {other:?}"),
        }
        assert!(!detector.is_sustaining());

        // Idempotent: nothing held any more
        assert!(detector.force_offset(0.4).is_none());
    }

    #[test]
    fn stop_forces_offset_and_resets() {
        let mut detector = OnsetDetector::default();
        assert!(feed(&mut detector, 0.2, pitch(220.0), 0.0).is_some());

        let event = detector.stop(0.2);
        assert!(matches!(event, Some(NoteEvent::Offset { .. })));
        assert!(!detector.is_sustaining());

        // After reset the interval guard starts fresh
        assert!(feed(&mut detector, 0.2, pitch(220.0), 0.21).is_some());
    }

    #[test]
    fn config_normalization_preserves_hysteresis() {
        let config = DetectorConfig {
            onset_threshold: 0.03,
            offset_threshold: 0.05, // invalid: above onset
            ..DetectorConfig::default()
        };
        let detector = OnsetDetector::new(config);
        assert!(detector.config().offset_threshold < detector.config().onset_threshold);
    }
}
