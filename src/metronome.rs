use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clock::AudioClock;

/*
Look-ahead Beat Scheduling
==========================

The control loop polls `tick()` every ~25 ms - far too coarse to place
clicks audibly on the grid by itself. The classic fix: on every tick,
schedule everything that falls inside the next 100 ms window, expressed in
audio-clock time:

  while next_beat_time < now + SCHEDULE_AHEAD:
      emit click at next_beat_time      (rendered sample-accurately later)
      notify on_beat                     (fires now, carries the beat time)
      next_beat_time += 60 / bpm

The click is placed exactly: `ClickTrack` renders it at its scheduled
sample. The `on_beat` callback is NOT sample-accurate - it fires from the
polling tick, up to the look-ahead window early, and carries
`scheduled_time` so a consumer can compensate. It only drives UI and
recording timestamps, never the sound, so coarse timing is an accepted
trade-off here.

Tempo changes apply to beats scheduled after the change; clicks already
handed to the click track stay where they were scheduled.
*/

pub const MIN_BPM: f32 = 60.0;
pub const MAX_BPM: f32 = 200.0;
pub const MIN_BEATS_PER_BAR: u32 = 2;
pub const MAX_BEATS_PER_BAR: u32 = 8;

/// How far ahead of the clock beats are scheduled.
const SCHEDULE_AHEAD: f64 = 0.100;
/// Gap between start() and the first beat.
const START_DELAY: f64 = 0.005;

#[cfg(feature = "rtrb")]
const BEAT_FREQUENCY: f32 = 1_000.0;
#[cfg(feature = "rtrb")]
const DOWNBEAT_FREQUENCY: f32 = 1_500.0;
#[cfg(feature = "rtrb")]
const BEAT_GAIN: f32 = 0.35;
#[cfg(feature = "rtrb")]
const DOWNBEAT_GAIN: f32 = 0.5;
/// Decay time of one click.
#[cfg(feature = "rtrb")]
const CLICK_DECAY: f32 = 0.030;

/// One scheduled beat, as delivered to the `on_beat` callback.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    /// 0-based position in the bar.
    pub beat_index: u32,
    /// True exactly when `beat_index == 0`.
    pub is_downbeat: bool,
    /// Audio-clock time the beat will sound at.
    pub scheduled_time: f64,
}

/// A click to be rendered at an exact audio-clock time.
#[derive(Debug, Clone, Copy)]
pub struct Click {
    pub at: f64,
    pub frequency: f32,
    pub gain: f32,
}

type BeatCallback = Box<dyn FnMut(BeatEvent) + Send>;

/// Look-ahead metronome scheduler. Lives on the control loop; reads the
/// audio clock, never the wall clock.
pub struct Metronome {
    clock: AudioClock,
    bpm: f32,
    beats_per_bar: u32,
    running: bool,
    next_beat_time: f64,
    beat_index: u32,
    #[cfg(feature = "rtrb")]
    clicks: Option<rtrb::Producer<Click>>,
    on_beat: Option<BeatCallback>,
}

impl Metronome {
    pub fn new(clock: AudioClock) -> Self {
        Self {
            clock,
            bpm: 120.0,
            beats_per_bar: 4,
            running: false,
            next_beat_time: 0.0,
            beat_index: 0,
            #[cfg(feature = "rtrb")]
            clicks: None,
            on_beat: None,
        }
    }

    /// Tempo in beats per minute, clamped to [60, 200]. Affects only beats
    /// scheduled after the call.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Beats per bar, clamped to [2, 8].
    pub fn set_beats_per_bar(&mut self, beats: u32) {
        self.beats_per_bar = beats.clamp(MIN_BEATS_PER_BAR, MAX_BEATS_PER_BAR);
        self.beat_index %= self.beats_per_bar;
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    /// Route scheduled clicks to a `ClickTrack` for rendering.
    #[cfg(feature = "rtrb")]
    pub fn connect_clicks(&mut self, clicks: rtrb::Producer<Click>) {
        self.clicks = Some(clicks);
    }

    pub fn set_on_beat(&mut self, callback: impl FnMut(BeatEvent) + Send + 'static) {
        self.on_beat = Some(Box::new(callback));
    }

    pub fn start(&mut self) {
        self.running = true;
        self.beat_index = 0;
        self.next_beat_time = self.clock.now() + START_DELAY;
        debug!("metronome start: {} bpm, {}/bar", self.bpm, self.beats_per_bar);
    }

    /// Stop scheduling and reset the beat counter. Already-scheduled clicks
    /// still sound.
    pub fn stop(&mut self) {
        self.running = false;
        self.beat_index = 0;
        debug!("metronome stop");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Schedule everything inside the look-ahead window. Call every ~25 ms
    /// from the polling loop.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        let horizon = self.clock.now() + SCHEDULE_AHEAD;
        while self.next_beat_time < horizon {
            let is_downbeat = self.beat_index == 0;

            #[cfg(feature = "rtrb")]
            if let Some(clicks) = self.clicks.as_mut() {
                let click = Click {
                    at: self.next_beat_time,
                    frequency: if is_downbeat {
                        DOWNBEAT_FREQUENCY
                    } else {
                        BEAT_FREQUENCY
                    },
                    gain: if is_downbeat { DOWNBEAT_GAIN } else { BEAT_GAIN },
                };
                let _ = clicks.push(click); // queue full: drop the click
            }

            if let Some(on_beat) = self.on_beat.as_mut() {
                on_beat(BeatEvent {
                    beat_index: self.beat_index,
                    is_downbeat,
                    scheduled_time: self.next_beat_time,
                });
            }

            self.next_beat_time += 60.0 / self.bpm as f64;
            self.beat_index = (self.beat_index + 1) % self.beats_per_bar;
        }
    }
}

/// Audio-side renderer for scheduled clicks: a short sine burst with an
/// exponential decay, started at the exact scheduled sample.
#[cfg(feature = "rtrb")]
pub struct ClickTrack {
    rx: rtrb::Consumer<Click>,
    /// Scheduled clicks not yet due.
    pending: Vec<Click>,
    active: Vec<ActiveClick>,
}

#[cfg(feature = "rtrb")]
struct ActiveClick {
    frequency: f32,
    gain: f32,
    phase: f32,
    env: crate::dsp::envelope::ExpDecay,
    /// Sample offset into the next rendered block at which this click starts.
    start_offset: usize,
}

#[cfg(feature = "rtrb")]
impl ClickTrack {
    const QUEUE_SIZE: usize = 64;

    pub fn new() -> (Self, rtrb::Producer<Click>) {
        let (tx, rx) = rtrb::RingBuffer::<Click>::new(Self::QUEUE_SIZE);
        (
            Self {
                rx,
                pending: Vec::with_capacity(Self::QUEUE_SIZE),
                active: Vec::with_capacity(8),
            },
            tx,
        )
    }

    /// Mix due clicks into `out`, which covers audio-clock time
    /// `[start_time, start_time + out.len() / sample_rate)`.
    pub fn render(&mut self, out: &mut [f32], start_time: f64, sample_rate: f32) {
        while let Ok(click) = self.rx.pop() {
            self.pending.push(click);
        }

        let block_end = start_time + out.len() as f64 / sample_rate as f64;
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].at < block_end {
                let click = self.pending.swap_remove(i);
                let offset = (((click.at - start_time).max(0.0)) * sample_rate as f64) as usize;
                let mut env = crate::dsp::envelope::ExpDecay::new(CLICK_DECAY);
                env.trigger();
                self.active.push(ActiveClick {
                    frequency: click.frequency,
                    gain: click.gain,
                    phase: 0.0,
                    env,
                    start_offset: offset.min(out.len().saturating_sub(1)),
                });
            } else {
                i += 1;
            }
        }

        for click in self.active.iter_mut() {
            let increment = click.frequency / sample_rate;
            for sample in out[click.start_offset..].iter_mut() {
                let level = click.env.next_sample(sample_rate);
                *sample += (std::f32::consts::TAU * click.phase).sin() * level * click.gain;
                click.phase += increment;
                if click.phase >= 1.0 {
                    click.phase -= 1.0;
                }
            }
            click.start_offset = 0;
        }

        self.active.retain(|click| click.env.is_active());
    }
}
