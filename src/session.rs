use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::clock::AudioClock;
use crate::instrument::{Instrument, MonoInstrument, PianoInstrument};
use crate::instrument::FrequencyRange;
use crate::styles::{BassStyle, GuitarStyle, PianoStyle};
use crate::MAX_BLOCK_SIZE;

/*
Session
=======

One `Session` is one active playing/recording context. It owns the audio
clock, the three instruments, and the click track, and is the only thing
that mutates any of them from the rendering path. There are no module-level
instances: construct a session, pass it (or its handle) to whoever needs it,
drop it when the take ends.

Threading model: `render_block` runs on the audio path. Everything else
talks to the session through `SessionHandle`, a lock-free command queue
drained at the start of every rendered block. Commands apply at block
boundaries; blocks are short enough that this is inaudible.

For single-threaded hosts (and tests) the instruments are also reachable
directly through `bass_mut()` / `guitar_mut()` / `piano_mut()`.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub bass_style: BassStyle,
    pub guitar_style: GuitarStyle,
    pub piano_style: PianoStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            bass_style: BassStyle::Sub,
            guitar_style: GuitarStyle::Clean,
            piano_style: PianoStyle::Grand,
        }
    }
}

/// Which instrument a command addresses.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Bass,
    Guitar,
    Piano,
}

/// Control-side commands, applied at the next block boundary.
#[cfg(feature = "rtrb")]
#[derive(Debug, Clone, Copy)]
pub enum SessionCommand {
    Trigger {
        instrument: InstrumentKind,
        frequency: f32,
        velocity: f32,
        duration: Option<f64>,
    },
    /// Stop the mono note / release every piano voice.
    Release { instrument: InstrumentKind },
    Pitch {
        instrument: InstrumentKind,
        frequency: f32,
        confidence: f32,
    },
    SetBassStyle(BassStyle),
    SetGuitarStyle(GuitarStyle),
    SetPianoStyle(PianoStyle),
    SetVolume {
        instrument: InstrumentKind,
        volume: f32,
    },
    SetOctaveShift {
        instrument: InstrumentKind,
        shift: i32,
    },
}

/// Control-side endpoint of a session's command queue.
#[cfg(feature = "rtrb")]
pub struct SessionHandle {
    tx: rtrb::Producer<SessionCommand>,
}

#[cfg(feature = "rtrb")]
impl SessionHandle {
    /// Send a command; dropped silently if the audio side has stalled.
    pub fn send(&mut self, command: SessionCommand) {
        let _ = self.tx.push(command);
    }
}

pub struct Session {
    clock: AudioClock,
    bass: MonoInstrument<BassStyle>,
    guitar: MonoInstrument<GuitarStyle>,
    piano: PianoInstrument,
    #[cfg(feature = "rtrb")]
    clicks: Option<crate::metronome::ClickTrack>,
    #[cfg(feature = "rtrb")]
    rx: Option<rtrb::Consumer<SessionCommand>>,
    scratch: Vec<f32>,
    disposed: bool,
}

#[cfg(feature = "rtrb")]
const COMMAND_QUEUE_SIZE: usize = 256;

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        let clock = AudioClock::new(config.sample_rate);
        Self {
            bass: MonoInstrument::new(config.sample_rate, FrequencyRange::BASS, config.bass_style),
            guitar: MonoInstrument::new(
                config.sample_rate,
                FrequencyRange::GUITAR,
                config.guitar_style,
            ),
            piano: PianoInstrument::new(config.sample_rate, config.piano_style),
            #[cfg(feature = "rtrb")]
            clicks: None,
            #[cfg(feature = "rtrb")]
            rx: None,
            clock,
            scratch: vec![0.0; MAX_BLOCK_SIZE],
            disposed: false,
        }
    }

    /// Read-only handle to the session's audio clock.
    pub fn clock(&self) -> AudioClock {
        self.clock.clone()
    }

    pub fn sample_rate(&self) -> f32 {
        self.clock.sample_rate()
    }

    pub fn bass_mut(&mut self) -> &mut MonoInstrument<BassStyle> {
        &mut self.bass
    }

    pub fn guitar_mut(&mut self) -> &mut MonoInstrument<GuitarStyle> {
        &mut self.guitar
    }

    pub fn piano_mut(&mut self) -> &mut PianoInstrument {
        &mut self.piano
    }

    /// Create the control-side command endpoint. Replaces any previous one.
    #[cfg(feature = "rtrb")]
    pub fn handle(&mut self) -> SessionHandle {
        let (tx, rx) = rtrb::RingBuffer::<SessionCommand>::new(COMMAND_QUEUE_SIZE);
        self.rx = Some(rx);
        SessionHandle { tx }
    }

    /// Create the click input for a `Metronome` and attach its renderer to
    /// this session's output. Replaces any previous click track.
    #[cfg(feature = "rtrb")]
    pub fn click_input(&mut self) -> rtrb::Producer<crate::metronome::Click> {
        let (track, tx) = crate::metronome::ClickTrack::new();
        self.clicks = Some(track);
        tx
    }

    #[cfg(feature = "rtrb")]
    fn apply(&mut self, command: SessionCommand, now: f64) {
        use SessionCommand::*;

        match command {
            Trigger {
                instrument,
                frequency,
                velocity,
                duration,
            } => match instrument {
                InstrumentKind::Bass => self.bass.trigger_note(frequency, velocity, duration, now),
                InstrumentKind::Guitar => {
                    self.guitar.trigger_note(frequency, velocity, duration, now)
                }
                InstrumentKind::Piano => match duration {
                    Some(duration) => {
                        self.piano.play_note_for(frequency, velocity, duration, now);
                    }
                    None => {
                        self.piano.play_note(frequency, velocity, now);
                    }
                },
            },
            Release { instrument } => match instrument {
                InstrumentKind::Bass => self.bass.stop_note(now),
                InstrumentKind::Guitar => self.guitar.stop_note(now),
                InstrumentKind::Piano => self.piano.release_all(now),
            },
            Pitch {
                instrument,
                frequency,
                confidence,
            } => match instrument {
                InstrumentKind::Bass => self.bass.update_from_pitch(frequency, confidence, now),
                InstrumentKind::Guitar => self.guitar.update_from_pitch(frequency, confidence, now),
                InstrumentKind::Piano => self.piano.update_from_pitch(frequency, confidence, now),
            },
            SetBassStyle(style) => self.bass.set_style(style, now),
            SetGuitarStyle(style) => self.guitar.set_style(style, now),
            SetPianoStyle(style) => self.piano.set_style(style),
            SetVolume { instrument, volume } => match instrument {
                InstrumentKind::Bass => self.bass.set_volume(volume),
                InstrumentKind::Guitar => self.guitar.set_volume(volume),
                InstrumentKind::Piano => self.piano.set_volume(volume),
            },
            SetOctaveShift { instrument, shift } => match instrument {
                InstrumentKind::Bass => self.bass.set_octave_shift(shift),
                InstrumentKind::Guitar => self.guitar.set_octave_shift(shift),
                InstrumentKind::Piano => self.piano.set_octave_shift(shift),
            },
        }
    }

    /// Render one block of the session mix: drain pending commands, render
    /// each instrument and the click track, advance the clock.
    pub fn render_block(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        if self.disposed || out.is_empty() {
            return;
        }

        let now = self.clock.now();
        let len = out.len().min(MAX_BLOCK_SIZE);
        let out = &mut out[..len];

        #[cfg(feature = "rtrb")]
        {
            // Take the queue out while draining so commands can borrow the
            // whole session
            let mut rx = self.rx.take();
            if let Some(rx) = rx.as_mut() {
                while let Ok(command) = rx.pop() {
                    self.apply(command, now);
                }
            }
            self.rx = rx;
        }

        for kind in [InstrumentKind::Bass, InstrumentKind::Guitar, InstrumentKind::Piano] {
            let block = &mut self.scratch[..len];
            match kind {
                InstrumentKind::Bass => self.bass.render_block(block, now),
                InstrumentKind::Guitar => self.guitar.render_block(block, now),
                InstrumentKind::Piano => self.piano.render_block(block, now),
            }
            for (o, s) in out.iter_mut().zip(block.iter()) {
                *o += s;
            }
        }

        #[cfg(feature = "rtrb")]
        if let Some(clicks) = self.clicks.as_mut() {
            clicks.render(out, now, self.clock.sample_rate());
        }

        self.clock.advance(len as u64);
    }

    /// Tear down every instrument. Idempotent; a disposed session renders
    /// silence.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        debug!("session disposed");
        self.bass.dispose();
        self.guitar.dispose();
        self.piano.dispose();
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_silence_when_idle() {
        let mut session = Session::new(EngineConfig::default());
        let mut out = vec![1.0f32; 512];
        session.render_block(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn clock_advances_with_rendering() {
        let mut session = Session::new(EngineConfig::default());
        let clock = session.clock();

        let mut out = vec![0.0f32; 480];
        for _ in 0..100 {
            session.render_block(&mut out);
        }
        assert!((clock.now() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn direct_trigger_is_audible_in_the_mix() {
        let mut session = Session::new(EngineConfig::default());
        let now = session.clock().now();
        session.bass_mut().trigger_note(80.0, 0.9, None, now);

        let mut out = vec![0.0f32; 2048];
        session.render_block(&mut out);
        assert!(out.iter().any(|&s| s.abs() > 1e-3));
    }

    #[test]
    fn disposed_session_renders_silence_and_tolerates_redispose() {
        let mut session = Session::new(EngineConfig::default());
        let now = session.clock().now();
        session.bass_mut().trigger_note(80.0, 0.9, None, now);

        session.dispose();
        session.dispose();

        let mut out = vec![1.0f32; 512];
        session.render_block(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn commands_round_trip_through_the_queue() {
        let mut session = Session::new(EngineConfig::default());
        let mut handle = session.handle();

        handle.send(SessionCommand::Trigger {
            instrument: InstrumentKind::Guitar,
            frequency: 196.0,
            velocity: 0.8,
            duration: None,
        });

        let mut out = vec![0.0f32; 2048];
        session.render_block(&mut out);
        assert!(out.iter().any(|&s| s.abs() > 1e-3));
        assert!(session.guitar_mut().is_sounding());

        handle.send(SessionCommand::Release {
            instrument: InstrumentKind::Guitar,
        });
        session.render_block(&mut out);
        assert!(!session.guitar_mut().is_sounding());
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn style_and_volume_commands_apply() {
        let mut session = Session::new(EngineConfig::default());
        let mut handle = session.handle();

        handle.send(SessionCommand::SetBassStyle(BassStyle::Wobble));
        handle.send(SessionCommand::SetVolume {
            instrument: InstrumentKind::Bass,
            volume: 0.25,
        });

        let mut out = vec![0.0f32; 256];
        session.render_block(&mut out);

        assert_eq!(session.bass_mut().style(), BassStyle::Wobble);
        assert_eq!(session.bass_mut().core().volume(), 0.25);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn metronome_clicks_appear_in_the_session_mix() {
        use crate::metronome::Metronome;

        let mut session = Session::new(EngineConfig::default());
        let clicks = session.click_input();
        let mut metronome = Metronome::new(session.clock());
        metronome.connect_clicks(clicks);
        metronome.start();
        metronome.tick();

        // First click lands 5 ms in; render 100 ms
        let mut heard = false;
        let mut out = vec![0.0f32; 480];
        for _ in 0..10 {
            session.render_block(&mut out);
            heard |= out.iter().any(|&s| s.abs() > 0.01);
        }
        assert!(heard, "scheduled click should be audible in the mix");
    }
}
