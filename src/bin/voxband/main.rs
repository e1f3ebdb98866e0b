//! Live demo: microphone in, synthesized instrument out.
//!
//! Wiring: cpal mic stream -> pitch tracker -> onset detector -> session
//! command queue -> cpal output stream rendering the session mix, with the
//! metronome clicking along. Pick the instrument on the command line:
//!
//!   voxband [bass|guitar|piano] [bpm]

mod pitch;

use std::io::BufRead;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{info, warn};

use voxband::analysis::{AnalysisFrame, NoteEvent, OnsetDetector};
use voxband::metronome::Metronome;
use voxband::session::{EngineConfig, InstrumentKind, Session, SessionCommand};

const ANALYSIS_WINDOW: usize = 2048;
const MIC_QUEUE: usize = 1 << 14;

fn parse_args() -> (InstrumentKind, f32) {
    let mut instrument = InstrumentKind::Guitar;
    let mut bpm = 120.0;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "bass" => instrument = InstrumentKind::Bass,
            "guitar" => instrument = InstrumentKind::Guitar,
            "piano" => instrument = InstrumentKind::Piano,
            other => {
                if let Ok(parsed) = other.parse::<f32>() {
                    bpm = parsed;
                }
            }
        }
    }
    (instrument, bpm)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let (instrument, bpm) = parse_args();

    let host = cpal::default_host();
    let output_device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no output device available"))?;
    let input_device = host
        .default_input_device()
        .ok_or_else(|| eyre!("no input device available"))?;

    let output_config = output_device.default_output_config()?;
    let sample_rate = output_config.sample_rate().0 as f32;
    let output_channels = output_config.channels() as usize;

    let mut session = Session::new(EngineConfig {
        sample_rate,
        ..EngineConfig::default()
    });
    let clock = session.clock();
    let mut handle = session.handle();

    let mut metronome = Metronome::new(clock.clone());
    metronome.connect_clicks(session.click_input());
    metronome.set_bpm(bpm);
    metronome.set_on_beat(|beat| {
        if beat.is_downbeat {
            info!("bar @ {:.2}s", beat.scheduled_time);
        }
    });
    metronome.start();

    // Output: render the session mix in engine-sized chunks, fanning the
    // mono mix out to every channel
    let mut mono = vec![0.0f32; voxband::MAX_BLOCK_SIZE];
    let output_stream = output_device.build_output_stream(
        &output_config.into(),
        move |data: &mut [f32], _| {
            for frames in data.chunks_mut(output_channels * voxband::MAX_BLOCK_SIZE) {
                let chunk = frames.len() / output_channels;
                let block = &mut mono[..chunk];
                session.render_block(block);
                for (frame, &sample) in frames.chunks_mut(output_channels).zip(block.iter()) {
                    frame.fill(sample);
                }
            }
        },
        |error| warn!("output stream error: {error}"),
        None,
    )?;

    // Input: ship mic samples to the analysis loop
    let input_config = input_device.default_input_config()?;
    let input_channels = input_config.channels() as usize;
    let (mut mic_tx, mut mic_rx) = rtrb::RingBuffer::<f32>::new(MIC_QUEUE);
    let input_stream = input_device.build_input_stream(
        &input_config.into(),
        move |data: &[f32], _| {
            for frame in data.chunks(input_channels) {
                let _ = mic_tx.push(frame[0]);
            }
        },
        |error| warn!("input stream error: {error}"),
        None,
    )?;

    output_stream.play()?;
    input_stream.play()?;

    info!("singing to {instrument:?} at {bpm} bpm - press Enter to quit");

    // Analysis loop on its own thread: ~60 Hz polling
    let analysis = std::thread::spawn(move || {
        let mut tracker = pitch::PitchTracker::new(ANALYSIS_WINDOW);
        let mut window = vec![0.0f32; tracker.window_len()];
        let mut filled = 0usize;
        let mut detector = OnsetDetector::default();
        detector.start();

        loop {
            // Slide fresh mic samples into the analysis window
            while let Ok(sample) = mic_rx.pop() {
                if filled < ANALYSIS_WINDOW {
                    window[filled] = sample;
                    filled += 1;
                } else {
                    window.rotate_left(1);
                    window[ANALYSIS_WINDOW - 1] = sample;
                }
            }

            let now = clock.now();
            if filled == ANALYSIS_WINDOW {
                let estimate = tracker.estimate(&window, sample_rate);
                let frame = AnalysisFrame::new(&window, estimate, now);

                match detector.analyze(&frame) {
                    Some(NoteEvent::Onset {
                        frequency,
                        velocity,
                        ref note,
                        ..
                    }) => {
                        info!("onset {note} ({frequency:.1} Hz)");
                        handle.send(SessionCommand::Trigger {
                            instrument,
                            frequency,
                            velocity,
                            duration: None,
                        });
                    }
                    Some(NoteEvent::Offset { ref note, duration, .. }) => {
                        info!("offset {note} after {:.0} ms", duration * 1000.0);
                        handle.send(SessionCommand::Release { instrument });
                    }
                    None => {
                        // While sustaining, keep the pitch-follow path fed so
                        // the mono instruments glide
                        if detector.is_sustaining() {
                            if let Some(estimate) = estimate {
                                handle.send(SessionCommand::Pitch {
                                    instrument,
                                    frequency: estimate.frequency,
                                    confidence: estimate.confidence,
                                });
                            }
                        }
                    }
                }
            }

            metronome.tick();
            std::thread::sleep(Duration::from_millis(16));
        }
    });

    // Block until the user hits Enter, then drop the streams
    let stdin = std::io::stdin();
    let _ = stdin.lock().lines().next();

    drop(analysis);
    Ok(())
}
