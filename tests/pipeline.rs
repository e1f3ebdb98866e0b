//! End-to-end pipeline tests: frames in, audio out.

use voxband::analysis::{AnalysisFrame, DetectorConfig, NoteEvent, OnsetDetector, PitchEstimate};
use voxband::session::{EngineConfig, InstrumentKind, Session, SessionCommand};

fn frame_samples(level: f32) -> Vec<f32> {
    vec![level; 256]
}

fn pitch(frequency: f32) -> Option<PitchEstimate> {
    Some(PitchEstimate {
        frequency,
        confidence: 0.9,
    })
}

/// Sing a note at the detector, route its events into the session, and make
/// sure the instrument actually sounds and then goes quiet.
#[test]
fn detected_note_drives_the_guitar() {
    let mut session = Session::new(EngineConfig::default());
    let mut handle = session.handle();
    let clock = session.clock();

    let mut detector = OnsetDetector::new(DetectorConfig::default());
    detector.start();

    let mut out = vec![0.0f32; 480]; // 10 ms blocks at 48 kHz
    let mut peak_while_singing = 0.0f32;

    // ~300 ms of singing at 196 Hz
    for _ in 0..30 {
        let now = clock.now();
        let samples = frame_samples(0.2);
        let frame = AnalysisFrame::new(&samples, pitch(196.0), now);

        match detector.analyze(&frame) {
            Some(NoteEvent::Onset {
                frequency,
                velocity,
                ..
            }) => handle.send(SessionCommand::Trigger {
                instrument: InstrumentKind::Guitar,
                frequency,
                velocity,
                duration: None,
            }),
            Some(NoteEvent::Offset { .. }) => handle.send(SessionCommand::Release {
                instrument: InstrumentKind::Guitar,
            }),
            None => {}
        }

        session.render_block(&mut out);
        peak_while_singing = out
            .iter()
            .fold(peak_while_singing, |acc, &s| acc.max(s.abs()));
    }

    assert!(
        peak_while_singing > 1e-3,
        "singing should produce instrument output"
    );

    // ~300 ms of silence: offset fires, the note releases and drains
    let mut peak_tail = 0.0f32;
    for i in 0..30 {
        let now = clock.now();
        let samples = frame_samples(0.0);
        let frame = AnalysisFrame::new(&samples, None, now);

        if let Some(NoteEvent::Offset { .. }) = detector.analyze(&frame) {
            handle.send(SessionCommand::Release {
                instrument: InstrumentKind::Guitar,
            });
        }

        session.render_block(&mut out);
        if i > 10 {
            peak_tail = out.iter().fold(peak_tail, |acc, &s| acc.max(s.abs()));
        }
    }

    assert!(
        peak_tail < 1e-3,
        "released note should fade out, peak was {peak_tail}"
    );
}

/// One rise, one fall: exactly one onset and one offset, whose duration
/// matches the elapsed time between them.
#[test]
fn one_sung_note_yields_one_onset_one_offset() {
    let mut detector = OnsetDetector::default();
    detector.start();

    let mut events = Vec::new();
    let levels: Vec<f32> = std::iter::empty()
        .chain(std::iter::repeat(0.05).take(10))
        .chain(std::iter::repeat(0.0).take(10))
        .collect();

    for (i, &level) in levels.iter().enumerate() {
        let samples = frame_samples(level);
        let frame = AnalysisFrame::new(&samples, pitch(220.0), i as f64 * 0.02);
        if let Some(event) = detector.analyze(&frame) {
            events.push(event);
        }
    }

    let onsets = events
        .iter()
        .filter(|e| matches!(e, NoteEvent::Onset { .. }))
        .count();
    let offsets = events
        .iter()
        .filter(|e| matches!(e, NoteEvent::Offset { .. }))
        .count();
    assert_eq!((onsets, offsets), (1, 1));

    if let (NoteEvent::Onset { time: t_on, .. }, NoteEvent::Offset { time, duration, .. }) =
        (&events[0], &events[1])
    {
        assert!((duration - (time - t_on)).abs() < 1e-9);
    } else {
        panic!("expected onset then offset");
    }
}

/// Piano chord through the command queue: voices accumulate, then release.
#[test]
fn piano_chord_rings_and_releases() {
    let mut session = Session::new(EngineConfig::default());
    let clock = session.clock();

    let now = clock.now();
    session.piano_mut().play_note(261.63, 0.9, now);
    session.piano_mut().play_note(329.63, 0.9, now);
    session.piano_mut().play_note(392.0, 0.9, now);
    assert_eq!(session.piano_mut().live_voices(), 3);

    let mut out = vec![0.0f32; 480];
    session.render_block(&mut out);
    assert!(out.iter().any(|&s| s.abs() > 1e-3));

    let now = clock.now();
    session.piano_mut().release_all(now);

    // Render past the 100 ms teardown delay
    for _ in 0..15 {
        session.render_block(&mut out);
    }
    assert_eq!(session.piano_mut().live_voices(), 0);
}

/// A sub-bass trigger at 80 Hz with no octave shift is already in range and
/// folds to exactly 80 Hz.
#[test]
fn sub_bass_at_80_hz_is_not_folded() {
    let mut session = Session::new(EngineConfig::default());
    let now = session.clock().now();

    session.bass_mut().trigger_note(80.0, 0.8, None, now);
    assert_eq!(session.bass_mut().sounding_frequency(), Some(80.0));
}
