//! Equal-tempered pitch math: frequency <-> MIDI note number conversions,
//! semitone snapping, and human-readable note names.

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Continuous MIDI note number for a frequency. A4 = 440 Hz = 69.0.
#[inline]
pub fn frequency_to_midi(frequency: f32) -> f32 {
    69.0 + 12.0 * (frequency / 440.0).log2()
}

/// Frequency of a MIDI note number (fractional numbers give detuned pitches).
#[inline]
pub fn midi_to_frequency(midi: f32) -> f32 {
    440.0 * 2.0_f32.powf((midi - 69.0) / 12.0)
}

/// Nearest equal-tempered MIDI note number.
#[inline]
pub fn nearest_midi(frequency: f32) -> i32 {
    frequency_to_midi(frequency).round() as i32
}

/// Snap a frequency to the nearest equal-tempered semitone.
pub fn nearest_semitone(frequency: f32) -> f32 {
    if frequency <= 0.0 {
        return frequency;
    }
    midi_to_frequency(nearest_midi(frequency) as f32)
}

/// Note name with octave for the nearest semitone, e.g. "A4", "F#2".
pub fn note_name(frequency: f32) -> String {
    let midi = nearest_midi(frequency);
    let name = NOTE_NAMES[midi.rem_euclid(12) as usize];
    let octave = midi.div_euclid(12) - 1;
    format!("{name}{octave}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_midi_69() {
        assert_eq!(nearest_midi(440.0), 69);
        assert_eq!(note_name(440.0), "A4");
    }

    #[test]
    fn octave_boundaries() {
        assert_eq!(note_name(261.63), "C4"); // middle C
        assert_eq!(note_name(246.94), "B3");
        assert_eq!(note_name(27.5), "A0");
    }

    #[test]
    fn snapping_is_idempotent() {
        for freq in [82.4, 110.0, 196.0, 329.6, 523.3] {
            let snapped = nearest_semitone(freq);
            assert!((nearest_semitone(snapped) - snapped).abs() < 1e-3);
        }
    }

    #[test]
    fn snap_moves_less_than_half_a_semitone() {
        for freq in [100.0, 150.0, 440.0, 600.0] {
            let snapped = nearest_semitone(freq);
            let cents = 1200.0 * (snapped / freq).log2();
            assert!(cents.abs() <= 50.0 + 1e-3);
        }
    }

    #[test]
    fn round_trips_through_midi() {
        for midi in [21, 45, 69, 93] {
            let freq = midi_to_frequency(midi as f32);
            assert_eq!(nearest_midi(freq), midi);
        }
    }
}
