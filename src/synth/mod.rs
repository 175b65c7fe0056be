// Purpose: voice management, polyphony, event handling
// This layer sits above the dsp primitives and owns all render-side state

pub mod arpeggiator;
pub mod engine;
pub mod message;
pub mod params;
pub mod voice;

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_440() {
        assert!((midi_to_freq(69) - 440.0).abs() < 1e-3);
    }

    #[test]
    fn octave_doubles_frequency() {
        assert!((midi_to_freq(81) - 880.0).abs() < 1e-2);
    }
}
