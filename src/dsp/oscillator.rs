#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/*
Phase-Accumulator Oscillator
============================

Every voice in the engine runs up to three of these: a primary rank, a
detuned second rank, and a pure-sine sub rank. Each one keeps a single
phase accumulator in [0, 1) and evaluates the selected waveform at that
phase, advancing by frequency / sample_rate per sample.

The accumulator is created once and NEVER reset afterwards - not on
retrigger, not on voice steal. Resetting phase mid-stream produces a
step discontinuity in the output, which the ear hears as a click. By
keeping phase continuous the retrigger click budget is carried entirely
by the envelope's crossfade, where it can be shaped.

Waveform character:

  Sine       Fundamental only. Pure, hollow.
  WarmSine   Sine plus a small 2nd-harmonic blend - slightly "brassy"
             sine, useful for organ-ish patches.
  Triangle   Odd harmonics falling off as 1/n^2. Soft.
  Square     Odd harmonics falling off as 1/n. Hollow but forceful.
  Sawtooth   All harmonics falling off as 1/n. Bright, buzzy.

Naive (non-bandlimited) shapes are used: this engine targets keyboard
register playing where aliasing stays below audibility, and naive
shapes keep the per-sample cost trivial across 8 voices x 3 ranks.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    WarmSine,
    Triangle,
    Square,
    Sawtooth,
}

impl Waveform {
    /// Parse a waveform from its parameter-map name. Unknown names map to
    /// `None` so stale presets degrade gracefully.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sine" => Some(Self::Sine),
            "warm_sine" => Some(Self::WarmSine),
            "triangle" => Some(Self::Triangle),
            "square" => Some(Self::Square),
            "sawtooth" => Some(Self::Sawtooth),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::WarmSine => "warm_sine",
            Self::Triangle => "triangle",
            Self::Square => "square",
            Self::Sawtooth => "sawtooth",
        }
    }

    /// Pre-saturation drive multiplier giving roughly equal perceived
    /// loudness across waveforms (sine is the 1.4x reference; square has
    /// high RMS and gets cut, saw and triangle get boosted).
    pub fn drive_compensation(self) -> f32 {
        match self {
            Self::Sine | Self::WarmSine => 1.4,
            Self::Square => 0.8,
            Self::Triangle | Self::Sawtooth => 1.7,
        }
    }
}

/// Single-rank oscillator. Phase persists for the lifetime of the voice.
#[derive(Debug, Clone)]
pub struct Oscillator {
    phase: f32,
}

impl Oscillator {
    pub fn new() -> Self {
        Self { phase: 0.0 }
    }

    /// Evaluate the waveform at the current phase, then advance.
    #[inline]
    pub fn next_sample(&mut self, waveform: Waveform, frequency: f32, sample_rate: f32) -> f32 {
        let value = evaluate(waveform, self.phase);
        self.phase += frequency / sample_rate;
        self.phase -= self.phase.floor();
        value
    }

    /// Current phase in [0, 1). Exposed for continuity checks.
    pub fn phase(&self) -> f32 {
        self.phase
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn evaluate(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (TAU * phase).sin(),
        Waveform::WarmSine => {
            // 2nd harmonic at ~20%, renormalized so peaks stay near +/-1
            ((TAU * phase).sin() + 0.2 * (2.0 * TAU * phase).sin()) / 1.2
        }
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * phase - 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn sine_matches_reference() {
        let mut osc = Oscillator::new();
        let frequency = 440.0;
        let mut buffer = vec![0.0f32; 128];
        for sample in buffer.iter_mut() {
            *sample = osc.next_sample(Waveform::Sine, frequency, SAMPLE_RATE);
        }

        // sample n should be sin(2pi f n / sr)
        let n = 12;
        let expected = (TAU * frequency * n as f32 / SAMPLE_RATE).sin();
        assert!(
            (buffer[n] - expected).abs() < 1e-5,
            "expected {expected}, got {}",
            buffer[n]
        );
    }

    #[test]
    fn phase_persists_across_blocks() {
        let mut osc = Oscillator::new();
        for _ in 0..100 {
            osc.next_sample(Waveform::Sawtooth, 440.0, SAMPLE_RATE);
        }
        let phase_before = osc.phase();
        let expected = (440.0 * 100.0 / SAMPLE_RATE).fract();
        assert!((phase_before - expected).abs() < 1e-4);
    }

    #[test]
    fn all_waveforms_bounded() {
        for waveform in [
            Waveform::Sine,
            Waveform::WarmSine,
            Waveform::Triangle,
            Waveform::Square,
            Waveform::Sawtooth,
        ] {
            let mut osc = Oscillator::new();
            for _ in 0..1000 {
                let s = osc.next_sample(waveform, 523.25, SAMPLE_RATE);
                assert!(s.abs() <= 1.0 + 1e-6, "{waveform:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn waveform_names_round_trip() {
        for waveform in [
            Waveform::Sine,
            Waveform::WarmSine,
            Waveform::Triangle,
            Waveform::Square,
            Waveform::Sawtooth,
        ] {
            assert_eq!(Waveform::from_name(waveform.name()), Some(waveform));
        }
        assert_eq!(Waveform::from_name("noise"), None);
    }
}
