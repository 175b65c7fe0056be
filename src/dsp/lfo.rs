#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::f32::consts::TAU;

/*
Modulation LFO
==============

One process-wide low-frequency oscillator, advanced once per render
buffer (control rate, not audio rate). A single depth value routes to
one of four targets; each target applies its own fixed sensitivity so
that pitch and amplitude modulation stay subtle while filter modulation
can sweep widely:

    Pitch       +/- 0.5 semitone at full depth (vibrato range)
    Cutoff      +/- 2 octaves at full depth (filter sweeps)
    Amplitude   +/- 30% at full depth (tremolo range)
    All         all three simultaneously

Sample-and-hold draws a new random value only when the phase wraps, so
its step rate equals the LFO frequency. The generator is seedable for
reproducible tests.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoShape {
    #[default]
    Sine,
    Triangle,
    Square,
    SampleHold,
}

impl LfoShape {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sine" => Some(Self::Sine),
            "triangle" => Some(Self::Triangle),
            "square" => Some(Self::Square),
            "sample_hold" => Some(Self::SampleHold),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Triangle => "triangle",
            Self::Square => "square",
            Self::SampleHold => "sample_hold",
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoTarget {
    #[default]
    Pitch,
    Cutoff,
    Amplitude,
    All,
}

impl LfoTarget {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pitch" => Some(Self::Pitch),
            "cutoff" => Some(Self::Cutoff),
            "amplitude" => Some(Self::Amplitude),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pitch => "pitch",
            Self::Cutoff => "cutoff",
            Self::Amplitude => "amplitude",
            Self::All => "all",
        }
    }
}

const PITCH_SENS_SEMITONES: f32 = 0.5;
const CUTOFF_SENS_OCTAVES: f32 = 2.0;
const AMP_SENS: f32 = 0.3;

/// Per-buffer modulation multipliers, all 1.0 when unrouted.
#[derive(Debug, Clone, Copy)]
pub struct ModulationValues {
    pub pitch_ratio: f32,
    pub cutoff_ratio: f32,
    pub amplitude: f32,
}

impl Default for ModulationValues {
    fn default() -> Self {
        Self {
            pitch_ratio: 1.0,
            cutoff_ratio: 1.0,
            amplitude: 1.0,
        }
    }
}

#[derive(Debug)]
pub struct Lfo {
    phase: f32,
    held: f32,
    rng: SmallRng,
}

impl Lfo {
    pub fn new() -> Self {
        Self::with_seed(0x5EED_CAFE)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            phase: 0.0,
            held: 0.0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Sample the LFO at its current phase, then advance by one buffer.
    /// Returns a bipolar value in [-1, 1].
    pub fn advance(&mut self, shape: LfoShape, frequency: f32, frames: usize, sample_rate: f32) -> f32 {
        let value = match shape {
            LfoShape::Sine => (TAU * self.phase).sin(),
            LfoShape::Triangle => 1.0 - 4.0 * (self.phase - 0.5).abs(),
            LfoShape::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoShape::SampleHold => self.held,
        };

        self.phase += frequency.max(0.0) * frames as f32 / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
            // New random draw only on wrap
            self.held = self.rng.random::<f32>() * 2.0 - 1.0;
        }

        value
    }

    /// Route a bipolar LFO value to its target with per-target sensitivity.
    pub fn modulation(value: f32, target: LfoTarget, depth: f32) -> ModulationValues {
        let depth = depth.clamp(0.0, 1.0);
        let mut values = ModulationValues::default();
        let scaled = value * depth;

        if matches!(target, LfoTarget::Pitch | LfoTarget::All) {
            values.pitch_ratio = 2f32.powf(scaled * PITCH_SENS_SEMITONES / 12.0);
        }
        if matches!(target, LfoTarget::Cutoff | LfoTarget::All) {
            values.cutoff_ratio = 2f32.powf(scaled * CUTOFF_SENS_OCTAVES);
        }
        if matches!(target, LfoTarget::Amplitude | LfoTarget::All) {
            values.amplitude = (1.0 + scaled * AMP_SENS).max(0.0);
        }
        values
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new()
    }
}
