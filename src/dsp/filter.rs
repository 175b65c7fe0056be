#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

use crate::dsp::distortion::soft_clip;

/*
Filter Section
==============

Two selectable topologies, applied per voice per oscillator rank:

Ladder (4-pole lowpass)
    A cascade of four one-pole lowpass integrators with global feedback
    from the last stage back to the input. The feedback path is
    soft-saturated, which both tames resonance blowup and adds the
    gentle compression the topology is loved for. Resonance is scaled
    by a stability normalization so the full cutoff range stays stable.

State-variable (Chamberlin)
    A two-integrator lowpass/bandpass loop using the Chamberlin update
    order (low first, then high, then band). Unconditionally stable
    only while f = 2 sin(pi fc / sr) stays small, so cutoff is limited
    to sr/6. Resonance maps inversely onto the damping factor.

Both share a gain-compensation multiplier derived from the same cutoff
coefficient used internally: closing the filter removes energy, so the
reciprocal of the coefficient (clamped to a configurable ceiling) keeps
perceived loudness roughly level across a cutoff sweep. The clamp
ceiling is empirically tuned, hence a plain field rather than a buried
constant.

A separate one-pole highpass ("rumble" stage) sits after the topology
with a fixed low cutoff, catching sub-sonic buildup from resonance and
detune beating.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Ladder,
    StateVariable,
}

impl FilterMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ladder" => Some(Self::Ladder),
            "svf" | "state_variable" => Some(Self::StateVariable),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ladder => "ladder",
            Self::StateVariable => "svf",
        }
    }
}

/// Default gain-compensation ceiling shared by both topologies.
pub const DEFAULT_COMP_CEILING: f32 = 4.0;

/// 4-pole ladder lowpass with saturating global feedback.
#[derive(Debug, Clone)]
pub struct LadderFilter {
    stages: [f32; 4],
    pub comp_ceiling: f32,
}

impl LadderFilter {
    pub fn new() -> Self {
        Self {
            stages: [0.0; 4],
            comp_ceiling: DEFAULT_COMP_CEILING,
        }
    }

    /// One-pole coefficient for a cutoff in Hz. Exact (exponential) form,
    /// stable for any cutoff below Nyquist.
    #[inline]
    pub fn coefficient(cutoff_hz: f32, sample_rate: f32) -> f32 {
        1.0 - (-TAU * cutoff_hz.clamp(20.0, sample_rate * 0.45) / sample_rate).exp()
    }

    /// Feedback amount from resonance in [0, 1). Normalized so the cascade
    /// stays stable short of self-oscillation at resonance = 1.
    #[inline]
    pub fn feedback(resonance: f32) -> f32 {
        resonance.clamp(0.0, 0.95) * 4.0
    }

    #[inline]
    pub fn next_sample(&mut self, input: f32, g: f32, k: f32) -> f32 {
        let x = input - k * soft_clip(self.stages[3], 1.0);
        self.stages[0] += g * (x - self.stages[0]);
        self.stages[1] += g * (self.stages[0] - self.stages[1]);
        self.stages[2] += g * (self.stages[1] - self.stages[2]);
        self.stages[3] += g * (self.stages[2] - self.stages[3]);
        self.stages[3]
    }

    /// Loudness compensation for the current coefficient.
    #[inline]
    pub fn gain_compensation(&self, g: f32) -> f32 {
        (0.25 / g.max(1e-4)).clamp(1.0, self.comp_ceiling)
    }

    pub fn reset(&mut self) {
        self.stages = [0.0; 4];
    }
}

impl Default for LadderFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Chamberlin state-variable filter, lowpass output.
#[derive(Debug, Clone)]
pub struct SvFilter {
    low: f32,
    band: f32,
    pub comp_ceiling: f32,
}

impl SvFilter {
    pub fn new() -> Self {
        Self {
            low: 0.0,
            band: 0.0,
            comp_ceiling: DEFAULT_COMP_CEILING,
        }
    }

    /// Frequency coefficient, cutoff limited to the unconditional-stability
    /// region (sr/6).
    #[inline]
    pub fn coefficient(cutoff_hz: f32, sample_rate: f32) -> f32 {
        let limited = cutoff_hz.clamp(20.0, sample_rate / 6.0);
        2.0 * (PI * limited / sample_rate).sin()
    }

    /// Resonance maps inversely to damping; floor keeps the loop stable.
    #[inline]
    pub fn damping(resonance: f32) -> f32 {
        (2.0 * (1.0 - resonance.clamp(0.0, 0.95))).max(0.1)
    }

    #[inline]
    pub fn next_sample(&mut self, input: f32, f: f32, damp: f32) -> f32 {
        // Chamberlin update order: low, high, band
        self.low += f * self.band;
        let high = input - self.low - damp * self.band;
        self.band += f * high;
        self.low
    }

    #[inline]
    pub fn gain_compensation(&self, f: f32) -> f32 {
        (0.25 / f.max(1e-4)).clamp(1.0, self.comp_ceiling)
    }

    pub fn reset(&mut self) {
        self.low = 0.0;
        self.band = 0.0;
    }
}

impl Default for SvFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// One-pole highpass for sub-sonic rumble removal.
#[derive(Debug, Clone, Default)]
pub struct RumbleFilter {
    lp: f32,
}

impl RumbleFilter {
    pub fn new() -> Self {
        Self { lp: 0.0 }
    }

    #[inline]
    pub fn coefficient(cutoff_hz: f32, sample_rate: f32) -> f32 {
        1.0 - (-TAU * cutoff_hz.clamp(5.0, 400.0) / sample_rate).exp()
    }

    #[inline]
    pub fn next_sample(&mut self, input: f32, a: f32) -> f32 {
        self.lp += a * (input - self.lp);
        input - self.lp
    }

    pub fn reset(&mut self) {
        self.lp = 0.0;
    }
}

/// Effective cutoff for a voice: base cutoff pulled toward the note's
/// fundamental plus a velocity-scaled offset.
#[inline]
pub fn effective_cutoff(base_hz: f32, fundamental_hz: f32, velocity: f32) -> f32 {
    (base_hz + 0.3 * fundamental_hz + 1200.0 * (velocity - 0.5)).clamp(20.0, 16_000.0)
}
