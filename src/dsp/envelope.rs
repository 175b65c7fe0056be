use crate::MIN_TIME;

/*
ADSR Envelope With Anti-Click Refinements
=========================================

The envelope is evaluated per sample from the voice's elapsed envelope
clock rather than from a per-stage increment. That makes the shape a
pure function of (clock, parameters), so parameter changes between
buffers cannot strand the level between stages.

Shape
-----

  Attack    Linear ramp from 0 to the velocity-scaled peak.
  Decay     Exponential approach from the peak toward sustain. The
            curve asymptotes; by `decay` seconds it has covered ~95%
            of the drop.
  Sustain   Held implicitly by the decay asymptote.
  Release   Exponential decay from the level captured at note-off.
            The time constant stretches for soft release velocities,
            so a gently lifted key rings longer.

Velocity maps to peak level through a power curve biased away from
zero: v^0.7 scaled into [0.25, 1.0]. Low velocities stay audible
instead of disappearing.

Two refinements exist purely to prevent clicks:

  Steal crossfade   When a voice is retriggered while still audible,
                    the previous output level is captured and blended
                    linearly into the new attack over a few
                    milliseconds. Without this, voice stealing steps
                    the amplitude discontinuously.

  Onset ramp        Every new note starts under a short exponential
                    fade-in whose length scales with the note's period
                    (longer for low notes). Its real job is to hide
                    the DC blocker's settling transient: the blocker
                    differentiates its input, so an abrupt non-zero
                    first sample would otherwise produce an audible
                    tick.
*/

/// ADSR timing/level parameters, owned by the engine and passed per buffer.
#[derive(Debug, Clone, Copy)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub intensity: f32,
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.2,
            sustain: 0.7,
            release: 0.1,
            intensity: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Held,
    Releasing,
}

/// Steal-crossfade length in seconds.
const STEAL_XFADE: f32 = 0.004;
/// Onset ramp bounds in samples (floor keeps very high notes from a
/// zero-length ramp, ceiling keeps sub-bass notes from a slow swell).
const ONSET_MIN_SAMPLES: f32 = 64.0;
const ONSET_MAX_SAMPLES: f32 = 2400.0;
/// Level below which a releasing envelope counts as finished.
const SILENCE_FLOOR: f32 = 1e-4;

#[derive(Debug, Clone)]
pub struct Envelope {
    stage: Stage,
    clock: f32,
    velocity: f32,
    level: f32,
    release_start_level: f32,
    release_scale: f32,
    steal_level: f32,
    steal_remaining: u32,
    steal_total: u32,
    onset_elapsed: f32,
    onset_total: f32,
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            stage: Stage::Idle,
            clock: 0.0,
            velocity: 1.0,
            level: 0.0,
            release_start_level: 0.0,
            release_scale: 1.0,
            steal_level: 0.0,
            steal_remaining: 0,
            steal_total: 1,
            onset_elapsed: 0.0,
            onset_total: ONSET_MIN_SAMPLES,
        }
    }

    /// Start (or restart) the envelope. If the voice was still audible,
    /// capture its level as the crossfade starting point.
    pub fn trigger(&mut self, velocity: f32, frequency: f32, sample_rate: f32) {
        if self.level > SILENCE_FLOOR {
            self.steal_level = self.level;
            self.steal_total = (STEAL_XFADE * sample_rate).max(1.0) as u32;
            self.steal_remaining = self.steal_total;
        } else {
            self.steal_remaining = 0;
        }

        // Two periods of the note, clamped - low notes get longer ramps
        let period_samples = sample_rate / frequency.max(1.0);
        self.onset_total = (2.0 * period_samples).clamp(ONSET_MIN_SAMPLES, ONSET_MAX_SAMPLES);
        self.onset_elapsed = 0.0;

        self.velocity = velocity.clamp(0.0, 1.0);
        self.clock = 0.0;
        self.stage = Stage::Held;
    }

    /// Gate low: decay exponentially from the current level. Softer
    /// release velocity stretches the tail.
    pub fn release(&mut self, release_velocity: f32) {
        if self.stage != Stage::Held {
            return;
        }
        self.release_start_level = self.level;
        self.release_scale = 1.0 + (1.0 - release_velocity.clamp(0.0, 1.0)) * 0.75;
        self.clock = 0.0;
        self.stage = Stage::Releasing;
    }

    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.clock = 0.0;
        self.level = 0.0;
        self.release_start_level = 0.0;
        self.steal_level = 0.0;
        self.steal_remaining = 0;
        self.onset_elapsed = 0.0;
    }

    /// Advance one sample and return the output level.
    #[inline]
    pub fn next_sample(&mut self, params: &AdsrParams, sample_rate: f32) -> f32 {
        let dt = 1.0 / sample_rate;
        let peak = params.intensity * velocity_curve(self.velocity);

        let raw = match self.stage {
            Stage::Idle => 0.0,
            Stage::Held => {
                if self.clock < params.attack {
                    (self.clock / params.attack.max(MIN_TIME)) * peak
                } else {
                    let sustain_level = peak * params.sustain;
                    let t = self.clock - params.attack;
                    sustain_level
                        + (peak - sustain_level) * (-3.0 * t / params.decay.max(MIN_TIME)).exp()
                }
            }
            Stage::Releasing => {
                let tau = (params.release * self.release_scale).max(MIN_TIME);
                let value = self.release_start_level * (-3.0 * self.clock / tau).exp();
                if value <= SILENCE_FLOOR {
                    self.stage = Stage::Idle;
                    0.0
                } else {
                    value
                }
            }
        };

        // Onset ramp masks the DC blocker's settling transient
        let ramped = if self.onset_elapsed < self.onset_total && self.stage != Stage::Idle {
            let progress = self.onset_elapsed / self.onset_total;
            self.onset_elapsed += 1.0;
            raw * (1.0 - (-5.0 * progress).exp())
        } else {
            raw
        };

        // Steal crossfade blends from the previous output level
        let out = if self.steal_remaining > 0 {
            let t = 1.0 - self.steal_remaining as f32 / self.steal_total as f32;
            self.steal_remaining -= 1;
            self.steal_level * (1.0 - t) + ramped * t
        } else {
            ramped
        };

        self.clock += dt;
        self.level = out;
        out
    }

    pub fn is_active(&self) -> bool {
        self.stage != Stage::Idle
    }

    pub fn is_releasing(&self) -> bool {
        self.stage == Stage::Releasing
    }

    pub fn level(&self) -> f32 {
        self.level
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

/// Power curve biased so low velocities are not silent: [0.25, 1.0].
#[inline]
fn velocity_curve(velocity: f32) -> f32 {
    0.25 + 0.75 * velocity.powf(0.7)
}
