use crate::dsp::delay::DelayLine;
use std::f32::consts::TAU;

/*
Chorus
======

Thickens the mix by layering short, pitch-wobbling delayed copies over
the dry signal. Four read taps share one delay line per channel; their
LFO phases are spread 90 degrees apart so the detuning of each tap
peaks at a different moment, which reads as several players rather
than one vibrato.

Each tap sweeps up to ~25 ms around a small fixed base delay. Tap
outputs are averaged before the wet/dry crossfade. The right channel's
LFO runs slightly offset from the left for stereo width.
*/

const TAP_COUNT: usize = 4;
const BASE_DELAY_MS: f32 = 8.0;
const MAX_SWEEP_MS: f32 = 25.0;
/// Small phase offset between channels for width.
const CHANNEL_SPREAD: f32 = 0.125;

pub struct Chorus {
    lines: [DelayLine; 2],
    phase: f32,
    rate: f32,
    depth: f32,
    mix: f32,
    sample_rate: f32,
}

impl Chorus {
    pub fn new(sample_rate: f32) -> Self {
        // Base delay + full sweep + interpolation headroom
        let capacity = ((BASE_DELAY_MS + MAX_SWEEP_MS) / 1000.0 * sample_rate) as usize + 8;
        Self {
            lines: [DelayLine::new(capacity), DelayLine::new(capacity)],
            phase: 0.0,
            rate: 0.8,
            depth: 0.5,
            mix: 0.0,
            sample_rate,
        }
    }

    pub fn set_rate(&mut self, rate_hz: f32) {
        self.rate = rate_hz.clamp(0.05, 10.0);
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());

        let phase_inc = self.rate / self.sample_rate;
        let base = BASE_DELAY_MS / 1000.0 * self.sample_rate;
        let sweep = self.depth * MAX_SWEEP_MS / 1000.0 * self.sample_rate;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let wet_l = self.wet_sample(0, self.phase, base, sweep, *l);
            let wet_r = self.wet_sample(1, self.phase + CHANNEL_SPREAD, base, sweep, *r);

            *l = *l * (1.0 - self.mix) + wet_l * self.mix;
            *r = *r * (1.0 - self.mix) + wet_r * self.mix;

            self.phase += phase_inc;
            self.phase -= self.phase.floor();
        }
    }

    #[inline]
    fn wet_sample(&mut self, channel: usize, phase: f32, base: f32, sweep: f32, input: f32) -> f32 {
        let line = &mut self.lines[channel];
        let mut acc = 0.0;
        for tap in 0..TAP_COUNT {
            let tap_phase = phase + tap as f32 * 0.25;
            let offset = 0.5 + 0.5 * (TAU * tap_phase).sin();
            acc += line.read_interpolated(base + offset * sweep);
        }
        line.write(input);
        acc / TAP_COUNT as f32
    }

    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
        self.phase = 0.0;
    }
}
