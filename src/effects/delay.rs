use crate::dsp::delay::DelayLine;

/// Maximum delay time in seconds; sets the circular buffer capacity.
pub const MAX_DELAY_SECONDS: f32 = 2.5;

/// Stereo feedback delay.
///
/// Standard difference equation per channel:
///
/// ```text
/// write   = input + feedback * delayed
/// output  = dry * (1 - mix) + delayed * mix
/// ```
pub struct StereoDelay {
    lines: [DelayLine; 2],
    time: f32,
    feedback: f32,
    mix: f32,
    sample_rate: f32,
}

impl StereoDelay {
    pub fn new(sample_rate: f32) -> Self {
        let capacity = (MAX_DELAY_SECONDS * sample_rate) as usize + 1;
        Self {
            lines: [DelayLine::new(capacity), DelayLine::new(capacity)],
            time: 0.35,
            feedback: 0.3,
            mix: 0.0,
            sample_rate,
        }
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds.clamp(0.01, MAX_DELAY_SECONDS);
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        // Below 1.0 so the tail always decays
        self.feedback = feedback.clamp(0.0, 0.9);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());

        let delay_samples = ((self.time * self.sample_rate) as usize).max(1);
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            for (line, sample) in self.lines.iter_mut().zip([&mut *l, &mut *r]) {
                let delayed = line.read(delay_samples);
                line.write(*sample + self.feedback * delayed);
                *sample = *sample * (1.0 - self.mix) + delayed * self.mix;
            }
        }
    }

    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
    }
}
