/// Circular delay line with read-before-write semantics.
///
/// `read(d)` returns the sample written `d` calls ago (d >= 1), so an
/// effect reads its tap first, then writes the new input:
///
/// ```
/// use acorde_synth::dsp::delay::DelayLine;
/// let mut line = DelayLine::new(64);
/// line.write(0.8);
/// assert_eq!(line.read(1), 0.8);
/// ```
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(2)],
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    #[inline]
    pub fn read(&self, delay_samples: usize) -> f32 {
        let len = self.buffer.len();
        let delay_samples = delay_samples.clamp(1, len - 1);
        self.buffer[(self.write_pos + len - delay_samples) % len]
    }

    /// Linearly interpolated fractional read, for modulated taps where an
    /// integer delay would produce zipper noise.
    #[inline]
    pub fn read_interpolated(&self, delay_samples: f32) -> f32 {
        let delay_samples = delay_samples.max(1.0);
        let whole = delay_samples.floor() as usize;
        let frac = delay_samples - whole as f32;
        let a = self.read(whole);
        let b = self.read(whole + 1);
        a + (b - a) * frac
    }

    /// Read the tap, then write the input. The standard delay-effect step.
    #[inline]
    pub fn next_sample(&mut self, sample: f32, delay_samples: usize) -> f32 {
        let delayed = self.read(delay_samples);
        self.write(sample);
        delayed
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_by_requested_samples() {
        let mut line = DelayLine::new(16);
        let mut output = Vec::new();
        for i in 0..10 {
            output.push(line.next_sample(i as f32, 4));
        }
        // First 4 outputs are silence from the empty buffer
        assert_eq!(&output[..5], &[0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(output[5], 1.0);
        assert_eq!(output[9], 5.0);
    }

    #[test]
    fn interpolated_read_blends_neighbors() {
        let mut line = DelayLine::new(16);
        line.write(1.0);
        line.write(3.0);
        // 1.5 samples ago: halfway between 3.0 (1 ago) and 1.0 (2 ago)
        assert!((line.read_interpolated(1.5) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn reset_clears_history() {
        let mut line = DelayLine::new(8);
        line.write(0.7);
        line.reset();
        assert_eq!(line.read(1), 0.0);
    }
}
