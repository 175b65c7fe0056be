/*
DC Blocker & Signal Conditioning
================================

First-order highpass in the classic DC-blocker form:

    y[n] = x[n] - x[n-1] + R * y[n-1]

R sets the pole radius: closer to 1.0 means a lower corner frequency
and less phase distortion of low fundamentals, at the cost of slower
DC convergence. The pole adapts to the note being played - very low
notes get a near-unity pole so their fundamental is not smeared, while
normal and high notes use a slightly lower pole for faster DC removal.

The blocker differentiates its input (`x[n] - x[n-1]`), which is why
every new note runs under the envelope's onset ramp: an abrupt first
sample would be differentiated into a tick.
*/

/// Pole radius for notes below the adaptive threshold.
const POLE_LOW_NOTE: f32 = 0.9995;
/// Pole radius for everything else.
const POLE_NORMAL: f32 = 0.995;
/// Fundamental below which the gentler pole is used.
const LOW_NOTE_HZ: f32 = 110.0;

/// Hard safety bound applied when sanitizing intermediate buffers; well
/// outside normal operating level but finite.
pub const SAFETY_CEILING: f32 = 4.0;

#[derive(Debug, Clone, Default)]
pub struct DcBlocker {
    x_prev: f32,
    y_prev: f32,
}

impl DcBlocker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pole radius appropriate for a note's fundamental frequency.
    #[inline]
    pub fn pole_for(fundamental_hz: f32) -> f32 {
        if fundamental_hz < LOW_NOTE_HZ {
            POLE_LOW_NOTE
        } else {
            POLE_NORMAL
        }
    }

    #[inline]
    pub fn next_sample(&mut self, input: f32, pole: f32) -> f32 {
        let output = input - self.x_prev + pole * self.y_prev;
        self.x_prev = input;
        self.y_prev = output;
        output
    }

    pub fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }
}

/// Zero non-finite samples and clamp everything to the safety range, so an
/// isolated numerical fault cannot propagate into the mix.
pub fn sanitize(buffer: &mut [f32]) {
    for sample in buffer.iter_mut() {
        if !sample.is_finite() {
            *sample = 0.0;
        } else {
            *sample = sample.clamp(-SAFETY_CEILING, SAFETY_CEILING);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_dc_offset() {
        let mut blocker = DcBlocker::new();
        let pole = DcBlocker::pole_for(440.0);
        let mut last = 1.0;
        for _ in 0..48_000 {
            last = blocker.next_sample(1.0, pole);
        }
        assert!(last.abs() < 1e-3, "constant input should decay to ~0, got {last}");
    }

    #[test]
    fn low_notes_get_gentler_pole() {
        assert!(DcBlocker::pole_for(55.0) > DcBlocker::pole_for(440.0));
    }

    #[test]
    fn sanitize_clears_non_finite() {
        let mut buffer = [0.5, f32::NAN, f32::INFINITY, -9.0, 0.1];
        sanitize(&mut buffer);
        assert_eq!(buffer[0], 0.5);
        assert_eq!(buffer[1], 0.0);
        assert_eq!(buffer[2], 0.0);
        assert_eq!(buffer[3], -SAFETY_CEILING);
        assert_eq!(buffer[4], 0.1);
    }
}
