//! Soft-saturating waveshapers.
//!
//! The master output stage pushes the voice mix through a bounded, smooth
//! nonlinearity so that stacked voices compress gently instead of clipping
//! hard. The ladder filter reuses the rational soft clip on its feedback
//! path to keep resonance from running away.
//!
//! Two shapes:
//!
//! - `soft_clip` - rational `x / (1 + |x|)`: cheap, bounded, and monotonic;
//!   used inside per-sample feedback loops.
//! - `saturate` - `tanh(x)`: slightly steeper knee, used once per output
//!   sample where the extra cost is irrelevant.

/// Rational soft clip, `(x * drive) / (1 + |x * drive|)`. Bounded to (-1, 1).
#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

/// Hyperbolic-tangent saturation. Bounded to [-1, 1] (large inputs round
/// to exactly 1 in f32), near-linear below |x| ~ 0.5.
#[inline]
pub fn saturate(sample: f32) -> f32 {
    sample.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_clip_bounded() {
        for x in [-100.0, -1.0, 0.0, 1.0, 100.0] {
            assert!(soft_clip(x, 10.0).abs() < 1.0);
        }
    }

    #[test]
    fn soft_clip_near_linear_for_small_input() {
        let out = soft_clip(0.1, 1.0);
        assert!((out - 0.0909).abs() < 0.001);
    }

    #[test]
    fn saturate_bounded_and_monotonic() {
        // tanh of large arguments rounds to exactly 1.0 in f32, so the
        // bound is inclusive and monotonicity non-strict at the rails
        let mut prev = saturate(-10.0);
        for i in -9..=10 {
            let out = saturate(i as f32);
            assert!(out.abs() <= 1.0);
            assert!(out >= prev);
            prev = out;
        }
        assert!(saturate(0.5) > saturate(-0.5));
    }
}
