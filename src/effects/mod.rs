//! Stereo effects applied to the summed voice mix.
//!
//! Both units keep fixed-size circular buffers allocated at construction
//! and are safe to run every buffer; a wet/dry mix of zero gates their
//! contribution multiplicatively rather than bypassing the structure.

/// Multi-tap modulated-delay chorus.
pub mod chorus;
/// Feedback delay.
pub mod delay;

pub use chorus::Chorus;
pub use delay::StereoDelay;
