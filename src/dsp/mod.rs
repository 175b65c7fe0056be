//! Low-level DSP primitives used by the voice and engine layers.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside voice structs. They intentionally stay focused on the
//! signal-processing math so the engine layer can handle orchestration,
//! events, and modulation routing.

/// DC-blocking highpass and buffer sanitizing.
pub mod dc_blocker;
/// Time-domain delay line with optional interpolated reads.
pub mod delay;
/// Soft-saturating waveshapers for the master output stage.
pub mod distortion;
/// Clock-driven ADSR envelope with anti-click refinements.
pub mod envelope;
/// Ladder and state-variable filter topologies.
pub mod filter;
/// Control-rate oscillator for parameter modulation.
pub mod lfo;
/// Audio-band phase-accumulator oscillator.
pub mod oscillator;

pub use filter::FilterMode;
pub use oscillator::Waveform;
