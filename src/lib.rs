pub mod dsp;
pub mod effects; // Stereo effects applied to the voice mix
pub mod synth; // Voice management, polyphony, event handling

#[cfg(all(feature = "rtrb", feature = "demo"))]
pub mod io;

pub use synth::engine::SynthEngine;
pub use synth::message::EngineEvent;
#[cfg(feature = "rtrb")]
pub use synth::message::SynthController;

pub const MAX_BLOCK_SIZE: usize = 2048;
pub const NUM_VOICES: usize = 8;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
