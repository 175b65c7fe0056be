// Purpose - audio device output, control queue wiring

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::synth::message::{event_queue, SynthController};
use crate::SynthEngine;

/// Control events the queue can hold before the producer starts dropping.
const QUEUE_CAPACITY: usize = 256;

#[derive(Debug)]
pub enum StreamError {
    /// No default output device on this host.
    NoDevice,
    Config(cpal::DefaultStreamConfigError),
    Build(cpal::BuildStreamError),
    Play(cpal::PlayStreamError),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDevice => write!(f, "no default audio output device"),
            Self::Config(e) => write!(f, "querying output config: {e}"),
            Self::Build(e) => write!(f, "building output stream: {e}"),
            Self::Play(e) => write!(f, "starting output stream: {e}"),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoDevice => None,
            Self::Config(e) => Some(e),
            Self::Build(e) => Some(e),
            Self::Play(e) => Some(e),
        }
    }
}

impl From<cpal::DefaultStreamConfigError> for StreamError {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<cpal::BuildStreamError> for StreamError {
    fn from(e: cpal::BuildStreamError) -> Self {
        Self::Build(e)
    }
}

impl From<cpal::PlayStreamError> for StreamError {
    fn from(e: cpal::PlayStreamError) -> Self {
        Self::Play(e)
    }
}

/// Handle keeping the audio stream alive. Dropping it stops playback.
///
/// On hosts without a usable output device this exists in an inert state:
/// the controller half still accepts events (they are consumed by nobody)
/// so callers never need a separate headless code path.
pub struct OutputStream {
    stream: Option<cpal::Stream>,
    sample_rate: f32,
    error: Option<StreamError>,
}

impl OutputStream {
    pub fn is_available(&self) -> bool {
        self.stream.is_some()
    }

    /// Sample rate the engine renders at (device rate, or a 48 kHz
    /// stand-in when inert).
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Why the stream is inert, when it is.
    pub fn error(&self) -> Option<&StreamError> {
        self.error.as_ref()
    }
}

/// Open the default output device and start rendering.
///
/// Never fails: device problems produce an inert stream whose error is
/// queryable, and the returned controller works identically either way.
pub fn start() -> (SynthController, OutputStream) {
    let (controller, rx) = event_queue(QUEUE_CAPACITY);
    match try_start(rx) {
        Ok(stream) => (controller, stream),
        Err(error) => (
            controller,
            OutputStream {
                stream: None,
                sample_rate: 48_000.0,
                error: Some(error),
            },
        ),
    }
}

fn try_start(rx: rtrb::Consumer<crate::EngineEvent>) -> Result<OutputStream, StreamError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(StreamError::NoDevice)?;
    let default_config = device.default_output_config()?;
    let sample_rate = default_config.sample_rate().0 as f32;
    let config = cpal::StreamConfig {
        channels: 2,
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut engine = SynthEngine::new(sample_rate, rx);
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _| fill_or_silence(data, |buf| engine.render(buf)),
        |err| eprintln!("audio stream error: {err}"),
        None,
    )?;
    stream.play()?;

    Ok(OutputStream {
        stream: Some(stream),
        sample_rate,
        error: None,
    })
}

/// A panicking render must not unwind into the C audio thread. Substitute
/// silence for the faulting buffer only; the engine is called again on the
/// next one.
fn fill_or_silence(data: &mut [f32], render: impl FnOnce(&mut [f32])) {
    if catch_unwind(AssertUnwindSafe(|| render(&mut *data))).is_err() {
        data.fill(0.0);
    }
}
