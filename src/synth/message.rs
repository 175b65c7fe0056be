#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, RingBuffer};

use crate::synth::params::ParamMap;

/// Commands enqueued by the control context, consumed exactly once by the
/// render context in FIFO order. The queue is the only synchronization
/// primitive between the two: everything else the engine touches is owned
/// by the render context.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    Parameters(ParamMap),
    PitchBend { semitones: f32 },
    AllNotesOff,
    /// Arms a short fade-to-silence-then-back window; sent ahead of atomic
    /// multi-parameter bundles to hide combinatorial discontinuities.
    MuteGate,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<EngineEvent>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<EngineEvent> {
    fn pop(&mut self) -> Option<EngineEvent> {
        Consumer::pop(self).ok()
    }
}

/// Offline driver: events are injected directly via
/// [`SynthEngine::enqueue`](crate::SynthEngine::enqueue) instead.
#[derive(Debug, Default)]
pub struct NoMessages;

impl MessageReceiver for NoMessages {
    fn pop(&mut self) -> Option<EngineEvent> {
        None
    }
}

/// Control-side handle owning the producer half of the event queue.
/// Callable from any thread; never blocks. A full queue drops the event,
/// which beats stalling a UI thread.
#[cfg(feature = "rtrb")]
pub struct SynthController {
    tx: Producer<EngineEvent>,
}

#[cfg(feature = "rtrb")]
impl SynthController {
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        let _ = self.tx.push(EngineEvent::NoteOn { note, velocity });
    }

    pub fn note_off(&mut self, note: u8, velocity: u8) {
        let _ = self.tx.push(EngineEvent::NoteOff { note, velocity });
    }

    pub fn all_notes_off(&mut self) {
        let _ = self.tx.push(EngineEvent::AllNotesOff);
    }

    pub fn pitch_bend(&mut self, semitones: f32) {
        let _ = self.tx.push(EngineEvent::PitchBend { semitones });
    }

    /// Ordinary parameter update; smoothed parameters glide, the rest apply
    /// at the next buffer boundary.
    pub fn update_parameters(&mut self, map: ParamMap) {
        let _ = self.tx.push(EngineEvent::Parameters(map));
    }

    /// Atomic multi-parameter bundle (e.g. "randomize all"): the mute gate
    /// ahead of the map makes the engine apply it under silence.
    pub fn update_parameters_gated(&mut self, map: ParamMap) {
        let _ = self.tx.push(EngineEvent::MuteGate);
        let _ = self.tx.push(EngineEvent::Parameters(map));
    }
}

/// Build the SPSC event queue shared by a controller and an engine.
#[cfg(feature = "rtrb")]
pub fn event_queue(capacity: usize) -> (SynthController, Consumer<EngineEvent>) {
    let (tx, rx) = RingBuffer::new(capacity);
    (SynthController { tx }, rx)
}
