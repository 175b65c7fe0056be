use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/*
Arpeggiator
===========

Runs on the audio clock: the engine reports how many frames each render
chunk consumed and the arpeggiator converts tempo into a step length in
samples. The step counter is decremented by whole chunks and carries its
remainder into the next step instead of resetting, so long sequences do
not drift against the sample clock.

Two counters run side by side: the step counter schedules the next
trigger, and a gate counter schedules the release of the currently
sounding step at `gate * step_length` samples after its trigger.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArpMode {
    #[default]
    Up,
    Down,
    UpDown,
    Random,
}

impl ArpMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "updown" | "up_down" => Some(Self::UpDown),
            "random" => Some(Self::Random),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::UpDown => "updown",
            Self::Random => "random",
        }
    }
}

/// Note actions emitted by one clock advance, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpStep {
    Trigger(u8),
    Release(u8),
}

#[derive(Debug)]
pub struct Arpeggiator {
    /// Held notes expanded across octaves, ascending.
    sequence: Vec<u8>,
    position: usize,
    ascending: bool,
    /// Samples until the next trigger; fractional remainder carries over.
    step_counter: f64,
    /// Samples until the current step releases, if one is sounding.
    gate_counter: Option<f64>,
    sounding: Option<u8>,
    rng: SmallRng,
}

impl Arpeggiator {
    pub fn new() -> Self {
        Self::with_seed(0x0A12_93E0)
    }

    /// Fixed seed for reproducible random-mode sequences.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            sequence: Vec::new(),
            position: 0,
            ascending: true,
            step_counter: 0.0,
            gate_counter: None,
            sounding: None,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.sequence.is_empty()
    }

    /// Rebuild the playback sequence from the currently held notes.
    ///
    /// The first note of a fresh sequence fires on the next clock advance
    /// rather than a full step later. An already running sequence keeps its
    /// phase so adding a note mid-pattern does not stutter.
    pub fn rebuild(&mut self, held: &[u8], octaves: u8) {
        let was_running = self.is_running();

        let mut sequence = Vec::with_capacity(held.len() * octaves as usize);
        let mut sorted = held.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for octave in 0..octaves {
            for &note in &sorted {
                let shifted = note as i32 + 12 * octave as i32;
                if shifted <= 127 {
                    sequence.push(shifted as u8);
                }
            }
        }
        self.sequence = sequence;

        if self.sequence.is_empty() {
            self.position = 0;
            self.ascending = true;
            self.step_counter = 0.0;
            self.gate_counter = None;
        } else if !was_running {
            // Prime: trigger immediately on the next advance
            self.position = 0;
            self.ascending = true;
            self.step_counter = 0.0;
        } else if self.position >= self.sequence.len() {
            self.position = self.sequence.len() - 1;
        }
    }

    /// Drop the sequence and release whatever is sounding.
    pub fn stop(&mut self, steps: &mut Vec<ArpStep>) {
        if let Some(note) = self.sounding.take() {
            steps.push(ArpStep::Release(note));
        }
        self.sequence.clear();
        self.position = 0;
        self.ascending = true;
        self.step_counter = 0.0;
        self.gate_counter = None;
    }

    /// Advance the clock by `frames` samples, appending any note actions.
    #[allow(clippy::too_many_arguments)]
    pub fn advance(
        &mut self,
        frames: usize,
        sample_rate: f32,
        tempo_bpm: f32,
        gate: f32,
        mode: ArpMode,
        steps: &mut Vec<ArpStep>,
    ) {
        if self.sequence.is_empty() {
            return;
        }

        let step_len = (60.0 / tempo_bpm as f64) * sample_rate as f64;
        let mut remaining = frames as f64;

        while remaining > 0.0 {
            let to_gate = self.gate_counter.unwrap_or(f64::INFINITY);
            let to_step = self.step_counter;

            // Boundaries are exclusive: an event landing exactly on the
            // buffer end belongs to the next buffer.
            if to_gate <= to_step && to_gate < remaining {
                remaining -= to_gate;
                self.step_counter -= to_gate;
                self.gate_counter = None;
                if let Some(note) = self.sounding.take() {
                    steps.push(ArpStep::Release(note));
                }
            } else if to_step < remaining {
                remaining -= to_step;
                if let Some(g) = self.gate_counter.as_mut() {
                    *g -= to_step;
                }
                // Cut short any step still sounding at the bar line
                if let Some(note) = self.sounding.take() {
                    steps.push(ArpStep::Release(note));
                    self.gate_counter = None;
                }
                let note = self.pick_note(mode);
                steps.push(ArpStep::Trigger(note));
                self.sounding = Some(note);
                self.gate_counter = Some((gate as f64).clamp(0.05, 1.0) * step_len);
                // Consume the elapsed step and keep only the remainder, so
                // intervals stay exact no matter what fired in between
                self.step_counter = self.step_counter - to_step + step_len;
            } else {
                self.step_counter -= remaining;
                if let Some(g) = self.gate_counter.as_mut() {
                    *g -= remaining;
                }
                remaining = 0.0;
            }
        }
    }

    fn pick_note(&mut self, mode: ArpMode) -> u8 {
        let len = self.sequence.len();
        if self.position >= len {
            self.position = 0;
        }
        let index = match mode {
            ArpMode::Up => {
                let i = self.position;
                self.position = (self.position + 1) % len;
                i
            }
            ArpMode::Down => {
                let i = len - 1 - self.position;
                self.position = (self.position + 1) % len;
                i
            }
            ArpMode::UpDown => {
                let i = self.position;
                if len == 1 {
                    i
                } else {
                    if self.ascending {
                        if self.position + 1 >= len {
                            self.ascending = false;
                            self.position -= 1;
                        } else {
                            self.position += 1;
                        }
                    } else if self.position == 0 {
                        self.ascending = true;
                        self.position += 1;
                    } else {
                        self.position -= 1;
                    }
                    i
                }
            }
            ArpMode::Random => self.rng.random_range(0..len),
        };
        self.sequence[index]
    }
}

impl Default for Arpeggiator {
    fn default() -> Self {
        Self::new()
    }
}
