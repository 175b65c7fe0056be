use std::collections::VecDeque;

use crate::dsp::dc_blocker::sanitize;
use crate::dsp::distortion::saturate;
use crate::dsp::lfo::Lfo;
use crate::effects::{Chorus, StereoDelay};
use crate::synth::arpeggiator::{ArpStep, Arpeggiator};
use crate::synth::message::{EngineEvent, MessageReceiver, NoMessages};
use crate::synth::params::Params;
use crate::synth::voice::{Voice, VoiceRenderConfig, VoiceState};
use crate::synth::midi_to_freq;
use crate::{MAX_BLOCK_SIZE, NUM_VOICES};

/*
Engine
======

Owns the voice pool, the parameter set, modulation, and the stereo
effect chain, and renders interleaved stereo on the audio thread. Per
chunk (at most MAX_BLOCK_SIZE frames) the order is fixed:

  1. drain control events (note events capped per buffer)
  2. advance parameter smoothing and the LFO
  3. advance the arpeggiator clock, applying its triggers/releases
  4. render each active voice to mono, sanitize, pan into the stereo bus
  5. chorus, then delay
  6. master: polyphony gain ramp, drive compensation, amp level,
     tanh saturation, volume, fades, final clamp

Everything here is allocation-free after construction; event maps are
the only heap traffic and they arrive pre-built from the control side.
*/

/// At most this many note on/off events are applied per buffer; the rest
/// carry over. Keeps a flood of events from bunching sharp attacks into
/// one buffer.
const NOTE_EVENTS_PER_BUFFER: usize = 3;

/// Mute-gate and filter-switch fade length in seconds.
const FADE_SECONDS: f32 = 0.005;
const GATE_EPSILON: f32 = 1e-3;

/// Fixed stereo seats for the voice pool, center-out.
const PAN_POSITIONS: [f32; NUM_VOICES] = [0.0, -0.4, 0.4, -0.7, 0.7, -0.2, 0.2, -0.55];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Open,
    Closing,
    Opening,
}

/// One sample of mute-gate and filter-switch fade; returns the combined gain.
fn fade_sample(gate: &mut GateState, gate_gain: &mut f32, switch_gain: &mut f32, step: f32) -> f32 {
    match *gate {
        GateState::Open => {}
        GateState::Closing => {
            *gate_gain = (*gate_gain - step).max(0.0);
        }
        GateState::Opening => {
            *gate_gain += step;
            if *gate_gain >= 1.0 {
                *gate_gain = 1.0;
                *gate = GateState::Open;
            }
        }
    }
    if *switch_gain < 1.0 {
        *switch_gain = (*switch_gain + step).min(1.0);
    }
    *gate_gain * *switch_gain
}

pub struct SynthEngine<R: MessageReceiver = NoMessages> {
    rx: R,
    sample_rate: f32,
    params: Params,
    voices: Vec<Voice>,
    /// Physically held keys, in press order. Feeds the arpeggiator and
    /// steal priorities.
    held_notes: Vec<u8>,
    /// Velocity applied to arpeggiated triggers (last key pressed).
    arp_velocity: f32,
    arp: Arpeggiator,
    lfo: Lfo,
    chorus: Chorus,
    delay: StereoDelay,

    /// Events held over: note events past the per-buffer cap, and
    /// everything queued behind a closing mute gate.
    deferred: VecDeque<EngineEvent>,
    gate: GateState,
    gate_gain: f32,
    /// Ramps 0 -> 1 after a filter topology switch.
    switch_gain: f32,
    fade_step: f32,

    /// Smoothed polyphony normalization gain, 1/sqrt(active voices).
    voice_gain: f32,

    scratch: Vec<f32>,
    bus_left: Vec<f32>,
    bus_right: Vec<f32>,
    arp_steps: Vec<ArpStep>,
}

impl SynthEngine<NoMessages> {
    /// Engine without a control queue; drive it with [`enqueue`].
    ///
    /// [`enqueue`]: SynthEngine::enqueue
    pub fn offline(sample_rate: f32) -> Self {
        Self::new(sample_rate, NoMessages)
    }
}

impl<R: MessageReceiver> SynthEngine<R> {
    pub fn new(sample_rate: f32, rx: R) -> Self {
        Self {
            rx,
            sample_rate,
            params: Params::default(),
            voices: PAN_POSITIONS.iter().map(|&pan| Voice::new(pan)).collect(),
            held_notes: Vec::with_capacity(16),
            arp_velocity: 0.8,
            arp: Arpeggiator::new(),
            lfo: Lfo::new(),
            chorus: Chorus::new(sample_rate),
            delay: StereoDelay::new(sample_rate),
            deferred: VecDeque::new(),
            gate: GateState::Open,
            gate_gain: 1.0,
            switch_gain: 1.0,
            fade_step: 1.0 / (FADE_SECONDS * sample_rate).max(1.0),
            voice_gain: 1.0,
            scratch: vec![0.0; MAX_BLOCK_SIZE],
            bus_left: vec![0.0; MAX_BLOCK_SIZE],
            bus_right: vec![0.0; MAX_BLOCK_SIZE],
            arp_steps: Vec::with_capacity(8),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Read-only view of the voice pool for displays and assertions.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_playing()).count()
    }

    /// Inject a control event ahead of the next buffer. This is the
    /// driving path for offline rendering and tests; with a live queue
    /// attached it still works and keeps FIFO order with queued events.
    pub fn enqueue(&mut self, event: EngineEvent) {
        self.deferred.push_back(event);
    }

    /// Render interleaved stereo into `out`. The slice length must be
    /// even; it is always filled completely.
    pub fn render(&mut self, out: &mut [f32]) {
        debug_assert!(out.len() % 2 == 0);
        let mut offset = 0;
        while offset < out.len() {
            let frames = ((out.len() - offset) / 2).min(MAX_BLOCK_SIZE);
            if frames == 0 {
                break;
            }
            self.render_chunk(frames, &mut out[offset..offset + frames * 2]);
            offset += frames * 2;
        }
    }

    fn render_chunk(&mut self, frames: usize, out: &mut [f32]) {
        self.drain_events();
        self.params.advance_smoothing();

        let lfo_value = self.lfo.advance(
            self.params.lfo_shape,
            self.params.lfo_freq,
            frames,
            self.sample_rate,
        );
        let modulation = Lfo::modulation(lfo_value, self.params.lfo_target, self.params.lfo_depth);

        if self.params.arp_enabled && self.arp.is_running() {
            let mut steps = std::mem::take(&mut self.arp_steps);
            steps.clear();
            self.arp.advance(
                frames,
                self.sample_rate,
                self.params.arp_tempo,
                self.params.arp_gate,
                self.params.arp_mode,
                &mut steps,
            );
            for step in &steps {
                match *step {
                    ArpStep::Trigger(note) => self.trigger_note(note, self.arp_velocity),
                    ArpStep::Release(note) => self.release_note(note, 1.0),
                }
            }
            self.arp_steps = steps;
        }

        let bend_ratio = (self.params.pitch_bend.current() / 12.0).exp2();
        let octave_ratio = (self.params.octave as f32).exp2();
        let config = VoiceRenderConfig {
            sample_rate: self.sample_rate,
            waveform: self.params.waveform,
            rank2_enabled: self.params.rank2_enabled,
            rank2_waveform: self.params.rank2_waveform,
            rank2_ratio: (self.params.rank2_detune / 1200.0).exp2(),
            rank2_mix: self.params.rank2_mix,
            sine_mix: self.params.sine_mix,
            freq_ratio: octave_ratio * bend_ratio * modulation.pitch_ratio,
            filter_mode: self.params.filter_mode,
            cutoff: self.params.cutoff.current() * modulation.cutoff_ratio,
            resonance: self.params.resonance.current(),
            hpf_cutoff: self.params.hpf_cutoff,
            adsr: crate::dsp::envelope::AdsrParams {
                attack: self.params.attack,
                decay: self.params.decay,
                sustain: self.params.sustain,
                release: self.params.release,
                intensity: self.params.intensity.current(),
            },
            amp_mod: modulation.amplitude,
        };

        let bus_left = &mut self.bus_left[..frames];
        let bus_right = &mut self.bus_right[..frames];
        bus_left.fill(0.0);
        bus_right.fill(0.0);

        let mono = &mut self.scratch[..frames];
        let mut active = 0usize;
        for voice in &mut self.voices {
            if !voice.is_playing() {
                continue;
            }
            voice.render(mono, &config);
            sanitize(mono);
            let (gain_left, gain_right) = voice.pan_gains();
            for i in 0..frames {
                bus_left[i] += mono[i] * gain_left;
                bus_right[i] += mono[i] * gain_right;
            }
            if voice.is_playing() {
                active += 1;
            }
        }

        // Effects run even at zero mix so their delay lines keep draining;
        // a frozen line would replay a stale tail when the mix comes back up
        self.chorus.set_rate(self.params.chorus_rate);
        self.chorus.set_depth(self.params.chorus_depth);
        self.chorus.set_mix(self.params.chorus_mix);
        self.chorus.render(bus_left, bus_right);
        self.delay.set_time(self.params.delay_time);
        self.delay.set_feedback(self.params.delay_feedback);
        self.delay.set_mix(self.params.delay_mix);
        self.delay.render(bus_left, bus_right);

        // Polyphony normalization glides per sample so voice count changes
        // never step the level
        let target_gain = 1.0 / (active.max(1) as f32).sqrt();
        let gain_step = (target_gain - self.voice_gain) / frames as f32;
        let drive = self.params.waveform.drive_compensation();
        let amp = self.params.amp_level.current();
        let volume = self.params.volume.current();

        let mut gate = self.gate;
        let mut gate_gain = self.gate_gain;
        let mut switch_gain = self.switch_gain;
        let mut voice_gain = self.voice_gain;
        for i in 0..frames {
            voice_gain += gain_step;
            let pre = voice_gain * drive * amp;
            let fade = fade_sample(&mut gate, &mut gate_gain, &mut switch_gain, self.fade_step);
            let left = saturate(bus_left[i] * pre) * volume * fade;
            let right = saturate(bus_right[i] * pre) * volume * fade;
            out[2 * i] = left.clamp(-1.0, 1.0);
            out[2 * i + 1] = right.clamp(-1.0, 1.0);
        }
        self.gate = gate;
        self.gate_gain = gate_gain;
        self.switch_gain = switch_gain;
        self.voice_gain = target_gain;
    }

    fn drain_events(&mut self) {
        if self.gate == GateState::Closing {
            if self.gate_gain > GATE_EPSILON {
                // Still audible: hold everything until the fade lands
                while let Some(event) = self.rx.pop() {
                    self.deferred.push_back(event);
                }
                return;
            }
            self.gate = GateState::Opening;
        }

        // While the gate holds the output silent, parameter bundles land
        // with their smoothing snapped so nothing glides on re-entry
        let settle_params = self.gate == GateState::Opening;

        let mut queue = std::mem::take(&mut self.deferred);
        while let Some(event) = self.rx.pop() {
            queue.push_back(event);
        }

        let mut note_budget = NOTE_EVENTS_PER_BUFFER;
        while let Some(event) = queue.pop_front() {
            match event {
                EngineEvent::NoteOn { note, velocity } => {
                    if note_budget == 0 {
                        self.deferred.push_back(EngineEvent::NoteOn { note, velocity });
                        continue;
                    }
                    note_budget -= 1;
                    self.note_on(note, velocity);
                }
                EngineEvent::NoteOff { note, velocity } => {
                    if note_budget == 0 {
                        self.deferred.push_back(EngineEvent::NoteOff { note, velocity });
                        continue;
                    }
                    note_budget -= 1;
                    self.note_off(note, velocity);
                }
                EngineEvent::Parameters(map) => {
                    let changes = self.params.apply(&map);
                    if settle_params {
                        self.params.settle();
                    }
                    if changes.filter_mode {
                        for voice in &mut self.voices {
                            voice.reset_filters();
                        }
                        self.switch_gain = 0.0;
                    }
                    if changes.arp_layout {
                        self.apply_arp_layout();
                    }
                }
                EngineEvent::PitchBend { semitones } => {
                    self.params
                        .pitch_bend
                        .set_target(semitones.clamp(-2.0, 2.0));
                }
                EngineEvent::AllNotesOff => self.all_notes_off(),
                EngineEvent::MuteGate => {
                    self.gate = GateState::Closing;
                    // Everything behind the gate waits under silence
                    self.deferred.append(&mut queue);
                    return;
                }
            }
        }
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        // sqrt bias keeps the mid-velocity range expressive
        let velocity = (f32::from(velocity.min(127)) / 127.0).sqrt();
        self.arp_velocity = velocity;
        if !self.held_notes.contains(&note) {
            self.held_notes.push(note);
        }
        if self.params.arp_enabled {
            self.arp.rebuild(&self.held_notes, self.params.arp_octaves);
        } else {
            self.trigger_note(note, velocity);
        }
    }

    fn note_off(&mut self, note: u8, velocity: u8) {
        let release_velocity = f32::from(velocity.min(127)) / 127.0;
        self.held_notes.retain(|&n| n != note);
        if self.params.arp_enabled {
            if self.held_notes.is_empty() {
                let mut steps = std::mem::take(&mut self.arp_steps);
                steps.clear();
                self.arp.stop(&mut steps);
                for step in &steps {
                    if let ArpStep::Release(n) = *step {
                        self.release_note(n, release_velocity);
                    }
                }
                self.arp_steps = steps;
            } else {
                self.arp.rebuild(&self.held_notes, self.params.arp_octaves);
            }
        } else {
            self.release_note(note, release_velocity);
        }
    }

    fn trigger_note(&mut self, note: u8, velocity: f32) {
        let index = self.allocate_voice(note);
        self.voices[index].trigger(note, velocity, midi_to_freq(note), self.sample_rate);
    }

    fn release_note(&mut self, note: u8, release_velocity: f32) {
        // A gate release from the arp leaves the key itself down, which
        // keeps the voice lower-priority for stealing
        let still_held = self.held_notes.contains(&note);
        for voice in &mut self.voices {
            if voice.note() == note && voice.state() == VoiceState::Sounding {
                voice.release(release_velocity);
                voice.set_held(still_held);
            }
        }
    }

    /// Same note retriggers in place; then any free voice; otherwise steal
    /// by priority (a releasing voice whose key is already up first, then
    /// any releasing voice), breaking ties by the longest time spent in
    /// the voice's current phase.
    fn allocate_voice(&self, note: u8) -> usize {
        if let Some(index) = self
            .voices
            .iter()
            .position(|v| v.is_playing() && v.note() == note)
        {
            return index;
        }
        if let Some(index) = self.voices.iter().position(Voice::is_available) {
            return index;
        }
        let mut best = 0;
        let mut best_key = (0u8, 0u64);
        for (index, voice) in self.voices.iter().enumerate() {
            let priority = if voice.is_releasing() && !voice.is_held() {
                2
            } else if voice.is_releasing() {
                1
            } else {
                0
            };
            let key = (priority, voice.age());
            if index == 0 || key > best_key {
                best = index;
                best_key = key;
            }
        }
        best
    }

    /// Arp enable/disable or octave-range change.
    fn apply_arp_layout(&mut self) {
        if self.params.arp_enabled {
            // Hand held notes to the arp clock
            for voice in &mut self.voices {
                if voice.state() == VoiceState::Sounding {
                    voice.release(1.0);
                }
            }
            self.arp.rebuild(&self.held_notes, self.params.arp_octaves);
        } else {
            let mut steps = std::mem::take(&mut self.arp_steps);
            steps.clear();
            self.arp.stop(&mut steps);
            for step in &steps {
                if let ArpStep::Release(note) = *step {
                    self.release_note(note, 1.0);
                }
            }
            self.arp_steps = steps;
        }
    }

    /// Hard panic stop: silence every voice, clear the hold list and the
    /// arp, flush effect tails, and drop queued note events.
    fn all_notes_off(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
        self.held_notes.clear();
        let mut steps = std::mem::take(&mut self.arp_steps);
        self.arp.stop(&mut steps);
        steps.clear();
        self.arp_steps = steps;
        self.chorus.reset();
        self.delay.reset();
        self.deferred.retain(|event| {
            !matches!(
                event,
                EngineEvent::NoteOn { .. } | EngineEvent::NoteOff { .. }
            )
        });
    }
}
