#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::dsp::{
    filter::FilterMode,
    lfo::{LfoShape, LfoTarget},
    oscillator::Waveform,
};
use crate::synth::arpeggiator::ArpMode;

/*
Engine Parameters
=================

Every control value carries a stable string key so presets persist as a
flat key -> value map and the control surface never needs engine
internals. Unknown keys are ignored on apply, which keeps old and new
preset files interchangeable.

Parameters that can cause an audible step (amplitude, volume, cutoff,
resonance, intensity, pitch bend) live in (target, current) smoothing
pairs: the control write lands on `target`, and `current` glides toward
it once per render buffer by exponential smoothing. Everything else
applies directly; bundles of direct parameters that change together ride
behind a mute gate (see the engine) instead.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f32),
    Flag(bool),
    Choice(String),
}

impl ParamValue {
    pub fn number(&self) -> Option<f32> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn flag(&self) -> Option<bool> {
        match self {
            Self::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn choice(&self) -> Option<&str> {
        match self {
            Self::Choice(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Flag(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Choice(v.to_owned())
    }
}

pub type ParamMap = HashMap<String, ParamValue>;

/// A (target, current) pair advanced once per render buffer.
#[derive(Debug, Clone, Copy)]
pub struct Smoothed {
    target: f32,
    current: f32,
}

/// Per-buffer smoothing coefficient; higher = slower glide.
const SMOOTHING: f32 = 0.85;
const SNAP_EPSILON: f32 = 1e-4;

impl Smoothed {
    pub fn new(value: f32) -> Self {
        Self {
            target: value,
            current: value,
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump both halves, bypassing the glide (used under the mute gate).
    pub fn snap(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// One geometric step toward the target.
    pub fn advance(&mut self) {
        if (self.target - self.current).abs() < SNAP_EPSILON * self.target.abs().max(1.0) {
            self.current = self.target;
        } else {
            self.current = self.current * SMOOTHING + self.target * (1.0 - SMOOTHING);
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}

/// Side effects an `apply` can request from the engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParamChanges {
    /// Filter topology changed: zero all voice filter state and arm the
    /// anti-click fade.
    pub filter_mode: bool,
    /// Arpeggiator layout input changed: rebuild the playback sequence.
    pub arp_layout: bool,
}

#[derive(Debug, Clone)]
pub struct Params {
    // Oscillator section
    pub waveform: Waveform,
    pub octave: i32,
    pub rank2_enabled: bool,
    pub rank2_waveform: Waveform,
    /// Cents offset of the second rank.
    pub rank2_detune: f32,
    pub rank2_mix: f32,
    /// Pure-sine reinforcement rank level.
    pub sine_mix: f32,

    // Envelope
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub intensity: Smoothed,

    // Filter
    pub filter_mode: FilterMode,
    pub cutoff: Smoothed,
    pub resonance: Smoothed,
    pub hpf_cutoff: f32,

    // Amp
    pub amp_level: Smoothed,
    pub volume: Smoothed,

    // Modulation
    pub lfo_freq: f32,
    pub lfo_shape: LfoShape,
    pub lfo_target: LfoTarget,
    pub lfo_depth: f32,
    pub pitch_bend: Smoothed,

    // Arpeggiator
    pub arp_enabled: bool,
    pub arp_mode: ArpMode,
    pub arp_tempo: f32,
    pub arp_gate: f32,
    pub arp_octaves: u8,

    // Effects
    pub delay_mix: f32,
    pub delay_time: f32,
    pub delay_feedback: f32,
    pub chorus_mix: f32,
    pub chorus_rate: f32,
    pub chorus_depth: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            octave: 0,
            rank2_enabled: false,
            rank2_waveform: Waveform::Sawtooth,
            rank2_detune: 5.0,
            rank2_mix: 0.5,
            sine_mix: 0.0,

            attack: 0.01,
            decay: 0.2,
            sustain: 0.7,
            release: 0.1,
            intensity: Smoothed::new(0.8),

            filter_mode: FilterMode::Ladder,
            cutoff: Smoothed::new(2000.0),
            resonance: Smoothed::new(0.3),
            hpf_cutoff: 20.0,

            amp_level: Smoothed::new(0.75),
            volume: Smoothed::new(1.0),

            lfo_freq: 1.0,
            lfo_shape: LfoShape::Sine,
            lfo_target: LfoTarget::Pitch,
            lfo_depth: 0.0,
            pitch_bend: Smoothed::new(0.0),

            arp_enabled: false,
            arp_mode: ArpMode::Up,
            arp_tempo: 120.0,
            arp_gate: 0.8,
            arp_octaves: 1,

            delay_mix: 0.0,
            delay_time: 0.35,
            delay_feedback: 0.3,
            chorus_mix: 0.0,
            chorus_rate: 0.8,
            chorus_depth: 0.5,
        }
    }
}

impl Params {
    /// Apply a flat key -> value map. Unknown or mistyped entries are
    /// silently skipped.
    pub fn apply(&mut self, map: &ParamMap) -> ParamChanges {
        let mut changes = ParamChanges::default();
        for (key, value) in map {
            self.apply_one(key, value, &mut changes);
        }
        changes
    }

    fn apply_one(&mut self, key: &str, value: &ParamValue, changes: &mut ParamChanges) {
        match key {
            "waveform" => {
                if let Some(w) = value.choice().and_then(Waveform::from_name) {
                    self.waveform = w;
                }
            }
            "octave" => {
                if let Some(v) = value.number() {
                    self.octave = (v as i32).clamp(-2, 2);
                }
            }
            "rank2_enabled" => {
                if let Some(v) = value.flag() {
                    self.rank2_enabled = v;
                }
            }
            "rank2_waveform" => {
                if let Some(w) = value.choice().and_then(Waveform::from_name) {
                    self.rank2_waveform = w;
                }
            }
            "rank2_detune" => {
                if let Some(v) = value.number() {
                    self.rank2_detune = v.clamp(-100.0, 100.0);
                }
            }
            "rank2_mix" => {
                if let Some(v) = value.number() {
                    self.rank2_mix = v.clamp(0.0, 1.0);
                }
            }
            "sine_mix" => {
                if let Some(v) = value.number() {
                    self.sine_mix = v.clamp(0.0, 1.0);
                }
            }
            "attack" => {
                if let Some(v) = value.number() {
                    self.attack = v.clamp(0.001, 5.0);
                }
            }
            "decay" => {
                if let Some(v) = value.number() {
                    self.decay = v.clamp(0.001, 5.0);
                }
            }
            "sustain" => {
                if let Some(v) = value.number() {
                    self.sustain = v.clamp(0.0, 1.0);
                }
            }
            "release" => {
                if let Some(v) = value.number() {
                    self.release = v.clamp(0.001, 5.0);
                }
            }
            "intensity" => {
                if let Some(v) = value.number() {
                    self.intensity.set_target(v.clamp(0.0, 1.0));
                }
            }
            "filter_mode" => {
                if let Some(mode) = value.choice().and_then(FilterMode::from_name) {
                    if mode != self.filter_mode {
                        self.filter_mode = mode;
                        changes.filter_mode = true;
                    }
                }
            }
            "cutoff" => {
                if let Some(v) = value.number() {
                    self.cutoff.set_target(v.clamp(20.0, 20_000.0));
                }
            }
            "resonance" => {
                if let Some(v) = value.number() {
                    self.resonance.set_target(v.clamp(0.0, 0.9));
                }
            }
            "hpf_cutoff" => {
                if let Some(v) = value.number() {
                    self.hpf_cutoff = v.clamp(5.0, 400.0);
                }
            }
            "amp_level" => {
                if let Some(v) = value.number() {
                    self.amp_level.set_target(v.clamp(0.0, 1.0));
                }
            }
            "volume" => {
                if let Some(v) = value.number() {
                    self.volume.set_target(v.clamp(0.0, 1.0));
                }
            }
            "pitch_bend" => {
                if let Some(v) = value.number() {
                    self.pitch_bend.set_target(v.clamp(-2.0, 2.0));
                }
            }
            "lfo_freq" => {
                if let Some(v) = value.number() {
                    self.lfo_freq = v.clamp(0.01, 20.0);
                }
            }
            "lfo_shape" => {
                if let Some(s) = value.choice().and_then(LfoShape::from_name) {
                    self.lfo_shape = s;
                }
            }
            "lfo_target" => {
                if let Some(t) = value.choice().and_then(LfoTarget::from_name) {
                    self.lfo_target = t;
                }
            }
            "lfo_depth" => {
                if let Some(v) = value.number() {
                    self.lfo_depth = v.clamp(0.0, 1.0);
                }
            }
            "arp_enabled" => {
                if let Some(v) = value.flag() {
                    if v != self.arp_enabled {
                        self.arp_enabled = v;
                        changes.arp_layout = true;
                    }
                }
            }
            "arp_mode" => {
                if let Some(m) = value.choice().and_then(ArpMode::from_name) {
                    self.arp_mode = m;
                }
            }
            "arp_tempo" => {
                if let Some(v) = value.number() {
                    self.arp_tempo = v.clamp(20.0, 300.0);
                }
            }
            "arp_gate" => {
                if let Some(v) = value.number() {
                    self.arp_gate = v.clamp(0.05, 1.0);
                }
            }
            "arp_octaves" => {
                if let Some(v) = value.number() {
                    let octaves = (v as u8).clamp(1, 4);
                    if octaves != self.arp_octaves {
                        self.arp_octaves = octaves;
                        changes.arp_layout = true;
                    }
                }
            }
            "delay_mix" => {
                if let Some(v) = value.number() {
                    self.delay_mix = v.clamp(0.0, 1.0);
                }
            }
            "delay_time" => {
                if let Some(v) = value.number() {
                    self.delay_time = v.clamp(0.01, 2.5);
                }
            }
            "delay_feedback" => {
                if let Some(v) = value.number() {
                    self.delay_feedback = v.clamp(0.0, 0.9);
                }
            }
            "chorus_mix" => {
                if let Some(v) = value.number() {
                    self.chorus_mix = v.clamp(0.0, 1.0);
                }
            }
            "chorus_rate" => {
                if let Some(v) = value.number() {
                    self.chorus_rate = v.clamp(0.05, 10.0);
                }
            }
            "chorus_depth" => {
                if let Some(v) = value.number() {
                    self.chorus_depth = v.clamp(0.0, 1.0);
                }
            }
            // Unknown keys: forward-compatible no-op
            _ => {}
        }
    }

    /// Flat snapshot of every parameter, suitable for external persistence.
    /// Smoothed parameters report their targets.
    pub fn extract(&self) -> ParamMap {
        let mut map = ParamMap::new();
        let mut put = |key: &str, value: ParamValue| {
            map.insert(key.to_owned(), value);
        };

        put("waveform", self.waveform.name().into());
        put("octave", (self.octave as f32).into());
        put("rank2_enabled", self.rank2_enabled.into());
        put("rank2_waveform", self.rank2_waveform.name().into());
        put("rank2_detune", self.rank2_detune.into());
        put("rank2_mix", self.rank2_mix.into());
        put("sine_mix", self.sine_mix.into());
        put("attack", self.attack.into());
        put("decay", self.decay.into());
        put("sustain", self.sustain.into());
        put("release", self.release.into());
        put("intensity", self.intensity.target().into());
        put("filter_mode", self.filter_mode.name().into());
        put("cutoff", self.cutoff.target().into());
        put("resonance", self.resonance.target().into());
        put("hpf_cutoff", self.hpf_cutoff.into());
        put("amp_level", self.amp_level.target().into());
        put("volume", self.volume.target().into());
        put("pitch_bend", self.pitch_bend.target().into());
        put("lfo_freq", self.lfo_freq.into());
        put("lfo_shape", self.lfo_shape.name().into());
        put("lfo_target", self.lfo_target.name().into());
        put("lfo_depth", self.lfo_depth.into());
        put("arp_enabled", self.arp_enabled.into());
        put("arp_mode", self.arp_mode.name().into());
        put("arp_tempo", self.arp_tempo.into());
        put("arp_gate", self.arp_gate.into());
        put("arp_octaves", (self.arp_octaves as f32).into());
        put("delay_mix", self.delay_mix.into());
        put("delay_time", self.delay_time.into());
        put("delay_feedback", self.delay_feedback.into());
        put("chorus_mix", self.chorus_mix.into());
        put("chorus_rate", self.chorus_rate.into());
        put("chorus_depth", self.chorus_depth.into());
        map
    }

    /// Advance every smoothing pair by one buffer step.
    pub fn advance_smoothing(&mut self) {
        self.intensity.advance();
        self.cutoff.advance();
        self.resonance.advance();
        self.amp_level.advance();
        self.volume.advance();
        self.pitch_bend.advance();
    }

    /// Land every smoothing pair on its target at once. Called while the
    /// mute gate holds the output silent, where a glide would be wasted.
    pub fn settle(&mut self) {
        for pair in [
            &mut self.intensity,
            &mut self.cutoff,
            &mut self.resonance,
            &mut self.amp_level,
            &mut self.volume,
            &mut self.pitch_bend,
        ] {
            let target = pair.target();
            pair.snap(target);
        }
    }
}
