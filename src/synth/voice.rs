use crate::dsp::dc_blocker::DcBlocker;
use crate::dsp::envelope::{AdsrParams, Envelope};
use crate::dsp::filter::{FilterMode, LadderFilter, RumbleFilter, SvFilter};
use crate::dsp::oscillator::{Oscillator, Waveform};

/*
Voice
=====

One voice renders one note through the chain

    oscillators -> per-rank filter -> rumble HPF -> envelope -> DC blocker

Three oscillators run per voice: the primary rank, a detunable second
rank, and a pure sine reinforcement rank. The two main ranks are
filtered separately so the detuned pair keeps its width at high
resonance, then mixed. Oscillator phases are never reset when the voice
is reused: the new note continues from wherever the phase happens to
be, which avoids a click-correlated transient across retriggers.

Filter and blocker state DOES reset when the voice goes idle or is
stolen; that state is note-local.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    #[default]
    Idle,
    Sounding,
    Releasing,
}

/// Per-block render settings, resolved once by the engine from the
/// parameter set, the LFO, and pitch bend.
#[derive(Debug, Clone, Copy)]
pub struct VoiceRenderConfig {
    pub sample_rate: f32,
    pub waveform: Waveform,
    pub rank2_enabled: bool,
    pub rank2_waveform: Waveform,
    /// Frequency multiplier for the second rank (detune in cents applied).
    pub rank2_ratio: f32,
    pub rank2_mix: f32,
    pub sine_mix: f32,
    /// Octave shift, pitch bend, and LFO pitch modulation combined.
    pub freq_ratio: f32,
    pub filter_mode: FilterMode,
    pub cutoff: f32,
    pub resonance: f32,
    pub hpf_cutoff: f32,
    pub adsr: AdsrParams,
    /// LFO amplitude modulation, 1.0 when untargeted.
    pub amp_mod: f32,
}

#[derive(Debug)]
pub struct Voice {
    state: VoiceState,
    note: u8,
    velocity: f32,
    frequency: f32,
    /// True while the key (or arp gate) is physically down.
    held: bool,
    /// Samples since the voice entered its current phase, for steal ordering.
    age: u64,

    primary: Oscillator,
    secondary: Oscillator,
    sub: Oscillator,
    ladder: [LadderFilter; 2],
    svf: [SvFilter; 2],
    rumble: RumbleFilter,
    envelope: Envelope,
    blocker: DcBlocker,

    pan_left: f32,
    pan_right: f32,
}

impl Voice {
    /// `pan` in [-1, 1]; converted to equal-power coefficients once.
    pub fn new(pan: f32) -> Self {
        let angle = (pan.clamp(-1.0, 1.0) + 1.0) * std::f32::consts::FRAC_PI_4;
        Self {
            state: VoiceState::Idle,
            note: 0,
            velocity: 0.0,
            frequency: 0.0,
            held: false,
            age: 0,
            primary: Oscillator::new(),
            secondary: Oscillator::new(),
            sub: Oscillator::new(),
            ladder: [LadderFilter::new(), LadderFilter::new()],
            svf: [SvFilter::new(), SvFilter::new()],
            rumble: RumbleFilter::new(),
            envelope: Envelope::new(),
            blocker: DcBlocker::new(),
            pan_left: angle.cos(),
            pan_right: angle.sin(),
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn is_available(&self) -> bool {
        self.state == VoiceState::Idle
    }

    pub fn is_playing(&self) -> bool {
        self.state != VoiceState::Idle
    }

    pub fn is_releasing(&self) -> bool {
        self.state == VoiceState::Releasing
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Samples elapsed in the current phase. Resets on trigger and again
    /// on release, so steal ordering compares like phases fairly.
    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn pan_gains(&self) -> (f32, f32) {
        (self.pan_left, self.pan_right)
    }

    /// Start (or steal into) a note. Velocity arrives already mapped
    /// through the perceptual curve. Note-local filter state resets;
    /// oscillator phases deliberately do not.
    pub fn trigger(&mut self, note: u8, velocity: f32, frequency: f32, sample_rate: f32) {
        let stolen = self.state != VoiceState::Idle;
        self.note = note;
        self.velocity = velocity;
        self.frequency = frequency;
        self.held = true;
        self.age = 0;
        if stolen {
            self.reset_filters();
        }
        self.envelope.trigger(velocity, frequency, sample_rate);
        self.state = VoiceState::Sounding;
    }

    /// Begin the release stage. `release_velocity` in [0, 1] stretches
    /// the tail for gentle key lifts.
    pub fn release(&mut self, release_velocity: f32) {
        if self.state == VoiceState::Sounding {
            self.envelope.release(release_velocity);
            self.state = VoiceState::Releasing;
            self.age = 0;
        }
        self.held = false;
    }

    /// Mark the key as lifted without entering release yet (arp ownership).
    pub fn set_held(&mut self, held: bool) {
        self.held = held;
    }

    /// Hard stop: silence immediately, clearing all note-local state.
    pub fn reset(&mut self) {
        self.state = VoiceState::Idle;
        self.held = false;
        self.envelope.reset();
        self.reset_filters();
    }

    /// Zero filter and blocker state without touching the envelope.
    /// Used when the filter topology switches mid-note.
    pub fn reset_filters(&mut self) {
        for f in &mut self.ladder {
            f.reset();
        }
        for f in &mut self.svf {
            f.reset();
        }
        self.rumble.reset();
        self.blocker.reset();
    }

    /// Render one mono block into `out`. Returns false once the release
    /// tail has fully decayed (the engine then retires the voice).
    pub fn render(&mut self, out: &mut [f32], config: &VoiceRenderConfig) -> bool {
        if self.state == VoiceState::Idle {
            out.fill(0.0);
            return false;
        }

        let base_freq = self.frequency * config.freq_ratio;
        let cutoff = crate::dsp::filter::effective_cutoff(config.cutoff, base_freq, self.velocity);

        // Per-block filter coefficients; cutoff moves slowly enough that
        // per-sample recomputation buys nothing
        let (g0, g1, k, damp, comp) = match config.filter_mode {
            FilterMode::Ladder => {
                let g = LadderFilter::coefficient(cutoff, config.sample_rate);
                let k = LadderFilter::feedback(config.resonance);
                let comp = self.ladder[0].gain_compensation(g);
                (g, g, k, 0.0, comp)
            }
            FilterMode::StateVariable => {
                let f = SvFilter::coefficient(cutoff, config.sample_rate);
                let damp = SvFilter::damping(config.resonance);
                let comp = self.svf[0].gain_compensation(f);
                (f, f, 0.0, damp, comp)
            }
        };
        let hpf_a = RumbleFilter::coefficient(config.hpf_cutoff, config.sample_rate);
        let dc_pole = DcBlocker::pole_for(base_freq);

        let rank2_freq = base_freq * config.rank2_ratio;
        let sub_freq = base_freq * 0.5;

        for sample in out.iter_mut() {
            let raw0 = self
                .primary
                .next_sample(config.waveform, base_freq, config.sample_rate);
            let filtered0 = match config.filter_mode {
                FilterMode::Ladder => self.ladder[0].next_sample(raw0, g0, k),
                FilterMode::StateVariable => self.svf[0].next_sample(raw0, g0, damp),
            };

            let mut mixed = filtered0;
            if config.rank2_enabled {
                let raw1 =
                    self.secondary
                        .next_sample(config.rank2_waveform, rank2_freq, config.sample_rate);
                let filtered1 = match config.filter_mode {
                    FilterMode::Ladder => self.ladder[1].next_sample(raw1, g1, k),
                    FilterMode::StateVariable => self.svf[1].next_sample(raw1, g1, damp),
                };
                mixed = filtered0 * (1.0 - config.rank2_mix) + filtered1 * config.rank2_mix;
            }
            if config.sine_mix > 0.0 {
                let sub = self
                    .sub
                    .next_sample(Waveform::Sine, sub_freq, config.sample_rate);
                mixed += sub * config.sine_mix;
            }
            mixed *= comp;

            let high_passed = self.rumble.next_sample(mixed, hpf_a);

            // Velocity already scales the envelope peak; no second multiply here
            let env = self.envelope.next_sample(&config.adsr, config.sample_rate);
            let shaped = high_passed * env * config.amp_mod;

            *sample = self.blocker.next_sample(shaped, dc_pole);
        }
        self.age += out.len() as u64;

        if self.state == VoiceState::Releasing && !self.envelope.is_active() {
            self.reset();
            return false;
        }
        // A held voice stays alive even through a zero-sustain lull
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::midi_to_freq;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn config() -> VoiceRenderConfig {
        VoiceRenderConfig {
            sample_rate: SAMPLE_RATE,
            waveform: Waveform::Sine,
            rank2_enabled: false,
            rank2_waveform: Waveform::Sawtooth,
            rank2_ratio: 1.0,
            rank2_mix: 0.5,
            sine_mix: 0.0,
            freq_ratio: 1.0,
            filter_mode: FilterMode::Ladder,
            cutoff: 2000.0,
            resonance: 0.3,
            hpf_cutoff: 20.0,
            adsr: AdsrParams::default(),
            amp_mod: 1.0,
        }
    }

    fn trigger_voice(voice: &mut Voice, note: u8) {
        voice.trigger(note, 0.8, midi_to_freq(note), SAMPLE_RATE);
    }

    #[test]
    fn idle_voice_renders_silence() {
        let mut voice = Voice::new(0.0);
        let mut buf = [1.0_f32; 64];
        assert!(!voice.render(&mut buf, &config()));
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn triggered_voice_produces_sound() {
        let mut voice = Voice::new(0.0);
        trigger_voice(&mut voice, 69);
        let mut buf = [0.0_f32; 2048];
        assert!(voice.render(&mut buf, &config()));
        let peak = buf.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
        assert!(peak > 0.01, "peak was {peak}");
    }

    #[test]
    fn release_decays_to_idle() {
        let mut voice = Voice::new(0.0);
        trigger_voice(&mut voice, 60);
        let cfg = config();
        let mut buf = [0.0_f32; 512];
        for _ in 0..10 {
            voice.render(&mut buf, &cfg);
        }
        voice.release(1.0);
        assert_eq!(voice.state(), VoiceState::Releasing);
        // 0.1 s release; two seconds is far past the silence floor
        for _ in 0..200 {
            if !voice.render(&mut buf, &cfg) {
                break;
            }
        }
        assert_eq!(voice.state(), VoiceState::Idle);
    }

    #[test]
    fn retrigger_preserves_oscillator_phase() {
        let cfg = config();
        let mut buf = [0.0_f32; 333];

        // Continuous voice as the phase reference
        let mut reference = Voice::new(0.0);
        trigger_voice(&mut reference, 69);
        reference.render(&mut buf, &cfg);
        trigger_voice(&mut reference, 69);

        let mut retriggered = Voice::new(0.0);
        trigger_voice(&mut retriggered, 69);
        retriggered.render(&mut buf, &cfg);
        retriggered.release(1.0);
        trigger_voice(&mut retriggered, 69);

        // Both ran the oscillator the same number of samples; retrigger
        // (even via steal or release) must not have snapped the phase back
        let mut a = [0.0_f32; 64];
        let mut b = [0.0_f32; 64];
        reference.render(&mut a, &cfg);
        retriggered.render(&mut b, &cfg);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-4);
        }
    }

    #[test]
    fn output_stays_bounded_at_high_resonance() {
        let mut voice = Voice::new(0.0);
        trigger_voice(&mut voice, 36);
        let mut cfg = config();
        cfg.resonance = 0.9;
        cfg.cutoff = 150.0;
        cfg.waveform = Waveform::Sawtooth;
        let mut buf = [0.0_f32; 512];
        for _ in 0..40 {
            voice.render(&mut buf, &cfg);
            for &s in &buf {
                assert!(s.is_finite());
                assert!(s.abs() < 8.0, "sample {s} out of range");
            }
        }
    }

    #[test]
    fn pan_gains_are_equal_power() {
        for pan in [-1.0, -0.5, 0.0, 0.5, 1.0] {
            let voice = Voice::new(pan);
            let (l, r) = voice.pan_gains();
            assert!((l * l + r * r - 1.0).abs() < 1e-5);
        }
        let (l, r) = Voice::new(0.0).pan_gains();
        assert!((l - r).abs() < 1e-6);
    }

    #[test]
    fn age_tracks_rendered_samples() {
        let mut voice = Voice::new(0.0);
        trigger_voice(&mut voice, 60);
        let mut buf = [0.0_f32; 128];
        voice.render(&mut buf, &config());
        voice.render(&mut buf, &config());
        assert_eq!(voice.age(), 256);
        trigger_voice(&mut voice, 62);
        assert_eq!(voice.age(), 0);
    }

    #[test]
    fn age_restarts_when_the_release_begins() {
        let mut voice = Voice::new(0.0);
        trigger_voice(&mut voice, 60);
        let mut buf = [0.0_f32; 128];
        voice.render(&mut buf, &config());
        voice.release(1.0);
        assert_eq!(voice.age(), 0);
        voice.render(&mut buf, &config());
        assert_eq!(voice.age(), 128);
    }
}
