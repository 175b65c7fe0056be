//! End-to-end engine tests driven through the public event API.

use acorde_synth::synth::params::{ParamMap, ParamValue};
use acorde_synth::{EngineEvent, SynthEngine, NUM_VOICES};

const SAMPLE_RATE: f32 = 48_000.0;

fn render(engine: &mut SynthEngine, frames: usize) -> Vec<f32> {
    let mut out = vec![0.0_f32; frames * 2];
    engine.render(&mut out);
    out
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |m, &s| m.max(s.abs()))
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

fn note_on(engine: &mut SynthEngine, note: u8, velocity: u8) {
    engine.enqueue(EngineEvent::NoteOn { note, velocity });
}

fn note_off(engine: &mut SynthEngine, note: u8) {
    engine.enqueue(EngineEvent::NoteOff { note, velocity: 64 });
}

fn set_params(engine: &mut SynthEngine, entries: &[(&str, ParamValue)]) {
    let mut map = ParamMap::new();
    for (key, value) in entries {
        map.insert((*key).to_owned(), value.clone());
    }
    engine.enqueue(EngineEvent::Parameters(map));
}

#[test]
fn attack_amplitude_rises_monotonically() {
    let mut engine = SynthEngine::offline(SAMPLE_RATE);
    set_params(&mut engine, &[("attack", ParamValue::Number(0.2))]);
    render(&mut engine, 64);
    note_on(&mut engine, 60, 100);
    render(&mut engine, 16);
    // First note lands on the first voice of an empty pool
    assert_eq!(engine.voices()[0].note(), 60);

    // Compare per-buffer RMS across the attack; each window should be
    // louder than the last
    let mut previous = 0.0;
    for _ in 0..8 {
        let out = render(&mut engine, 1024);
        let level = rms(&out);
        assert!(
            level > previous,
            "attack level fell: {level} after {previous}"
        );
        previous = level;
    }
}

#[test]
fn nine_notes_share_an_eight_voice_pool() {
    let mut engine = SynthEngine::offline(SAMPLE_RATE);
    for note in [60, 62, 64, 65, 67, 69, 71, 72] {
        note_on(&mut engine, note, 100);
        render(&mut engine, 128);
    }
    assert_eq!(engine.active_voice_count(), NUM_VOICES);

    note_on(&mut engine, 74, 100);
    render(&mut engine, 128);
    assert_eq!(engine.active_voice_count(), NUM_VOICES);
    // The newest note always wins a voice
    assert!(engine.voices().iter().any(|v| v.note() == 74));
    // But only one earlier note lost its seat
    let survivors = [62, 64, 65, 67, 69, 71, 72]
        .iter()
        .filter(|&&n| engine.voices().iter().any(|v| v.note() == n))
        .count();
    assert_eq!(survivors, 7);
}

#[test]
fn voice_assignment_is_reproducible() {
    let script = |engine: &mut SynthEngine| {
        for note in [60, 62, 64, 65, 67, 69, 71, 72] {
            note_on(engine, note, 100);
            render(engine, 256);
        }
        note_off(engine, 64);
        note_off(engine, 69);
        render(engine, 256);
        note_on(engine, 74, 100);
        note_on(engine, 76, 100);
        render(engine, 256);
        engine
            .voices()
            .iter()
            .map(|v| (v.note(), v.state()))
            .collect::<Vec<_>>()
    };
    let first = script(&mut SynthEngine::offline(SAMPLE_RATE));
    let second = script(&mut SynthEngine::offline(SAMPLE_RATE));
    assert_eq!(first, second);
}

#[test]
fn release_tail_then_true_silence() {
    let mut engine = SynthEngine::offline(SAMPLE_RATE);
    note_on(&mut engine, 57, 110);
    render(&mut engine, 8192);
    note_off(&mut engine, 57);

    // Tail still audible right after note-off
    let tail = render(&mut engine, 1024);
    assert!(peak(&tail) > 0.0);

    // Default release is 0.1 s; half a second later the voice must be
    // retired and the output exactly zero
    render(&mut engine, 24_000);
    assert_eq!(engine.active_voice_count(), 0);
    let silent = render(&mut engine, 1024);
    assert_eq!(peak(&silent), 0.0);
}

#[test]
fn output_bounded_under_full_polyphony_and_drive() {
    let mut engine = SynthEngine::offline(SAMPLE_RATE);
    set_params(
        &mut engine,
        &[
            ("waveform", ParamValue::Choice("sawtooth".into())),
            ("amp_level", ParamValue::Number(1.0)),
            ("volume", ParamValue::Number(1.0)),
            ("resonance", ParamValue::Number(0.9)),
            ("cutoff", ParamValue::Number(12_000.0)),
            ("chorus_mix", ParamValue::Number(0.5)),
            ("delay_mix", ParamValue::Number(0.4)),
            ("delay_feedback", ParamValue::Number(0.9)),
        ],
    );
    for note in [24, 26, 28, 29, 31, 33, 35, 36] {
        note_on(&mut engine, note, 127);
        render(&mut engine, 64);
    }
    for _ in 0..50 {
        let out = render(&mut engine, 2048);
        assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
    }
}

#[test]
fn all_notes_off_cuts_tails_and_pending_notes() {
    let mut engine = SynthEngine::offline(SAMPLE_RATE);
    set_params(
        &mut engine,
        &[
            ("release", ParamValue::Number(2.0)),
            ("delay_mix", ParamValue::Number(0.5)),
        ],
    );
    for note in [48, 55, 60, 64] {
        note_on(&mut engine, note, 120);
    }
    render(&mut engine, 8192);
    // Pending notes queued behind the panic must die with it
    note_on(&mut engine, 72, 120);
    engine.enqueue(EngineEvent::AllNotesOff);

    let out = render(&mut engine, 2048);
    assert_eq!(engine.active_voice_count(), 0);
    assert_eq!(peak(&out), 0.0);
}

#[test]
fn lfo_vibrato_modulates_the_output() {
    // With a deep square amplitude LFO, loud and quiet halves of the
    // cycle must differ clearly
    let mut engine = SynthEngine::offline(SAMPLE_RATE);
    set_params(
        &mut engine,
        &[
            ("lfo_target", ParamValue::Choice("amplitude".into())),
            ("lfo_shape", ParamValue::Choice("square".into())),
            ("lfo_freq", ParamValue::Number(2.0)),
            ("lfo_depth", ParamValue::Number(1.0)),
        ],
    );
    note_on(&mut engine, 69, 110);
    // Let the envelope settle into sustain
    render(&mut engine, 24_000);

    let mut levels = Vec::new();
    for _ in 0..8 {
        // 3000 frames = 1/8 of the 2 Hz cycle at 48k
        let out = render(&mut engine, 3000);
        levels.push(rms(&out));
    }
    let max = levels.iter().cloned().fold(0.0_f32, f32::max);
    let min = levels.iter().cloned().fold(f32::MAX, f32::min);
    assert!(max > min * 1.2, "lfo had no audible effect: {levels:?}");
}

#[test]
fn stereo_channels_differ_with_spread_voices() {
    let mut engine = SynthEngine::offline(SAMPLE_RATE);
    // Voices 2 and 3 sit off-center; play three notes to reach them
    for note in [60, 64, 67] {
        note_on(&mut engine, note, 100);
    }
    render(&mut engine, 4096);
    let out = render(&mut engine, 4096);
    let left: Vec<f32> = out.iter().step_by(2).copied().collect();
    let right: Vec<f32> = out.iter().skip(1).step_by(2).copied().collect();
    let difference: f32 = left
        .iter()
        .zip(&right)
        .map(|(l, r)| (l - r).abs())
        .sum::<f32>()
        / left.len() as f32;
    assert!(difference > 1e-4, "channels identical: {difference}");
}

#[test]
fn arpeggiated_chord_plays_one_note_at_a_time() {
    let mut engine = SynthEngine::offline(SAMPLE_RATE);
    set_params(
        &mut engine,
        &[
            ("arp_enabled", ParamValue::Flag(true)),
            ("arp_tempo", ParamValue::Number(120.0)),
            ("arp_gate", ParamValue::Number(0.5)),
        ],
    );
    for note in [60, 64, 67] {
        note_on(&mut engine, note, 100);
    }

    let mut seen = Vec::new();
    for _ in 0..6 {
        // One 120 bpm step per 24000 frames; sample mid-step, inside the
        // 0.5 gate, where exactly the current note should be down
        render(&mut engine, 12_000);
        let sounding: Vec<u8> = engine
            .voices()
            .iter()
            .filter(|v| {
                v.state() == acorde_synth::synth::voice::VoiceState::Sounding
            })
            .map(|v| v.note())
            .collect();
        assert_eq!(sounding.len(), 1, "one gated note per step: {sounding:?}");
        seen.extend(sounding);
        render(&mut engine, 12_000);
    }
    for note in [60, 64, 67] {
        assert!(seen.contains(&note), "note {note} never arpeggiated");
    }
}
