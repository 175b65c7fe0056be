//! Benchmarks for the full engine render path.
//!
//! Run with: cargo bench
//!
//! Reference timing at 48kHz sample rate:
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use acorde_synth::synth::params::{ParamMap, ParamValue};
use acorde_synth::{EngineEvent, SynthEngine};

const SAMPLE_RATE: f32 = 48_000.0;
const BLOCK_SIZES: &[usize] = &[128, 256, 512];

fn full_poly_engine() -> SynthEngine {
    let mut engine = SynthEngine::offline(SAMPLE_RATE);
    let mut map = ParamMap::new();
    map.insert("waveform".into(), ParamValue::Choice("sawtooth".into()));
    map.insert("rank2_enabled".into(), ParamValue::Flag(true));
    map.insert("sine_mix".into(), ParamValue::Number(0.3));
    map.insert("lfo_depth".into(), ParamValue::Number(0.4));
    map.insert("chorus_mix".into(), ParamValue::Number(0.4));
    map.insert("delay_mix".into(), ParamValue::Number(0.3));
    engine.enqueue(EngineEvent::Parameters(map));
    for note in [36, 40, 43, 48, 52, 55, 60, 64] {
        engine.enqueue(EngineEvent::NoteOn {
            note,
            velocity: 100,
        });
        // Clear the note-event cap between presses
        let mut warmup = [0.0_f32; 128];
        engine.render(&mut warmup);
    }
    engine
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/render");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0_f32; size * 2];

        let mut idle = SynthEngine::offline(SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::new("idle", size), &size, |b, _| {
            b.iter(|| {
                idle.render(black_box(&mut buffer));
            })
        });

        let mut engine = full_poly_engine();
        group.bench_with_input(BenchmarkId::new("eight_voices", size), &size, |b, _| {
            b.iter(|| {
                engine.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}

fn bench_single_voice(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/single_voice");

    for waveform in ["sine", "warm_sine", "triangle", "square", "sawtooth"] {
        let mut engine = SynthEngine::offline(SAMPLE_RATE);
        let mut map = ParamMap::new();
        map.insert("waveform".into(), ParamValue::Choice(waveform.into()));
        engine.enqueue(EngineEvent::Parameters(map));
        engine.enqueue(EngineEvent::NoteOn {
            note: 60,
            velocity: 100,
        });
        let mut buffer = vec![0.0_f32; 512];
        engine.render(&mut buffer);

        group.bench_function(waveform, |b| {
            b.iter(|| {
                engine.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_render, bench_single_voice);
criterion_main!(benches);
