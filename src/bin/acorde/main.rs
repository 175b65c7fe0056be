//! acorde - terminal keyboard for the synth engine
//!
//! Run with: cargo run
//!
//! Home row plays a C major scale (sharps on the row above), number keys
//! switch waveforms, and `m` fires a gated random patch. Terminals report
//! key presses only, so each new note releases the previous one; space
//! silences everything.

use std::time::Duration;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use acorde_synth::io;
use acorde_synth::synth::params::{ParamMap, ParamValue};
use acorde_synth::SynthController;

fn key_to_note(code: KeyCode) -> Option<u8> {
    // C4 on 'a', white keys along the home row, sharps above
    let note = match code {
        KeyCode::Char('a') => 60,
        KeyCode::Char('w') => 61,
        KeyCode::Char('s') => 62,
        KeyCode::Char('e') => 63,
        KeyCode::Char('d') => 64,
        KeyCode::Char('f') => 65,
        KeyCode::Char('t') => 66,
        KeyCode::Char('g') => 67,
        KeyCode::Char('y') => 68,
        KeyCode::Char('h') => 69,
        KeyCode::Char('u') => 70,
        KeyCode::Char('j') => 71,
        KeyCode::Char('k') => 72,
        _ => return None,
    };
    Some(note)
}

fn waveform_for_digit(code: KeyCode) -> Option<&'static str> {
    match code {
        KeyCode::Char('1') => Some("sine"),
        KeyCode::Char('2') => Some("warm_sine"),
        KeyCode::Char('3') => Some("triangle"),
        KeyCode::Char('4') => Some("square"),
        KeyCode::Char('5') => Some("sawtooth"),
        _ => None,
    }
}

/// A full patch worth of parameters, applied atomically under the mute
/// gate so the jump is inaudible.
fn random_patch(rng: &mut SmallRng) -> ParamMap {
    let waveforms = ["sine", "warm_sine", "triangle", "square", "sawtooth"];
    let mut map = ParamMap::new();
    map.insert(
        "waveform".into(),
        ParamValue::Choice(waveforms[rng.random_range(0..waveforms.len())].into()),
    );
    map.insert(
        "cutoff".into(),
        ParamValue::Number(rng.random_range(300.0..8000.0)),
    );
    map.insert(
        "resonance".into(),
        ParamValue::Number(rng.random_range(0.0..0.8)),
    );
    map.insert(
        "attack".into(),
        ParamValue::Number(rng.random_range(0.005..0.5)),
    );
    map.insert(
        "release".into(),
        ParamValue::Number(rng.random_range(0.05..1.5)),
    );
    map.insert(
        "rank2_enabled".into(),
        ParamValue::Flag(rng.random_range(0..2) == 1),
    );
    map.insert(
        "rank2_detune".into(),
        ParamValue::Number(rng.random_range(2.0..12.0)),
    );
    map.insert(
        "chorus_mix".into(),
        ParamValue::Number(rng.random_range(0.0..0.5)),
    );
    map.insert(
        "delay_mix".into(),
        ParamValue::Number(rng.random_range(0.0..0.4)),
    );
    map
}

fn run(controller: &mut SynthController) -> EyreResult<()> {
    let mut rng = SmallRng::seed_from_u64(0xAC0_2DE5);
    let mut sounding: Option<u8> = None;
    let mut arp_on = false;

    loop {
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => break,
            KeyCode::Char(' ') => {
                controller.all_notes_off();
                sounding = None;
            }
            KeyCode::Char('m') => {
                controller.update_parameters_gated(random_patch(&mut rng));
                println!("randomized patch\r");
            }
            KeyCode::Char('b') => {
                arp_on = !arp_on;
                let mut map = ParamMap::new();
                map.insert("arp_enabled".into(), ParamValue::Flag(arp_on));
                controller.update_parameters(map);
                println!("arp {}\r", if arp_on { "on" } else { "off" });
            }
            code => {
                if let Some(name) = waveform_for_digit(code) {
                    let mut map = ParamMap::new();
                    map.insert("waveform".into(), ParamValue::Choice(name.into()));
                    controller.update_parameters(map);
                    println!("waveform: {name}\r");
                } else if let Some(note) = key_to_note(code) {
                    if let Some(previous) = sounding.take() {
                        controller.note_off(previous, 64);
                    }
                    controller.note_on(note, 100);
                    sounding = Some(note);
                }
            }
        }
    }
    controller.all_notes_off();
    Ok(())
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;

    let (mut controller, stream) = io::start();
    if !stream.is_available() {
        if let Some(error) = stream.error() {
            eprintln!("audio unavailable: {error}");
        }
        eprintln!("running without sound; key handling still works");
    }
    println!("acorde @ {} Hz", stream.sample_rate());
    println!("keys: a..k notes | 1-5 waveform | b arp | m randomize | space silence | q quit");

    enable_raw_mode()?;
    let result = run(&mut controller);
    disable_raw_mode()?;
    result
}
