//! loopseq: a loop-based multi-track MIDI sequencer driven from stdin.
//!
//! Usage:
//!   loopseq [config.toml]
//!
//! Reads one command per line. Outgoing MIDI is logged under the `midi`
//! target; run with `RUST_LOG=debug` to see it.

use ls_master::{Command, Config, Controller, Input};
use ls_output::{LogSink, MidiReceiver, RingSink};
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use std::{env, thread};

const OUTPUT_BUFFER: usize = 1024;

const HELP: &str = "\
play | stop | toggle          transport
arm | disarm | rec on|off     recording
on <note> [vel] | off <note>  play a note on the active channel
key <c> | up <c>              letter keys zxcvbnm asdfghjkl qwertyuiop
oct + | oct -                 keyboard octave
tempo <bpm>                   20..=300
quant | metro                 toggle quantize / metronome
ch <1-16> | ch + | ch -       active channel
prog <0-127> | prog + | prog - program for the active channel
clear | panic | save | status | help | quit";

#[derive(Debug, PartialEq)]
enum Line {
    Input(Input),
    Help,
    Quit,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match env::args().nth(1) {
        Some(path) => Config::load(Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("{}", e);
            std::process::exit(1);
        }),
        None => Config::default(),
    };

    let (sink, receiver) = RingSink::new(OUTPUT_BUFFER);
    let (mut controller, mut inbox) = Controller::new(&config, sink);
    let stop = Arc::new(AtomicBool::new(false));
    let output_done = Arc::new(AtomicBool::new(false));

    let output_thread = {
        let done = output_done.clone();
        thread::spawn(move || drain_output(receiver, &done))
    };

    let input_thread = {
        let stop = stop.clone();
        thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(Line::Quit)) => break,
                    Ok(Some(Line::Help)) => println!("{}", HELP),
                    Ok(Some(Line::Input(input))) => {
                        if inbox.send(input).is_err() {
                            log::warn!("input dropped, controller is busy");
                        }
                    }
                    Err(msg) => eprintln!("{} (try `help`)", msg),
                }
            }
            stop.store(true, Ordering::Relaxed);
        })
    };

    println!("loopseq ready, type `help` for commands");
    controller.run(&stop);
    drop(controller);

    output_done.store(true, Ordering::Relaxed);
    let _ = input_thread.join();
    let _ = output_thread.join();
}

/// Stand-in for a synth: log whatever the sequencer sends.
fn drain_output(mut receiver: MidiReceiver, done: &AtomicBool) {
    use ls_engine::OutputSink;

    let mut log = LogSink::new();
    loop {
        let finished = done.load(Ordering::Relaxed);
        receiver.drain(|message| {
            let _ = log.send(message);
        });
        if finished {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    log::debug!(target: "midi", "{} messages sent", log.sent());
}

fn parse_line(line: &str) -> Result<Option<Line>, String> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let input = match (word, arg) {
        ("play", None) => Command::Play.into(),
        ("stop", None) => Command::Stop.into(),
        ("toggle", None) => Command::ToggleClock.into(),
        ("arm", None) => Command::Arm.into(),
        ("disarm", None) => Command::StopRecording.into(),
        ("rec", Some("on")) => Command::RecordEnable(true).into(),
        ("rec", Some("off")) => Command::RecordEnable(false).into(),
        ("on", Some(note)) => {
            let velocity = match words.next() {
                Some(v) => number(v, 0..=127)? as u8,
                None => ls_master::KEY_VELOCITY,
            };
            Command::NoteOn { note: number(note, 0..=127)? as u8, velocity }.into()
        }
        ("off", Some(note)) => Command::NoteOff { note: number(note, 0..=127)? as u8 }.into(),
        ("key", Some(key)) => Input::KeyDown(single_char(key)?),
        ("up", Some(key)) => Input::KeyUp(single_char(key)?),
        ("oct", Some("+")) => Input::OctaveUp,
        ("oct", Some("-")) => Input::OctaveDown,
        ("tempo", Some(bpm)) => Command::SetTempo(number(bpm, i32::MIN..=i32::MAX)?).into(),
        ("quant", None) => Command::ToggleQuantize.into(),
        ("metro", None) => Command::ToggleMetronome.into(),
        ("ch", Some("+")) => Command::StepChannel(1).into(),
        ("ch", Some("-")) => Command::StepChannel(-1).into(),
        ("ch", Some(n)) => Command::SetChannel(number(n, 1..=16)? as u8 - 1).into(),
        ("prog", Some("+")) => Command::StepProgram(1).into(),
        ("prog", Some("-")) => Command::StepProgram(-1).into(),
        ("prog", Some(n)) => Command::SetProgram(number(n, i32::MIN..=i32::MAX)?).into(),
        ("clear", None) => Command::ClearTrack.into(),
        ("panic", None) => Command::Panic.into(),
        ("save", None) => Input::Save,
        ("status", None) => Input::ShowStatus,
        ("help", None) => return Ok(Some(Line::Help)),
        ("quit" | "exit", None) => return Ok(Some(Line::Quit)),
        _ => return Err(format!("unknown command: {}", line.trim())),
    };
    Ok(Some(Line::Input(input)))
}

fn number(text: &str, range: std::ops::RangeInclusive<i32>) -> Result<i32, String> {
    let value: i32 = text.parse().map_err(|_| format!("not a number: {}", text))?;
    if !range.contains(&value) {
        return Err(format!("{} is outside {}..={}", value, range.start(), range.end()));
    }
    Ok(value)
}

fn single_char(text: &str) -> Result<char, String> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("expected a single key: {}", text)),
    }
}
