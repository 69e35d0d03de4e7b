//! Core data types for the loopseq loop sequencer.
//!
//! Loop geometry, tempo, recorded events and the per-channel track bank.
//! The engine consumes these types, the file formats produce and consume
//! them, and nothing here knows about wall-clock time or I/O.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod bank;
mod config;
mod event;
mod geometry;
mod held_notes;
mod programs;
mod tempo;
mod track;

pub use bank::{TrackBank, MAX_CHANNELS};
pub use config::{AutoStop, RecordMode, RecordingChannelPlayback, SessionConfig};
pub use event::{Event, EventKind, MidiMessage};
pub use geometry::{
    LoopGeometry, Tick, DEFAULT_TICKS_PER_BEAT, GRID_DIVISIONS_PER_BEAT, MAX_BEATS_PER_BAR, MAX_TICKS_PER_BEAT,
};
pub use held_notes::HeldNoteTable;
pub use programs::{program_name, step_program};
pub use tempo::{Tempo, DEFAULT_BPM, MAX_BPM, MAX_SAMPLING_INTERVAL, MIN_BPM, MIN_SAMPLING_INTERVAL};
pub use track::{Track, DEFAULT_TRACK_CAPACITY};

/// Metronome and panic messages use these.
pub mod consts {
    /// Channel 10 in one-based numbering: General MIDI percussion.
    pub const METRONOME_CHANNEL: u8 = 9;
    /// High wood block, played on the first beat of each bar.
    pub const CLICK_ACCENT_NOTE: u8 = 76;
    pub const CLICK_ACCENT_VELOCITY: u8 = 120;
    /// Low wood block, played on every other beat.
    pub const CLICK_NOTE: u8 = 77;
    pub const CLICK_VELOCITY: u8 = 80;
    /// "All Notes Off" controller.
    pub const ALL_NOTES_OFF: u8 = 123;
}
