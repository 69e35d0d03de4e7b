//! Headless controller for the loopseq loop sequencer.
//!
//! Drives a [`Session`](ls_engine::Session) from the system clock, takes
//! input through a lock-free inbox, maps letter keys to notes, loads TOML
//! configuration and saves takes as timestamped MIDI files.

mod clock;
mod config;
mod controller;
mod keymap;
mod save;

pub use clock::SystemClock;
pub use config::{Config, ConfigError};
pub use controller::{Controller, Input, InputSender, INBOX_CAPACITY, MAX_WAIT};
pub use keymap::{key_offset, Keyboard, DEFAULT_OCTAVE, KEY_VELOCITY, MAX_OCTAVE, MIN_OCTAVE};
pub use save::{file_name, save_to, SaveError};

// Re-export common types so callers don't need ls-engine/ls-ir directly.
pub use ls_engine::{Command, CommandOutcome, NudgeTarget, Status, TransportState};
pub use ls_ir::{MidiMessage, SessionConfig};
