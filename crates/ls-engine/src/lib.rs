//! Sequencer engine for loopseq.
//!
//! A drift-corrected clock drives beat-boundary transport transitions and
//! periodic playback passes; input notes are captured by the recorder into
//! the track bank. All of it lives in one [`Session`], driven from a single
//! thread through a timer queue.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod clock;
mod command;
mod metronome;
mod player;
mod recorder;
mod repeat;
mod session;
mod sink;
mod status;
mod timer_queue;
pub mod transport;

pub use clock::{Clock, ClockSource, ManualClock};
pub use command::{Command, CommandOutcome, TempoChange};
pub use metronome::Metronome;
pub use player::{Player, Window};
pub use recorder::{Capture, Recorder};
pub use repeat::{AutoRepeat, NudgeTarget, REPEAT_DELAY, REPEAT_INTERVAL};
pub use session::Session;
pub use sink::{NullSink, OutputSink, SinkError};
pub use status::Status;
pub use timer_queue::{TimerHandle, TimerQueue};
pub use transport::{BeatReport, StopReason, Transport, TransportState};
