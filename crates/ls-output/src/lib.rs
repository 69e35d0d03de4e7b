//! Output sink backends for loopseq.
//!
//! The sequencer core sends [`MidiMessage`](ls_ir::MidiMessage)s to an
//! [`OutputSink`](ls_engine::OutputSink). The sinks here either hand them to
//! another thread through a lock-free ring buffer or write them to the log.

mod log_sink;
mod ring;

pub use log_sink::LogSink;
pub use ring::{MidiReceiver, RingSink};
