//! Sink that writes every message to the log.

use ls_engine::{OutputSink, SinkError};
use ls_ir::MidiMessage;

/// Logs messages under the `midi` target. Useful without a synth attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink {
    sent: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl OutputSink for LogSink {
    fn send(&mut self, message: MidiMessage) -> Result<(), SinkError> {
        self.sent += 1;
        log::debug!(target: "midi", "{}", message);
        Ok(())
    }
}
