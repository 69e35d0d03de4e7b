//! Destination for outgoing MIDI messages.

use alloc::vec::Vec;
use ls_ir::MidiMessage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("output buffer is full")]
    Full,
    #[error("output is disconnected")]
    Disconnected,
}

/// Something that accepts channel voice messages, such as a synth or a port.
///
/// The session ignores send failures beyond counting them.
pub trait OutputSink {
    fn send(&mut self, message: MidiMessage) -> Result<(), SinkError>;

    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) -> Result<(), SinkError> {
        self.send(MidiMessage::note_on(channel, note, velocity))
    }

    fn note_off(&mut self, channel: u8, note: u8) -> Result<(), SinkError> {
        self.send(MidiMessage::note_off(channel, note))
    }

    fn program_change(&mut self, channel: u8, program: u8) -> Result<(), SinkError> {
        self.send(MidiMessage::program_change(channel, program))
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) -> Result<(), SinkError> {
        self.send(MidiMessage::control_change(channel, controller, value))
    }
}

/// Collects messages; handy for tests and offline rendering.
impl OutputSink for Vec<MidiMessage> {
    fn send(&mut self, message: MidiMessage) -> Result<(), SinkError> {
        self.push(message);
        Ok(())
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn send(&mut self, message: MidiMessage) -> Result<(), SinkError> {
        (**self).send(message)
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn send(&mut self, _message: MidiMessage) -> Result<(), SinkError> {
        Ok(())
    }
}
