//! Recorded events and the messages sent to an output sink.

use crate::geometry::Tick;

/// What a recorded event does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Start a note
    NoteOn { note: u8, velocity: u8 },
    /// Release a note
    NoteOff { note: u8 },
    /// Select an instrument
    ProgramChange { program: u8 },
    /// Set a controller value
    ControlChange { controller: u8, value: u8 },
}

/// An event at a tick within the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Event {
    /// When the event fires, `0..total_loop_ticks`
    pub tick: Tick,
    pub kind: EventKind,
}

impl Event {
    pub const fn new(tick: Tick, kind: EventKind) -> Self {
        Self { tick, kind }
    }

    pub const fn note_on(tick: Tick, note: u8, velocity: u8) -> Self {
        Self::new(tick, EventKind::NoteOn { note, velocity })
    }

    pub const fn note_off(tick: Tick, note: u8) -> Self {
        Self::new(tick, EventKind::NoteOff { note })
    }

    /// Attach a channel, producing the message the sink receives.
    pub const fn on_channel(&self, channel: u8) -> MidiMessage {
        MidiMessage { channel, kind: self.kind }
    }
}

/// A channel voice message addressed to an output sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MidiMessage {
    /// MIDI channel, 0-15
    pub channel: u8,
    pub kind: EventKind,
}

impl MidiMessage {
    pub const fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self { channel, kind: EventKind::NoteOn { note, velocity } }
    }

    pub const fn note_off(channel: u8, note: u8) -> Self {
        Self { channel, kind: EventKind::NoteOff { note } }
    }

    pub const fn program_change(channel: u8, program: u8) -> Self {
        Self { channel, kind: EventKind::ProgramChange { program } }
    }

    pub const fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self { channel, kind: EventKind::ControlChange { controller, value } }
    }
}

impl core::fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let ch = self.channel + 1;
        match self.kind {
            EventKind::NoteOn { note, velocity } => write!(f, "ch{:02} on  {:3} vel {:3}", ch, note, velocity),
            EventKind::NoteOff { note } => write!(f, "ch{:02} off {:3}", ch, note),
            EventKind::ProgramChange { program } => write!(f, "ch{:02} prg {:3}", ch, program),
            EventKind::ControlChange { controller, value } => {
                write!(f, "ch{:02} cc  {:3} = {:3}", ch, controller, value)
            }
        }
    }
}
