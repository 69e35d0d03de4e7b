//! Caller-facing commands and what became of them.

use ls_ir::Tempo;

use crate::recorder::Capture;
use crate::repeat::NudgeTarget;

/// Everything a front end can ask the session to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the clock and transport
    Play,
    /// Stop everything and silence the output
    Stop,
    /// Play if stopped, stop if running
    ToggleClock,
    /// Record from the next beat
    Arm,
    /// Leave Armed/Recording immediately
    StopRecording,
    /// External record-enable signal, sampled each beat
    RecordEnable(bool),
    /// Note pressed on the active channel
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    SetTempo(i32),
    /// Nudge once now, then repeat while held
    Hold { target: NudgeTarget, delta: i32 },
    Release(NudgeTarget),
    ToggleQuantize,
    ToggleMetronome,
    SetChannel(u8),
    StepChannel(i32),
    SetProgram(i32),
    StepProgram(i32),
    ClearTrack,
    Panic,
}

/// What happened to a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    /// Nothing to do in the current state
    Ignored,
    /// The value was out of range; the nearest valid value was used
    Clamped,
    /// Not allowed while a take is in progress
    RejectedWhileRecording,
}

/// Result of a tempo request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TempoChange {
    /// In effect now
    Applied { tempo: Tempo, clamped: bool },
    /// Takes effect on the next beat
    Deferred { tempo: Tempo, clamped: bool },
    RejectedWhileRecording,
}

impl From<TempoChange> for CommandOutcome {
    fn from(change: TempoChange) -> Self {
        match change {
            TempoChange::Applied { clamped: true, .. } | TempoChange::Deferred { clamped: true, .. } => {
                CommandOutcome::Clamped
            }
            TempoChange::Applied { .. } | TempoChange::Deferred { .. } => CommandOutcome::Applied,
            TempoChange::RejectedWhileRecording => CommandOutcome::RejectedWhileRecording,
        }
    }
}

/// Played notes count as applied whether or not a take captured them.
impl From<Capture> for CommandOutcome {
    fn from(capture: Capture) -> Self {
        match capture {
            Capture::Ignored => CommandOutcome::Ignored,
            _ => CommandOutcome::Applied,
        }
    }
}

impl CommandOutcome {
    /// Map a did-anything flag to Applied/Ignored.
    pub fn from_flag(applied: bool) -> Self {
        if applied {
            CommandOutcome::Applied
        } else {
            CommandOutcome::Ignored
        }
    }
}
