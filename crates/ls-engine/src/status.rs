//! Read-only snapshot for display.

use core::fmt;

use crate::transport::TransportState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status {
    pub state: TransportState,
    /// Most recently fired beat, `0..total_beats`
    pub beat: u32,
    /// 1-based
    pub bar: u32,
    /// 1-based
    pub beat_in_bar: u32,
    pub total_beats: u32,
    pub bpm: u16,
    /// Set while a tempo change waits for the next beat
    pub pending_bpm: Option<u16>,
    pub quantize: bool,
    pub metronome: bool,
    /// Active channel, 0-based
    pub channel: u8,
    pub program: u8,
    pub program_name: &'static str,
    /// Events on the active track
    pub event_count: usize,
    /// Events dropped on the active track
    pub dropped: u32,
    pub beats_recorded: u32,
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:9}] bar {} beat {} | {:3} BPM",
            self.state.label(),
            self.bar,
            self.beat_in_bar,
            self.bpm
        )?;
        if let Some(pending) = self.pending_bpm {
            write!(f, " -> {}", pending)?;
        }
        write!(
            f,
            " | quant {} | metro {} | ch {:2} prog {:3} {} | {} events",
            on_off(self.quantize),
            on_off(self.metronome),
            self.channel + 1,
            self.program,
            self.program_name,
            self.event_count
        )?;
        if self.dropped > 0 {
            write!(f, " ({} dropped)", self.dropped)?;
        }
        if self.state == TransportState::Recording {
            write!(f, " | rec {}/{}", self.beats_recorded, self.total_beats)?;
        }
        Ok(())
    }
}
