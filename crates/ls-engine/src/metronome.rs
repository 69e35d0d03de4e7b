//! Beat click on the percussion channel.

use ls_ir::consts::{CLICK_ACCENT_NOTE, CLICK_ACCENT_VELOCITY, CLICK_NOTE, CLICK_VELOCITY, METRONOME_CHANNEL};
use ls_ir::{LoopGeometry, MidiMessage};

#[derive(Clone, Copy, Debug)]
pub struct Metronome {
    enabled: bool,
}

impl Metronome {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flip on/off and return the new state.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Click for `beat`, accented on the first beat of each bar.
    pub fn click(&self, geometry: &LoopGeometry, beat: u32) -> Option<MidiMessage> {
        if !self.enabled {
            return None;
        }
        let (note, velocity) = if geometry.is_downbeat(beat) {
            (CLICK_ACCENT_NOTE, CLICK_ACCENT_VELOCITY)
        } else {
            (CLICK_NOTE, CLICK_VELOCITY)
        };
        Some(MidiMessage::note_on(METRONOME_CHANNEL, note, velocity))
    }
}
