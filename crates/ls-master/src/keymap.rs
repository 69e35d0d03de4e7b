//! Computer keyboard as a piano: three rows of letter keys.
//!
//! ```text
//!   q w e r t y u i o p     16..=25
//!   a s d f g h j k l       7..=15
//!   z x c v b n m           0..=6
//! ```
//!
//! Offsets are semitones above `octave * 12`.

pub const MIN_OCTAVE: u8 = 0;
pub const MAX_OCTAVE: u8 = 8;
pub const DEFAULT_OCTAVE: u8 = 3;
pub const KEY_VELOCITY: u8 = 100;

const LAYOUT: &str = "zxcvbnmasdfghjklqwertyuiop";

/// Semitone offset for a note key.
pub fn key_offset(key: char) -> Option<u8> {
    LAYOUT.find(key.to_ascii_lowercase()).map(|i| i as u8)
}

/// Octave selection plus which note each key is sounding.
///
/// A key remembers the note it started, so releasing it after an octave
/// change still stops the right note.
#[derive(Clone, Debug)]
pub struct Keyboard {
    octave: u8,
    sounding: [Option<u8>; LAYOUT.len()],
}

impl Keyboard {
    pub fn new(octave: u8) -> Self {
        Self { octave: octave.min(MAX_OCTAVE), sounding: [None; LAYOUT.len()] }
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    pub fn octave_up(&mut self) -> bool {
        if self.octave >= MAX_OCTAVE {
            return false;
        }
        self.octave += 1;
        true
    }

    pub fn octave_down(&mut self) -> bool {
        if self.octave <= MIN_OCTAVE {
            return false;
        }
        self.octave -= 1;
        true
    }

    /// Note a key plays at the current octave.
    pub fn note_for(&self, key: char) -> Option<u8> {
        let note = self.octave as u32 * 12 + key_offset(key)? as u32;
        (note < 128).then_some(note as u8)
    }

    /// Key went down. `None` for non-note keys and for auto-repeat of a key
    /// that is already down.
    pub fn press(&mut self, key: char) -> Option<u8> {
        let slot = key_offset(key)? as usize;
        if self.sounding[slot].is_some() {
            return None;
        }
        let note = self.note_for(key)?;
        self.sounding[slot] = Some(note);
        Some(note)
    }

    /// Key came up. Returns the note it was sounding.
    pub fn release(&mut self, key: char) -> Option<u8> {
        let slot = key_offset(key)? as usize;
        self.sounding[slot].take()
    }

    /// Forget every pressed key, e.g. after a panic.
    pub fn reset(&mut self) {
        self.sounding = [None; LAYOUT.len()];
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new(DEFAULT_OCTAVE)
    }
}
