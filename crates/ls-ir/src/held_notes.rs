//! Which channel is sounding each note.

/// Maps every note number to the channel whose NoteOn is still sounding.
///
/// A NoteOff is routed through this table rather than the active channel,
/// so switching channels while a key is held cannot leave a stuck note.
#[derive(Clone, Debug)]
pub struct HeldNoteTable {
    slots: [Option<u8>; 128],
}

impl Default for HeldNoteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HeldNoteTable {
    pub const fn new() -> Self {
        Self { slots: [None; 128] }
    }

    /// Record that `note` is now sounding on `channel`.
    ///
    /// Returns the channel it was previously held on, if any.
    pub fn press(&mut self, note: u8, channel: u8) -> Option<u8> {
        let slot = self.slots.get_mut(note as usize)?;
        slot.replace(channel)
    }

    /// Release `note`, returning the channel it was sounding on.
    ///
    /// Returns `None` when the note was not held, so a second release is a no-op.
    pub fn release(&mut self, note: u8) -> Option<u8> {
        self.slots.get_mut(note as usize)?.take()
    }

    pub fn channel_of(&self, note: u8) -> Option<u8> {
        self.slots.get(note as usize).copied().flatten()
    }

    /// Number of notes currently held.
    pub fn held_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Release every note held on `channel`, calling `f(note)` for each.
    pub fn release_channel(&mut self, channel: u8, mut f: impl FnMut(u8)) {
        for (note, slot) in self.slots.iter_mut().enumerate() {
            if *slot == Some(channel) {
                *slot = None;
                f(note as u8);
            }
        }
    }

    /// Release every held note, calling `f(note, channel)` for each.
    pub fn release_all(&mut self, mut f: impl FnMut(u8, u8)) {
        for (note, slot) in self.slots.iter_mut().enumerate() {
            if let Some(channel) = slot.take() {
                f(note as u8, channel);
            }
        }
    }

    /// Forget every held note without reporting them.
    pub fn clear(&mut self) {
        self.slots = [None; 128];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn release_returns_press_channel_once() {
        let mut held = HeldNoteTable::new();
        held.press(60, 2);
        assert_eq!(held.channel_of(60), Some(2));
        assert_eq!(held.release(60), Some(2));
        assert_eq!(held.release(60), None);
    }

    #[test]
    fn out_of_range_note_is_ignored() {
        let mut held = HeldNoteTable::new();
        assert_eq!(held.press(200, 1), None);
        assert_eq!(held.channel_of(200), None);
        assert_eq!(held.held_count(), 0);
    }

    #[test]
    fn release_channel_only_touches_that_channel() {
        let mut held = HeldNoteTable::new();
        held.press(60, 0);
        held.press(64, 1);
        held.press(67, 0);
        let mut released = Vec::new();
        held.release_channel(0, |n| released.push(n));
        assert_eq!(released, [60, 67]);
        assert_eq!(held.channel_of(64), Some(1));
        assert_eq!(held.held_count(), 1);
    }

    #[test]
    fn release_all_empties_table() {
        let mut held = HeldNoteTable::new();
        held.press(1, 5);
        held.press(127, 15);
        let mut released = Vec::new();
        held.release_all(|n, ch| released.push((n, ch)));
        assert_eq!(released, [(1, 5), (127, 15)]);
        assert_eq!(held.held_count(), 0);
    }
}
