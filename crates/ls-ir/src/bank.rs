//! The fixed set of sixteen channel tracks.

use arrayvec::ArrayVec;

use crate::geometry::LoopGeometry;
use crate::track::Track;

/// Number of MIDI channels, and therefore tracks.
pub const MAX_CHANNELS: usize = 16;

/// One track per MIDI channel; track `n` always belongs to channel `n`.
#[derive(Clone, Debug)]
pub struct TrackBank {
    tracks: ArrayVec<Track, MAX_CHANNELS>,
}

impl TrackBank {
    /// Create sixteen empty tracks, each able to hold `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let tracks = (0..MAX_CHANNELS as u8).map(|ch| Track::new(ch, capacity)).collect();
        Self { tracks }
    }

    pub fn get(&self, channel: u8) -> Option<&Track> {
        self.tracks.get(channel as usize)
    }

    pub fn get_mut(&mut self, channel: u8) -> Option<&mut Track> {
        self.tracks.get_mut(channel as usize)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, Track> {
        self.tracks.iter_mut()
    }

    /// Tracks holding at least one event, in channel order.
    pub fn non_empty(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| !t.is_empty())
    }

    /// Events across all tracks.
    pub fn total_events(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }

    /// Snap every recorded event on every track to the grid.
    pub fn quantize_all(&mut self, geometry: &LoopGeometry) {
        for track in &mut self.tracks {
            track.quantize(geometry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    #[test]
    fn one_track_per_channel() {
        let bank = TrackBank::new(16);
        assert_eq!(bank.iter().count(), MAX_CHANNELS);
        for (i, track) in bank.iter().enumerate() {
            assert_eq!(track.channel() as usize, i);
        }
        assert!(bank.get(16).is_none());
    }

    #[test]
    fn non_empty_skips_silent_channels() {
        let mut bank = TrackBank::new(16);
        bank.get_mut(3).unwrap().push(Event::note_on(0, 60, 100));
        bank.get_mut(9).unwrap().push(Event::note_on(0, 36, 100));
        let channels: alloc::vec::Vec<u8> = bank.non_empty().map(|t| t.channel()).collect();
        assert_eq!(channels, [3, 9]);
        assert_eq!(bank.total_events(), 2);
    }

    #[test]
    fn quantize_all_is_idempotent() {
        let geometry = LoopGeometry::default();
        let mut bank = TrackBank::new(16);
        for (i, tick) in [7u32, 61, 130, 599, 7679].into_iter().enumerate() {
            bank.get_mut(i as u8).unwrap().push(Event::note_on(tick, 60, 100));
        }
        bank.quantize_all(&geometry);
        let once: alloc::vec::Vec<u32> = bank.iter().flat_map(|t| t.events().iter().map(|e| e.tick)).collect();
        bank.quantize_all(&geometry);
        let twice: alloc::vec::Vec<u32> = bank.iter().flat_map(|t| t.events().iter().map(|e| e.tick)).collect();
        assert_eq!(once, twice);
        assert_eq!(once, [0, 120, 120, 600, 0]);
    }
}
