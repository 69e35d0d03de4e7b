//! Per-channel event storage.

use alloc::vec::Vec;

use crate::event::Event;
use crate::geometry::LoopGeometry;

/// Events per track unless configured otherwise.
pub const DEFAULT_TRACK_CAPACITY: usize = 10_000;

/// Events recorded on one MIDI channel, in capture order.
///
/// Storage is allocated once up front. Once `capacity` events are held,
/// further pushes are dropped and counted instead of growing the buffer.
#[derive(Clone, Debug)]
pub struct Track {
    channel: u8,
    /// Current instrument selection
    pub program: u8,
    events: Vec<Event>,
    capacity: usize,
    dropped: u32,
}

impl Track {
    pub fn new(channel: u8, capacity: usize) -> Self {
        Self {
            channel,
            program: 0,
            events: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= self.capacity
    }

    /// Events dropped because the track was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Events in capture order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Append an event. Returns false (and counts the drop) when full.
    pub fn push(&mut self, event: Event) -> bool {
        if self.is_full() {
            self.dropped = self.dropped.saturating_add(1);
            return false;
        }
        self.events.push(event);
        true
    }

    /// Remove every event. Program and capacity are kept.
    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }

    /// Snap every event to the sixteenth grid in place.
    pub fn quantize(&mut self, geometry: &LoopGeometry) {
        for event in &mut self.events {
            event.tick = geometry.quantize(event.tick);
        }
    }

    /// Events ordered by tick. Equal ticks keep capture order.
    pub fn sorted_events(&self) -> Vec<Event> {
        let mut sorted = self.events.clone();
        sorted.sort_by_key(|e| e.tick);
        sorted
    }
}
