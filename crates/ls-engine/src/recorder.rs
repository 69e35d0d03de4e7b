//! Event capture into per-channel tracks.

use ls_ir::{Event, EventKind, HeldNoteTable, LoopGeometry, RecordMode, Tick, Track, TrackBank};

/// Result of offering an event to the recorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capture {
    /// Appended at this (possibly quantized) tick
    Recorded(Tick),
    /// Transport was not recording
    NotRecording,
    /// The track was full; the drop was counted
    Dropped,
    /// Out-of-range note, or a release with no matching press; nothing sent
    Ignored,
}

/// Owns the track bank and the held-note table.
///
/// Tracks change only through here: appends, quantization and clears.
#[derive(Clone, Debug)]
pub struct Recorder {
    geometry: LoopGeometry,
    tracks: TrackBank,
    held: HeldNoteTable,
    quantize: bool,
    record_mode: RecordMode,
}

impl Recorder {
    pub fn new(geometry: LoopGeometry, capacity: usize, quantize: bool, record_mode: RecordMode) -> Self {
        Self {
            geometry,
            tracks: TrackBank::new(capacity),
            held: HeldNoteTable::new(),
            quantize,
            record_mode,
        }
    }

    pub fn tracks(&self) -> &TrackBank {
        &self.tracks
    }

    pub fn track(&self, channel: u8) -> Option<&Track> {
        self.tracks.get(channel)
    }

    pub fn held(&self) -> &HeldNoteTable {
        &self.held
    }

    pub fn held_mut(&mut self) -> &mut HeldNoteTable {
        &mut self.held
    }

    pub fn quantize_enabled(&self) -> bool {
        self.quantize
    }

    /// Append `kind` at `tick` to the track on `channel`.
    ///
    /// A no-op unless `recording`. Full tracks drop the event.
    pub fn record(&mut self, recording: bool, channel: u8, tick: Tick, kind: EventKind) -> Capture {
        if !recording {
            return Capture::NotRecording;
        }
        let tick = if self.quantize { self.geometry.quantize(tick) } else { tick };
        let Some(track) = self.tracks.get_mut(channel) else {
            return Capture::Dropped;
        };
        if track.push(Event::new(tick, kind)) {
            Capture::Recorded(tick)
        } else {
            log::warn!(target: "recorder", "track {} full, dropped {} events", channel + 1, track.dropped());
            Capture::Dropped
        }
    }

    /// A take is starting on `channel`. Replace mode wipes the track first.
    pub fn begin_take(&mut self, channel: u8) {
        if self.record_mode == RecordMode::Replace {
            self.clear_track(channel);
        }
    }

    /// Turn quantization on or off. Turning it on snaps every recorded event.
    ///
    /// Returns true if the flag changed.
    pub fn set_quantize(&mut self, enabled: bool) -> bool {
        if self.quantize == enabled {
            return false;
        }
        self.quantize = enabled;
        if enabled {
            self.tracks.quantize_all(&self.geometry);
        }
        true
    }

    pub fn clear_track(&mut self, channel: u8) {
        if let Some(track) = self.tracks.get_mut(channel) {
            track.clear();
        }
    }

    pub fn program(&self, channel: u8) -> u8 {
        self.tracks.get(channel).map_or(0, |t| t.program)
    }

    pub fn set_program(&mut self, channel: u8, program: u8) {
        if let Some(track) = self.tracks.get_mut(channel) {
            track.program = program & 0x7F;
        }
    }

    /// Swap in a whole bank, e.g. one loaded from a file.
    pub fn replace_tracks(&mut self, tracks: TrackBank) {
        self.tracks = tracks;
    }
}
