//! Loading a file back into a track bank.

use ls_ir::{Event, EventKind, LoopGeometry, Tempo, TrackBank};

use crate::smf::SmfFile;

/// A track bank rebuilt from a file, plus the timing it carried.
#[derive(Clone, Debug)]
pub struct Imported {
    pub tracks: TrackBank,
    /// From the first tempo meta event
    pub tempo: Option<Tempo>,
    /// From the first time signature
    pub beats_per_bar: Option<u8>,
}

/// Rebuild a track bank from `file`.
///
/// Ticks are rescaled from the file's division to the loop's resolution and
/// wrapped into the loop. A program change that precedes every note on its
/// channel sets the track program; later ones are kept as events. Control
/// changes are dropped.
pub fn import_smf(file: &SmfFile, geometry: &LoopGeometry, capacity: usize) -> Imported {
    let mut tracks = TrackBank::new(capacity);
    let division = u64::from(file.division.max(1));
    let mut skipped = 0usize;

    for smf_track in &file.tracks {
        for (event, channel, kind) in smf_track.channel_events() {
            let Some(track) = tracks.get_mut(channel) else {
                continue;
            };
            if let EventKind::ProgramChange { program } = kind {
                if track.is_empty() {
                    track.program = program & 0x7F;
                    continue;
                }
            }
            if matches!(kind, EventKind::ControlChange { .. }) {
                skipped += 1;
                continue;
            }
            let tick = u64::from(event.tick) * u64::from(geometry.ticks_per_beat) / division;
            track.push(Event::new(geometry.wrap(tick), kind));
        }
    }

    if skipped > 0 {
        log::debug!(target: "smf", "import skipped {} control changes", skipped);
    }
    for track in tracks.iter().filter(|t| t.dropped() > 0) {
        log::warn!(
            target: "smf",
            "channel {} over capacity, {} events not imported",
            track.channel() + 1,
            track.dropped()
        );
    }

    let tempo = file.tempo_micros().filter(|&micros| micros > 0).map(|micros| {
        let bpm = (60_000_000 + micros / 2) / micros;
        Tempo::clamped(bpm as i32)
    });

    Imported { tracks, tempo, beats_per_bar: file.beats_per_bar() }
}
