//! Standard MIDI File (Format 1) encoding and decoding.

use binrw::{binrw, BinRead, BinWrite};
use ls_ir::{EventKind, LoopGeometry, Tempo, Track, TrackBank};
use std::io::{Cursor, Seek, SeekFrom, Write};

use crate::vlq::{read_vlq, write_vlq};
use crate::FormatError;

const HEADER_ID: [u8; 4] = *b"MThd";
const TRACK_ID: [u8; 4] = *b"MTrk";

const META: u8 = 0xFF;
const META_END_OF_TRACK: u8 = 0x2F;
const META_TEMPO: u8 = 0x51;
const META_TIME_SIGNATURE: u8 = 0x58;

/// Chunk id plus the length of the body that follows.
#[binrw]
#[brw(big)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ChunkHeader {
    id: [u8; 4],
    length: u32,
}

/// Body of the `MThd` chunk.
#[binrw]
#[brw(big)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct HeaderBody {
    format: u16,
    track_count: u16,
    division: u16,
}

// --- Writing ---

/// Write `tracks` as a Format 1 file: a conductor track carrying tempo and
/// time signature, then one track per non-empty channel.
///
/// Each track starts with its program change. Events are ordered by tick;
/// events on the same tick keep capture order. The output depends only on
/// the inputs, so saving the same session twice yields identical bytes.
pub fn write_smf<W: Write + Seek>(
    w: &mut W,
    tracks: &TrackBank,
    tempo: Tempo,
    geometry: &LoopGeometry,
) -> Result<(), FormatError> {
    geometry.check().map_err(FormatError::UnencodableGeometry)?;
    let channel_tracks: Vec<&Track> = tracks.non_empty().collect();

    ChunkHeader { id: HEADER_ID, length: 6 }.write_be(w)?;
    HeaderBody {
        format: 1,
        track_count: channel_tracks.len() as u16 + 1,
        division: geometry.ticks_per_beat as u16,
    }
    .write_be(w)?;

    write_track_chunk(w, |w| write_conductor(w, tempo, geometry))?;
    for track in channel_tracks {
        write_track_chunk(w, |w| write_channel_track(w, track))?;
    }
    Ok(())
}

/// Serialize into memory.
pub fn smf_to_bytes(tracks: &TrackBank, tempo: Tempo, geometry: &LoopGeometry) -> Result<Vec<u8>, FormatError> {
    let mut cursor = Cursor::new(Vec::new());
    write_smf(&mut cursor, tracks, tempo, geometry)?;
    Ok(cursor.into_inner())
}

/// Write an `MTrk` chunk whose length is patched in once the body is known.
fn write_track_chunk<W: Write + Seek>(
    w: &mut W,
    body: impl FnOnce(&mut W) -> Result<(), FormatError>,
) -> Result<(), FormatError> {
    ChunkHeader { id: TRACK_ID, length: 0 }.write_be(w)?;
    let start = w.stream_position()?;
    body(w)?;
    let end = w.stream_position()?;
    w.seek(SeekFrom::Start(start - 4))?;
    ((end - start) as u32).write_be(w)?;
    w.seek(SeekFrom::Start(end))?;
    Ok(())
}

fn write_conductor(w: &mut impl Write, tempo: Tempo, geometry: &LoopGeometry) -> Result<(), FormatError> {
    let micros = tempo.micros_per_beat().to_be_bytes();
    write_vlq(w, 0)?;
    w.write_all(&[META, META_TEMPO, 3, micros[1], micros[2], micros[3]])?;
    // denominator is a power of two: 2 means quarter notes
    write_vlq(w, 0)?;
    w.write_all(&[META, META_TIME_SIGNATURE, 4, geometry.beats_per_bar as u8, 2, 24, 8])?;
    write_end_of_track(w)
}

fn write_channel_track(w: &mut impl Write, track: &Track) -> Result<(), FormatError> {
    let channel = track.channel() & 0x0F;
    write_vlq(w, 0)?;
    w.write_all(&[0xC0 | channel, track.program & 0x7F])?;

    let mut last_tick = 0;
    for event in track.sorted_events() {
        write_vlq(w, event.tick - last_tick)?;
        last_tick = event.tick;
        write_channel_event(w, channel, event.kind)?;
    }
    write_end_of_track(w)
}

fn write_channel_event(w: &mut impl Write, channel: u8, kind: EventKind) -> Result<(), FormatError> {
    match kind {
        EventKind::NoteOn { note, velocity } => w.write_all(&[0x90 | channel, note & 0x7F, velocity & 0x7F])?,
        EventKind::NoteOff { note } => w.write_all(&[0x80 | channel, note & 0x7F, 0])?,
        EventKind::ProgramChange { program } => w.write_all(&[0xC0 | channel, program & 0x7F])?,
        EventKind::ControlChange { controller, value } => {
            w.write_all(&[0xB0 | channel, controller & 0x7F, value & 0x7F])?
        }
    }
    Ok(())
}

fn write_end_of_track(w: &mut impl Write) -> Result<(), FormatError> {
    write_vlq(w, 0)?;
    w.write_all(&[META, META_END_OF_TRACK, 0])?;
    Ok(())
}

// --- Reading ---

/// A parsed file. Ticks are absolute within each track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmfFile {
    pub format: u16,
    /// Ticks per quarter note
    pub division: u16,
    pub tracks: Vec<SmfTrack>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SmfTrack {
    pub events: Vec<SmfEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmfEvent {
    /// Ticks since the previous event in this track
    pub delta: u32,
    /// Ticks since the start of the track
    pub tick: u32,
    pub kind: SmfEventKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SmfEventKind {
    Channel { channel: u8, kind: EventKind },
    /// Microseconds per quarter note
    Tempo(u32),
    TimeSignature { numerator: u8, denominator_pow2: u8, clocks_per_click: u8, thirty_seconds_per_quarter: u8 },
    EndOfTrack,
    Meta { meta_type: u8, data: Vec<u8> },
    SysEx(Vec<u8>),
}

impl SmfTrack {
    /// Channel events only, with their deltas and ticks.
    pub fn channel_events(&self) -> impl Iterator<Item = (&SmfEvent, u8, EventKind)> {
        self.events.iter().filter_map(|e| match e.kind {
            SmfEventKind::Channel { channel, kind } => Some((e, channel, kind)),
            _ => None,
        })
    }

    /// Channel events excluding program changes, as `(delta, kind)`.
    ///
    /// The delta is measured from the previous event of any kind, as stored.
    pub fn note_deltas(&self) -> Vec<(u32, EventKind)> {
        self.channel_events()
            .filter(|(_, _, kind)| matches!(kind, EventKind::NoteOn { .. } | EventKind::NoteOff { .. }))
            .map(|(e, _, kind)| (e.delta, kind))
            .collect()
    }
}

impl SmfFile {
    /// First tempo meta event in the file.
    pub fn tempo_micros(&self) -> Option<u32> {
        self.tracks.iter().flat_map(|t| &t.events).find_map(|e| match e.kind {
            SmfEventKind::Tempo(micros) => Some(micros),
            _ => None,
        })
    }

    /// Numerator of the first time signature in the file.
    pub fn beats_per_bar(&self) -> Option<u8> {
        self.tracks.iter().flat_map(|t| &t.events).find_map(|e| match e.kind {
            SmfEventKind::TimeSignature { numerator, .. } => Some(numerator),
            _ => None,
        })
    }
}

/// Parse a Format 0 or Format 1 file.
pub fn read_smf(data: &[u8]) -> Result<SmfFile, FormatError> {
    let mut cursor = Cursor::new(data);

    let header = read_chunk_header(&mut cursor, data.len())?;
    if header.id != HEADER_ID || header.length < 6 {
        return Err(FormatError::InvalidHeader);
    }
    if (data.len() as u64) < cursor.position() + header.length as u64 {
        return Err(FormatError::UnexpectedEof);
    }
    let body = HeaderBody::read_be(&mut cursor)?;
    cursor.set_position(8 + header.length as u64);

    if body.format > 1 {
        return Err(FormatError::UnsupportedFormat(body.format));
    }
    if body.division & 0x8000 != 0 {
        return Err(FormatError::UnsupportedDivision(body.division));
    }

    let mut tracks = Vec::with_capacity(body.track_count as usize);
    while (cursor.position() as usize) < data.len() {
        let chunk = read_chunk_header(&mut cursor, data.len())?;
        let start = cursor.position() as usize;
        let end = start
            .checked_add(chunk.length as usize)
            .filter(|&end| end <= data.len())
            .ok_or(FormatError::UnexpectedEof)?;
        if chunk.id == TRACK_ID {
            tracks.push(parse_track(&data[start..end])?);
        } else {
            log::debug!(target: "smf", "skipping unknown chunk {:?}", String::from_utf8_lossy(&chunk.id));
        }
        cursor.set_position(end as u64);
    }

    if tracks.len() != body.track_count as usize {
        log::warn!(target: "smf", "header declares {} tracks, found {}", body.track_count, tracks.len());
    }

    Ok(SmfFile { format: body.format, division: body.division, tracks })
}

fn read_chunk_header(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<ChunkHeader, FormatError> {
    if (cursor.position() as usize).saturating_add(8) > len {
        return Err(FormatError::UnexpectedEof);
    }
    Ok(ChunkHeader::read_be(cursor)?)
}

fn next_byte(bytes: &[u8], pos: &mut usize) -> Result<u8, FormatError> {
    let byte = *bytes.get(*pos).ok_or(FormatError::UnexpectedEof)?;
    *pos += 1;
    Ok(byte)
}

fn take<'a>(bytes: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8], FormatError> {
    let end = pos.checked_add(len).filter(|&end| end <= bytes.len()).ok_or(FormatError::UnexpectedEof)?;
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}

fn parse_track(bytes: &[u8]) -> Result<SmfTrack, FormatError> {
    let mut track = SmfTrack::default();
    let mut pos = 0;
    let mut tick: u32 = 0;
    let mut pending_delta: u32 = 0;
    let mut running_status: Option<u8> = None;

    while pos < bytes.len() {
        let delta = read_vlq(bytes, &mut pos)?;
        tick = tick.saturating_add(delta);
        pending_delta = pending_delta.saturating_add(delta);

        let first = *bytes.get(pos).ok_or(FormatError::UnexpectedEof)?;
        let status = if first & 0x80 != 0 {
            pos += 1;
            first
        } else {
            running_status.ok_or(FormatError::UnexpectedStatus(first))?
        };

        let kind = match status {
            META => {
                running_status = None;
                let meta_type = next_byte(bytes, &mut pos)?;
                let len = read_vlq(bytes, &mut pos)? as usize;
                let data = take(bytes, &mut pos, len)?;
                match (meta_type, data) {
                    (META_END_OF_TRACK, _) => Some(SmfEventKind::EndOfTrack),
                    (META_TEMPO, [a, b, c]) => Some(SmfEventKind::Tempo(u32::from_be_bytes([0, *a, *b, *c]))),
                    (META_TIME_SIGNATURE, [n, d, c, b, ..]) => Some(SmfEventKind::TimeSignature {
                        numerator: *n,
                        denominator_pow2: *d,
                        clocks_per_click: *c,
                        thirty_seconds_per_quarter: *b,
                    }),
                    _ => Some(SmfEventKind::Meta { meta_type, data: data.to_vec() }),
                }
            }
            0xF0 | 0xF7 => {
                running_status = None;
                let len = read_vlq(bytes, &mut pos)? as usize;
                Some(SmfEventKind::SysEx(take(bytes, &mut pos, len)?.to_vec()))
            }
            0x80..=0xEF => {
                running_status = Some(status);
                parse_channel_message(bytes, &mut pos, status)?
            }
            _ => return Err(FormatError::UnexpectedStatus(status)),
        };

        if let Some(kind) = kind {
            let end = kind == SmfEventKind::EndOfTrack;
            track.events.push(SmfEvent { delta: pending_delta, tick, kind });
            pending_delta = 0;
            if end {
                break;
            }
        }
    }

    Ok(track)
}

/// Decode one channel voice message. Kinds the sequencer does not use
/// (aftertouch, pitch bend) are consumed and yield `None`.
fn parse_channel_message(bytes: &[u8], pos: &mut usize, status: u8) -> Result<Option<SmfEventKind>, FormatError> {
    let channel = status & 0x0F;
    let kind = match status & 0xF0 {
        0x80 => {
            let note = next_byte(bytes, pos)?;
            next_byte(bytes, pos)?;
            Some(EventKind::NoteOff { note })
        }
        0x90 => {
            let note = next_byte(bytes, pos)?;
            let velocity = next_byte(bytes, pos)?;
            if velocity == 0 {
                Some(EventKind::NoteOff { note })
            } else {
                Some(EventKind::NoteOn { note, velocity })
            }
        }
        0xB0 => {
            let controller = next_byte(bytes, pos)?;
            let value = next_byte(bytes, pos)?;
            Some(EventKind::ControlChange { controller, value })
        }
        0xC0 => Some(EventKind::ProgramChange { program: next_byte(bytes, pos)? }),
        0xD0 => {
            next_byte(bytes, pos)?;
            None
        }
        // 0xA0 poly aftertouch, 0xE0 pitch bend
        _ => {
            take(bytes, pos, 2)?;
            None
        }
    };
    Ok(kind.map(|kind| SmfEventKind::Channel { channel, kind }))
}
