//! Session configuration and the policies that remain open choices.

use crate::geometry::LoopGeometry;
use crate::tempo::Tempo;
use crate::track::DEFAULT_TRACK_CAPACITY;

/// When an active recording stops on its own.
///
/// `beats_recorded` counts every beat boundary crossed while recording,
/// including the one recording started on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AutoStop {
    /// Stop once `beats_recorded >= total_beats`: the final beat of the loop is cut.
    AtLimit,
    /// Stop once `beats_recorded > total_beats`: exactly one full loop is captured.
    #[default]
    PastLimit,
}

impl AutoStop {
    pub fn reached(self, beats_recorded: u32, total_beats: u32) -> bool {
        match self {
            AutoStop::AtLimit => beats_recorded >= total_beats,
            AutoStop::PastLimit => beats_recorded > total_beats,
        }
    }
}

/// Whether the channel being recorded keeps playing back during a take.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RecordingChannelPlayback {
    /// Play every track, including the one being recorded
    Play,
    /// Skip the recording channel so fresh input is not triggered twice
    #[default]
    Mute,
}

/// What happens to the active track when a take begins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RecordMode {
    /// Append to existing events
    #[default]
    Overdub,
    /// Clear the track on the beat recording starts
    Replace,
}

/// Everything a session needs to know before it starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    pub geometry: LoopGeometry,
    pub tempo: Tempo,
    /// Events each track can hold
    pub track_capacity: usize,
    pub auto_stop: AutoStop,
    pub recording_channel: RecordingChannelPlayback,
    pub record_mode: RecordMode,
    /// Click on every beat
    pub metronome: bool,
    /// Quantize from the first take
    pub quantize: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            geometry: LoopGeometry::default(),
            tempo: Tempo::default(),
            track_capacity: DEFAULT_TRACK_CAPACITY,
            auto_stop: AutoStop::default(),
            recording_channel: RecordingChannelPlayback::default(),
            record_mode: RecordMode::default(),
            metronome: true,
            quantize: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_stop_boundaries_differ_by_one_beat() {
        assert!(!AutoStop::AtLimit.reached(15, 16));
        assert!(AutoStop::AtLimit.reached(16, 16));
        assert!(!AutoStop::PastLimit.reached(16, 16));
        assert!(AutoStop::PastLimit.reached(17, 16));
    }

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.tempo.bpm(), 120);
        assert_eq!(config.geometry.total_beats(), 16);
        assert_eq!(config.track_capacity, DEFAULT_TRACK_CAPACITY);
        assert_eq!(config.auto_stop, AutoStop::PastLimit);
        assert_eq!(config.recording_channel, RecordingChannelPlayback::Mute);
    }
}
