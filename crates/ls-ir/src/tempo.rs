//! Global tempo and the timing constants derived from it.

pub const MIN_BPM: u16 = 20;
pub const MAX_BPM: u16 = 300;
pub const DEFAULT_BPM: u16 = 120;

const NANOS_PER_MINUTE: u64 = 60_000_000_000;
const MICROS_PER_MINUTE: u32 = 60_000_000;
const NANOS_PER_MILLI: u64 = 1_000_000;

/// Shortest sampling interval, in nanoseconds.
pub const MIN_SAMPLING_INTERVAL: u64 = NANOS_PER_MILLI;
/// Longest sampling interval, in nanoseconds.
pub const MAX_SAMPLING_INTERVAL: u64 = 5 * NANOS_PER_MILLI;

/// Tempo in whole beats per minute, always within `MIN_BPM..=MAX_BPM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "u16", into = "u16"))]
pub struct Tempo(u16);

impl Tempo {
    /// Build a tempo, clamping out-of-range values.
    pub fn clamped(bpm: i32) -> Self {
        Self(bpm.clamp(MIN_BPM as i32, MAX_BPM as i32) as u16)
    }

    pub const fn bpm(self) -> u16 {
        self.0
    }

    /// True if `bpm` would be clamped.
    pub fn is_out_of_range(bpm: i32) -> bool {
        bpm < MIN_BPM as i32 || bpm > MAX_BPM as i32
    }

    /// Tempo nudged by `delta` BPM, clamped.
    pub fn nudged(self, delta: i32) -> Self {
        Self::clamped(self.0 as i32 + delta)
    }

    pub const fn nanos_per_beat(self) -> u64 {
        NANOS_PER_MINUTE / self.0 as u64
    }

    pub const fn nanos_per_tick(self, ticks_per_beat: u32) -> u64 {
        NANOS_PER_MINUTE / (self.0 as u64 * ticks_per_beat as u64)
    }

    /// Whole ticks elapsed after `nanos` at this tempo.
    ///
    /// Computed from the exact ratio rather than a truncated tick length, so
    /// a quarter second at 120 BPM / 480 ppq is exactly 240 ticks.
    pub fn ticks_in(self, nanos: u64, ticks_per_beat: u32) -> u64 {
        let ticks = nanos as u128 * self.0 as u128 * ticks_per_beat as u128 / NANOS_PER_MINUTE as u128;
        ticks as u64
    }

    /// Shortest span in nanoseconds that contains `beats` whole beats.
    pub fn nanos_for_beats(self, beats: u64) -> u64 {
        (beats as u128 * NANOS_PER_MINUTE as u128).div_ceil(self.0 as u128) as u64
    }

    /// Microseconds per quarter note, as stored in a tempo meta event.
    pub const fn micros_per_beat(self) -> u32 {
        MICROS_PER_MINUTE / self.0 as u32
    }

    /// Player sampling period: half a tick, bounded to 1..=5 ms.
    pub fn sampling_interval(self, ticks_per_beat: u32) -> u64 {
        (self.nanos_per_tick(ticks_per_beat) / 2).clamp(MIN_SAMPLING_INTERVAL, MAX_SAMPLING_INTERVAL)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(DEFAULT_BPM)
    }
}

impl From<u16> for Tempo {
    fn from(bpm: u16) -> Self {
        Self::clamped(bpm as i32)
    }
}

impl From<Tempo> for u16 {
    fn from(tempo: Tempo) -> Self {
        tempo.0
    }
}

impl core::fmt::Display for Tempo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}
