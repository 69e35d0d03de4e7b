//! Loop geometry: how ticks, beats and bars fit into one loop pass.
//!
//! A loop has a fixed number of bars. Every position inside it is a
//! [`Tick`] in `0..total_loop_ticks()`.

/// Position within one loop pass.
pub type Tick = u32;

/// Standard MIDI resolution (pulses per quarter note).
pub const DEFAULT_TICKS_PER_BEAT: u32 = 480;

/// Sixteenth notes per beat; the quantization grid.
pub const GRID_DIVISIONS_PER_BEAT: u32 = 4;

/// Largest resolution a metrical SMF division can carry.
pub const MAX_TICKS_PER_BEAT: u32 = 0x7FFF;

/// Largest numerator a time signature meta event can carry.
pub const MAX_BEATS_PER_BAR: u32 = 255;

/// Fixed shape of the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoopGeometry {
    /// Ticks per beat (and per quarter note in the exported file)
    pub ticks_per_beat: u32,
    /// Beats per bar (time signature numerator)
    pub beats_per_bar: u32,
    /// Bars per loop
    pub total_bars: u32,
}

impl Default for LoopGeometry {
    fn default() -> Self {
        Self {
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            beats_per_bar: 4,
            total_bars: 4,
        }
    }
}

impl LoopGeometry {
    pub const fn new(ticks_per_beat: u32, beats_per_bar: u32, total_bars: u32) -> Self {
        Self { ticks_per_beat, beats_per_bar, total_bars }
    }

    /// Check that every field is usable, returning what is wrong if not.
    pub fn check(&self) -> Result<(), &'static str> {
        if !(1..=MAX_TICKS_PER_BEAT).contains(&self.ticks_per_beat) {
            return Err("ticks_per_beat must be within 1..=32767");
        }
        if !(1..=MAX_BEATS_PER_BAR).contains(&self.beats_per_bar) {
            return Err("beats_per_bar must be within 1..=255");
        }
        if self.total_bars == 0 {
            return Err("total_bars must be at least 1");
        }
        let loop_ticks = self
            .ticks_per_beat
            .checked_mul(self.beats_per_bar)
            .and_then(|t| t.checked_mul(self.total_bars));
        if loop_ticks.is_none() {
            return Err("loop is too long");
        }
        Ok(())
    }

    /// Pull every field into the range [`check`](Self::check) accepts.
    pub fn clamped(self) -> Self {
        let ticks_per_beat = self.ticks_per_beat.clamp(1, MAX_TICKS_PER_BEAT);
        let beats_per_bar = self.beats_per_bar.clamp(1, MAX_BEATS_PER_BAR);
        let max_bars = u32::MAX / (ticks_per_beat * beats_per_bar);
        Self { ticks_per_beat, beats_per_bar, total_bars: self.total_bars.clamp(1, max_bars) }
    }

    /// Beats in one loop pass.
    pub const fn total_beats(&self) -> u32 {
        self.beats_per_bar * self.total_bars
    }

    /// Ticks in one loop pass.
    pub const fn total_loop_ticks(&self) -> u32 {
        self.ticks_per_beat * self.total_beats()
    }

    /// Ticks per sixteenth note.
    pub const fn grid(&self) -> u32 {
        self.ticks_per_beat / GRID_DIVISIONS_PER_BEAT
    }

    /// Tick at which `beat` starts.
    pub const fn beat_start(&self, beat: u32) -> Tick {
        (beat % self.total_beats()) * self.ticks_per_beat
    }

    /// 1-based bar number containing `beat`.
    pub const fn bar_of(&self, beat: u32) -> u32 {
        beat / self.beats_per_bar + 1
    }

    /// 1-based beat within its bar.
    pub const fn beat_in_bar(&self, beat: u32) -> u32 {
        beat % self.beats_per_bar + 1
    }

    /// True when `beat` is the first beat of a bar.
    pub const fn is_downbeat(&self, beat: u32) -> bool {
        beat % self.beats_per_bar == 0
    }

    /// Snap `tick` to the nearest sixteenth, rounding halves up, wrapping
    /// ticks that round past the loop end back to 0.
    ///
    /// Idempotent: a tick already on the grid is returned unchanged.
    pub fn quantize(&self, tick: Tick) -> Tick {
        let grid = self.grid();
        if grid == 0 {
            return tick;
        }
        let snapped = (tick + grid / 2) / grid * grid;
        snapped % self.total_loop_ticks()
    }

    /// Reduce an arbitrary absolute tick into the loop.
    pub fn wrap(&self, tick: u64) -> Tick {
        (tick % self.total_loop_ticks() as u64) as Tick
    }
}
