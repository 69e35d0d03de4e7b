//! Loop-aware playback of recorded tracks.

use core::ops::Range;
use ls_ir::{MidiMessage, Tick, TrackBank};

/// Tick range(s) covered by one sampling pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Window {
    /// Clock has not moved forward
    Empty,
    Span(Range<Tick>),
    /// The loop wrapped: tail of the previous pass, then head of the new one
    Wrapped(Range<Tick>, Range<Tick>),
}

/// Tracks the last sampled tick and emits events falling in each new window.
#[derive(Clone, Debug, Default)]
pub struct Player {
    last_tick: Tick,
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_tick(&self) -> Tick {
        self.last_tick
    }

    /// Forget the sampling position. Called when the clock starts.
    pub fn reset(&mut self) {
        self.last_tick = 0;
    }

    /// Compute the window from the last sampled tick to `current`.
    ///
    /// A backward step of more than half a loop is a wrap. A smaller one is
    /// clock jitter: nothing is covered and the last tick is kept.
    pub fn advance(&mut self, current: Tick, total: Tick) -> Window {
        let last = self.last_tick;
        let window = if current >= last {
            if current == last {
                Window::Empty
            } else {
                Window::Span(last..current)
            }
        } else if last - current > total / 2 {
            Window::Wrapped(last..total, 0..current)
        } else {
            return Window::Empty;
        };
        self.last_tick = current;
        window
    }

    /// Sample at `current` and send every event in the new window.
    ///
    /// Events on `muted` are skipped. Returns the number of messages emitted.
    pub fn dispatch(
        &mut self,
        tracks: &TrackBank,
        current: Tick,
        total: Tick,
        muted: Option<u8>,
        mut emit: impl FnMut(MidiMessage),
    ) -> usize {
        match self.advance(current, total) {
            Window::Empty => 0,
            Window::Span(range) => emit_range(tracks, range, muted, &mut emit),
            Window::Wrapped(tail, head) => {
                emit_range(tracks, tail, muted, &mut emit) + emit_range(tracks, head, muted, &mut emit)
            }
        }
    }
}

fn emit_range(tracks: &TrackBank, range: Range<Tick>, muted: Option<u8>, emit: &mut impl FnMut(MidiMessage)) -> usize {
    let mut sent = 0;
    for track in tracks.iter() {
        if Some(track.channel()) == muted {
            continue;
        }
        for event in track.events() {
            if range.contains(&event.tick) {
                emit(event.on_channel(track.channel()));
                sent += 1;
            }
        }
    }
    sent
}
