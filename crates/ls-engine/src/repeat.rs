//! Hold-to-repeat for tempo and program nudges.

use crate::timer_queue::TimerHandle;

/// Wait before the first repeat.
pub const REPEAT_DELAY: u64 = 300_000_000;
/// Wait between later repeats.
pub const REPEAT_INTERVAL: u64 = 100_000_000;

/// Value a held key keeps nudging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NudgeTarget {
    Tempo,
    Program,
}

impl NudgeTarget {
    fn slot(self) -> usize {
        match self {
            NudgeTarget::Tempo => 0,
            NudgeTarget::Program => 1,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Held {
    delta: i32,
    timer: TimerHandle,
}

/// Which nudges are held, and the timer driving each.
#[derive(Clone, Debug, Default)]
pub struct AutoRepeat {
    held: [Option<Held>; 2],
}

impl AutoRepeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start holding `target`. Returns the timer of a previous hold to cancel.
    pub fn press(&mut self, target: NudgeTarget, delta: i32, timer: TimerHandle) -> Option<TimerHandle> {
        self.held[target.slot()].replace(Held { delta, timer }).map(|h| h.timer)
    }

    /// Stop holding `target`. Returns its timer to cancel.
    pub fn release(&mut self, target: NudgeTarget) -> Option<TimerHandle> {
        self.held[target.slot()].take().map(|h| h.timer)
    }

    /// Delta to apply when `timer` fires for `target`, if it is still the live hold.
    pub fn delta_for(&self, target: NudgeTarget, timer: TimerHandle) -> Option<i32> {
        self.held[target.slot()].filter(|h| h.timer == timer).map(|h| h.delta)
    }

    /// Point `target` at its rescheduled timer.
    pub fn rearm(&mut self, target: NudgeTarget, timer: TimerHandle) {
        if let Some(held) = self.held[target.slot()].as_mut() {
            held.timer = timer;
        }
    }

    pub fn is_held(&self, target: NudgeTarget) -> bool {
        self.held[target.slot()].is_some()
    }

    /// Forget every hold; their timers are assumed cancelled.
    pub fn clear(&mut self) {
        self.held = [None; 2];
    }
}
