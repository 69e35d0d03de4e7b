//! Priority queue of scheduled tasks with cancellable handles.

use alloc::collections::BinaryHeap;
use core::cmp::Ordering;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle returned by [`TimerQueue::schedule`], used to cancel a timer.
    pub struct TimerHandle;
}

/// Heap entry. Ordered so the earliest deadline (then the earliest
/// scheduled) sits on top of the max-heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    fire_time: u64,
    seq: u64,
    handle: TimerHandle,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Tasks keyed by deadline in nanoseconds.
///
/// Cancelling removes the task from the slot map; its heap entry is left
/// behind and skipped when it surfaces.
#[derive(Debug)]
pub struct TimerQueue<T> {
    tasks: SlotMap<TimerHandle, T>,
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self { tasks: SlotMap::with_key(), heap: BinaryHeap::new(), next_seq: 0 }
    }

    /// Schedule `task` to fire at `fire_time`.
    pub fn schedule(&mut self, fire_time: u64, task: T) -> TimerHandle {
        let handle = self.tasks.insert(task);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { fire_time, seq, handle });
        handle
    }

    /// Cancel a pending timer. Returns its task if it had not fired yet.
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        self.tasks.remove(handle)
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
        self.heap.clear();
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.tasks.contains_key(handle)
    }

    /// Number of live (uncancelled, unfired) timers.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Deadline of the earliest live timer.
    pub fn next_deadline(&mut self) -> Option<u64> {
        self.discard_cancelled();
        self.heap.peek().map(|e| e.fire_time)
    }

    /// Remove and return the earliest timer whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<(u64, TimerHandle, T)> {
        self.discard_cancelled();
        let entry = *self.heap.peek()?;
        if entry.fire_time > now {
            return None;
        }
        self.heap.pop();
        let task = self.tasks.remove(entry.handle)?;
        Some((entry.fire_time, entry.handle, task))
    }

    fn discard_cancelled(&mut self) {
        while let Some(entry) = self.heap.peek() {
            if self.tasks.contains_key(entry.handle) {
                break;
            }
            self.heap.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(30, 'c');
        q.schedule(10, 'a');
        q.schedule(20, 'b');
        assert_eq!(q.next_deadline(), Some(10));
        assert_eq!(q.pop_due(100).map(|(t, _, v)| (t, v)), Some((10, 'a')));
        assert_eq!(q.pop_due(100).map(|(t, _, v)| (t, v)), Some((20, 'b')));
        assert_eq!(q.pop_due(100).map(|(t, _, v)| (t, v)), Some((30, 'c')));
        assert!(q.pop_due(100).is_none());
    }

    #[test]
    fn equal_deadlines_fire_in_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule(5, 1);
        q.schedule(5, 2);
        q.schedule(5, 3);
        let order: alloc::vec::Vec<i32> = core::iter::from_fn(|| q.pop_due(5).map(|(_, _, v)| v)).collect();
        assert_eq!(order, [1, 2, 3]);
    }

    #[test]
    fn nothing_due_before_deadline() {
        let mut q = TimerQueue::new();
        q.schedule(50, ());
        assert!(q.pop_due(49).is_none());
        assert!(q.pop_due(50).is_some());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let a = q.schedule(10, 'a');
        q.schedule(20, 'b');
        assert_eq!(q.cancel(a), Some('a'));
        assert!(!q.is_pending(a));
        assert_eq!(q.next_deadline(), Some(20));
        assert_eq!(q.pop_due(100).map(|(_, _, v)| v), Some('b'));
        assert_eq!(q.cancel(a), None);
    }

    #[test]
    fn cancel_all_empties_queue() {
        let mut q = TimerQueue::new();
        q.schedule(1, ());
        q.schedule(2, ());
        q.cancel_all();
        assert!(q.is_empty());
        assert_eq!(q.next_deadline(), None);
    }
}
