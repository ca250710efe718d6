//! Delayed one-shot actions for simulated joins, AI votes, and AI chat replies.
//!
//! Every entry carries the generation that was current when it was queued. The
//! round bumps its generation on each phase change and on exit, so an entry that
//! comes due after its phase has ended no longer matches and is dropped by the
//! caller instead of being applied.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use contracts::{Phase, ScheduledAction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEntry {
    pub fire_at_tick: u64,
    pub sequence: u64,
    pub generation: u64,
    pub action: ScheduledAction,
}

/// Ordering: (fire_at_tick ASC, sequence ASC). Same-tick entries fire in the
/// order they were queued.
#[derive(Debug, Clone, Eq, PartialEq)]
struct OrderedEntry(ScheduledEntry);

impl PartialOrd for OrderedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .fire_at_tick
            .cmp(&other.0.fire_at_tick)
            .then_with(|| self.0.sequence.cmp(&other.0.sequence))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schedule {
    queue: BinaryHeap<Reverse<OrderedEntry>>,
    next_sequence: u64,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, fire_at_tick: u64, generation: u64, action: ScheduledAction) {
        let entry = ScheduledEntry {
            fire_at_tick,
            sequence: self.next_sequence,
            generation,
            action,
        };
        self.next_sequence = self.next_sequence.saturating_add(1);
        self.queue.push(Reverse(OrderedEntry(entry)));
    }

    /// Removes and returns every entry due at or before `tick`, in firing order.
    pub fn pop_due(&mut self, tick: u64) -> Vec<ScheduledEntry> {
        let mut due = Vec::new();
        while let Some(next) = self.queue.peek() {
            if next.0 .0.fire_at_tick > tick {
                break;
            }
            match self.queue.pop() {
                Some(Reverse(OrderedEntry(entry))) => due.push(entry),
                None => break,
            }
        }
        due
    }

    pub fn peek_next_tick(&self) -> Option<u64> {
        self.queue.peek().map(|entry| entry.0 .0.fire_at_tick)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Pending entries in no particular order.
    pub fn pending(&self) -> impl Iterator<Item = &ScheduledEntry> {
        self.queue.iter().map(|entry| &entry.0 .0)
    }
}

/// Why a due entry must not be applied, if it must not.
pub fn staleness(entry: &ScheduledEntry, generation: u64, phase: Phase) -> Option<&'static str> {
    if entry.generation != generation {
        return Some("generation_mismatch");
    }
    if entry.action.active_phase() != phase {
        return Some("phase_ended");
    }
    None
}
