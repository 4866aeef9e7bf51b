use super::command::Job;

use std::cmp::Ordering;
use std::time::Instant;

/// An entry in the reactor timer queue.
///
/// `TimerEntry` represents a job scheduled to run at a specific
/// deadline. It is stored inside a binary heap ordered by deadline.
/// Timers are fire-once and never cancelled: a job that finds its work
/// already done simply does nothing.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    pub(crate) deadline: Instant,

    /// Insertion order, breaking ties between equal deadlines.
    pub(crate) sequence: u64,

    /// Job to run when the deadline is reached.
    pub(crate) job: Job,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.sequence == other.sequence
    }
}

impl Ord for TimerEntry {
    /// Orders timer entries by deadline, then by insertion order.
    ///
    /// Note that the comparison is **reversed** so that a
    /// `BinaryHeap<TimerEntry>` behaves as a min-heap,
    /// where the earliest deadline is popped first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
