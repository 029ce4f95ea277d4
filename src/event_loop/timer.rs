use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;
use std::time::Instant;

/// An entry in the loop's timer queue.
///
/// `TimerEntry` represents a one-shot callback scheduled for a specific
/// deadline, stored inside a `BinaryHeap` ordered by deadline.
///
/// Entries carry a sequence number so that timers sharing a deadline fire
/// in the order they were scheduled.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    pub(crate) deadline: Instant,

    /// Scheduling order, used to break deadline ties.
    pub(crate) seq: u64,

    /// Callback to run once the deadline is reached.
    pub(crate) callback: Box<dyn FnOnce()>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    /// Two timer entries are equal if deadline and sequence are equal.
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Orders timer entries by deadline, then by scheduling order.
    ///
    /// Note that the comparison is **reversed** so that a
    /// `BinaryHeap<TimerEntry>` behaves as a min-heap, where the earliest
    /// deadline is popped first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    /// Partial ordering consistent with [`Ord`].
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Handle to a running interval.
///
/// Returned by [`EventLoop::set_interval`](super::EventLoop::set_interval).
/// The handle owns the shared "active" flag the re-arming closure consults
/// before every invocation and before every re-arm. Dropping the handle
/// does **not** stop the interval; call [`cancel`](Self::cancel).
pub struct IntervalHandle {
    /// Flag shared with the interval's re-arming closure.
    pub(crate) active: Rc<Cell<bool>>,
}

impl IntervalHandle {
    /// Stops the interval.
    ///
    /// An invocation that is already queued still reaches its flag check
    /// and is suppressed there; no further re-arm occurs. Cancelling twice
    /// is a no-op.
    pub fn cancel(&self) {
        self.active.set(false);
    }

    /// Whether the interval is still re-arming itself.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}
