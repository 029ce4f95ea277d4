//! The event loop.
//!
//! This module implements the scheduler at the center of the crate.
//! The loop owns four event sources:
//! - next-tick callbacks, drained one batch per tick,
//! - timers, fired in deadline order,
//! - readable-stream watches,
//! - writable-stream watches,
//!
//! and drives them with a single blocking readiness poll that waits at
//! most until the nearest timer deadline.
//!
//! There is no ambient global loop: `EventLoop` is a cheaply clonable
//! handle, and everything that needs scheduling (promises, coroutines)
//! takes one explicitly. Fresh loop per test, no hidden state.
//!
//! The loop applies no blanket recovery to user callbacks: a panicking
//! callback propagates out of [`run`](EventLoop::run) / [`tick`](EventLoop::tick).

mod poller;
mod timer;

pub use poller::StreamId;
pub use timer::IntervalHandle;

use timer::TimerEntry;

use std::cell::{Cell, RefCell};
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

/// Callback watching a stream, re-invoked on every readiness notification.
type WatchFn = Rc<RefCell<dyn FnMut()>>;

/// A single-threaded cooperative event loop.
///
/// Cloning the handle is cheap and every clone drives the same loop.
///
/// # Examples
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
/// use tactus::EventLoop;
///
/// let lp = EventLoop::new();
/// let fired = Rc::new(Cell::new(false));
///
/// let flag = fired.clone();
/// lp.set_timeout(move || flag.set(true), Duration::from_millis(5));
///
/// lp.run();
/// assert!(fired.get());
/// ```
pub struct EventLoop {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    /// Whether a `run` call is currently active.
    running: bool,

    /// Callbacks for the next tick, in scheduling order.
    next_tick: VecDeque<Box<dyn FnOnce()>>,

    /// Pending timers, earliest deadline first.
    timers: BinaryHeap<TimerEntry>,

    /// Source of timer sequence numbers, for deadline ties.
    timer_seq: u64,

    /// Watches fired when their stream becomes readable.
    read_watches: HashMap<StreamId, WatchFn>,

    /// Watches fired when their stream becomes writable.
    write_watches: HashMap<StreamId, WatchFn>,
}

impl Clone for EventLoop {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    /// Creates a new, empty event loop.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                running: false,
                next_tick: VecDeque::new(),
                timers: BinaryHeap::new(),
                timer_seq: 0,
                read_watches: HashMap::new(),
                write_watches: HashMap::new(),
            })),
        }
    }

    /// Schedules a callback to run at the next iteration of the loop.
    ///
    /// Callbacks run in scheduling order. A callback scheduled from within
    /// the current tick's drain runs in the *next* tick, never recursively
    /// within the same one.
    pub fn next_tick(&self, callback: impl FnOnce() + 'static) {
        self.inner.borrow_mut().next_tick.push_back(Box::new(callback));
    }

    /// Schedules a callback to run once, after `delay` has elapsed.
    ///
    /// One-shot timeouts cannot be cancelled; use
    /// [`set_interval`](Self::set_interval) when cancellation is needed.
    pub fn set_timeout(&self, callback: impl FnOnce() + 'static, delay: Duration) {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.timer_seq;
        inner.timer_seq += 1;
        inner.timers.push(TimerEntry {
            deadline: Instant::now() + delay,
            seq,
            callback: Box::new(callback),
        });
    }

    /// Schedules a callback to run every `period`.
    ///
    /// The interval is a timeout that re-arms itself. The shared active
    /// flag owned by the returned [`IntervalHandle`] is consulted before
    /// every invocation and before every re-arm, so a cancelled interval
    /// neither runs nor re-arms again.
    pub fn set_interval(
        &self,
        callback: impl FnMut() + 'static,
        period: Duration,
    ) -> IntervalHandle {
        let active = Rc::new(Cell::new(true));
        let handle = IntervalHandle {
            active: Rc::clone(&active),
        };
        self.arm_interval(Rc::new(RefCell::new(callback)), period, active);
        handle
    }

    fn arm_interval(
        &self,
        callback: Rc<RefCell<dyn FnMut()>>,
        period: Duration,
        active: Rc<Cell<bool>>,
    ) {
        let lp = self.clone();
        self.set_timeout(
            move || {
                if !active.get() {
                    return;
                }
                (*callback.borrow_mut())();
                if active.get() {
                    lp.arm_interval(callback, period, active);
                }
            },
            period,
        );
    }

    /// Starts watching a stream for readability.
    ///
    /// The callback runs once per readiness notification, for as long as
    /// the watch is registered. You MUST call
    /// [`remove_read_stream`](Self::remove_read_stream) when done with the
    /// stream; a leaked watch keeps the loop alive forever.
    ///
    /// Watching a stream that is already watched replaces its callback.
    pub fn add_read_stream(&self, stream: StreamId, callback: impl FnMut() + 'static) {
        log::trace!("watching stream {stream} for reads");
        self.inner
            .borrow_mut()
            .read_watches
            .insert(stream, Rc::new(RefCell::new(callback)));
    }

    /// Starts watching a stream for writability.
    ///
    /// The callback runs as soon as the system reports the stream ready to
    /// accept writes, once per notification. You MUST call
    /// [`remove_write_stream`](Self::remove_write_stream) when done with
    /// the stream; a leaked watch keeps the loop alive forever.
    ///
    /// Watching a stream that is already watched replaces its callback.
    pub fn add_write_stream(&self, stream: StreamId, callback: impl FnMut() + 'static) {
        log::trace!("watching stream {stream} for writes");
        self.inner
            .borrow_mut()
            .write_watches
            .insert(stream, Rc::new(RefCell::new(callback)));
    }

    /// Stops watching a stream for readability.
    pub fn remove_read_stream(&self, stream: StreamId) {
        log::trace!("unwatching stream {stream} for reads");
        self.inner.borrow_mut().read_watches.remove(&stream);
    }

    /// Stops watching a stream for writability.
    pub fn remove_write_stream(&self, stream: StreamId) {
        log::trace!("unwatching stream {stream} for writes");
        self.inner.borrow_mut().write_watches.remove(&stream);
    }

    /// Runs the loop until there is nothing left to do.
    ///
    /// Ticks continuously until all four event sources are empty after a
    /// tick, or [`stop`](Self::stop) is called.
    pub fn run(&self) {
        log::debug!("event loop started");
        self.inner.borrow_mut().running = true;

        loop {
            let has_events = self.tick(true);
            if !self.inner.borrow().running || !has_events {
                break;
            }
        }

        self.inner.borrow_mut().running = false;
        log::debug!("event loop finished");
    }

    /// Performs one iteration of the loop.
    ///
    /// One tick: drain the current next-tick batch, fire every timer that
    /// is already due, then poll watched streams and invoke the callback
    /// of each ready stream once. With `block` the poll waits at most
    /// until the nearest timer deadline; without it the poll never waits.
    ///
    /// Returns whether *any* event source is still non-empty afterward.
    pub fn tick(&self, block: bool) -> bool {
        self.run_next_ticks();
        let next_timeout = self.run_timers();

        let wait = if !block || !self.inner.borrow().next_tick.is_empty() {
            // Either the caller refuses to block, or a timer callback has
            // queued work for the next tick; don't wait on I/O.
            Some(Duration::ZERO)
        } else {
            // Wait until the nearest timer, or indefinitely without one.
            next_timeout
        };

        self.run_streams(wait);

        self.has_work()
    }

    /// Stops a running loop.
    ///
    /// Takes effect at the next iteration boundary: the in-flight tick
    /// still completes.
    pub fn stop(&self) {
        self.inner.borrow_mut().running = false;
    }

    /// Executes the callbacks queued for this tick.
    ///
    /// The queue is snapshotted first: callbacks queued during the drain
    /// land in the next batch.
    fn run_next_ticks(&self) {
        let batch = std::mem::take(&mut self.inner.borrow_mut().next_tick);
        for callback in batch {
            callback();
        }
    }

    /// Fires every timer already due, earliest first.
    ///
    /// Only timers due at entry to this phase fire: a callback that
    /// re-schedules itself with a zero delay runs again on the next tick,
    /// not within this one. Returns the wait until the next pending timer,
    /// or `None` if no timers remain.
    fn run_timers(&self) -> Option<Duration> {
        let now = Instant::now();
        loop {
            let due = {
                let mut inner = self.inner.borrow_mut();
                if inner.timers.peek().is_some_and(|e| e.deadline <= now) {
                    inner.timers.pop()
                } else {
                    None
                }
            };
            match due {
                Some(entry) => (entry.callback)(),
                None => break,
            }
        }

        let inner = self.inner.borrow();
        inner
            .timers
            .peek()
            .map(|e| e.deadline.saturating_duration_since(Instant::now()))
    }

    /// Polls watched streams and dispatches readiness callbacks.
    ///
    /// With nothing watched, a finite wait is slept out instead (the next
    /// timer will be due by then); an indefinite wait with nothing watched
    /// returns immediately, since nothing could ever wake the poll.
    fn run_streams(&self, timeout: Option<Duration>) {
        let (read, write) = {
            let inner = self.inner.borrow();
            (
                inner.read_watches.keys().copied().collect::<Vec<_>>(),
                inner.write_watches.keys().copied().collect::<Vec<_>>(),
            )
        };

        if read.is_empty() && write.is_empty() {
            if let Some(wait) = timeout {
                if !wait.is_zero() {
                    thread::sleep(wait);
                }
            }
            return;
        }

        let mut events = Vec::new();
        if let Err(err) = poller::poll_streams(&read, &write, timeout, &mut events) {
            log::warn!("stream poll failed: {err}");
            return;
        }

        for event in events {
            if event.readable {
                // Cloned out of the map so the callback can freely remove
                // watches, including its own.
                let watch = self.inner.borrow().read_watches.get(&event.stream).cloned();
                if let Some(watch) = watch {
                    (*watch.borrow_mut())();
                }
            }
            if event.writable {
                let watch = self.inner.borrow().write_watches.get(&event.stream).cloned();
                if let Some(watch) = watch {
                    (*watch.borrow_mut())();
                }
            }
        }
    }

    /// Whether any event source still holds work.
    fn has_work(&self) -> bool {
        let inner = self.inner.borrow();
        !inner.next_tick.is_empty()
            || !inner.timers.is_empty()
            || !inner.read_watches.is_empty()
            || !inner.write_watches.is_empty()
    }
}
