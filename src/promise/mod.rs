//! Promises: single-assignment results of asynchronous operations.
//!
//! A [`Promise`] is created pending and settles exactly once, into either a
//! fulfillment value or a [`Rejection`] reason. Handlers registered with
//! [`then`](Promise::then) and friends are never invoked synchronously with
//! the settling call: they are scheduled on the owning [`EventLoop`]'s
//! next-tick queue, so resolution order is deterministic and re-entrant
//! resolution is impossible to observe.
//!
//! Promises are bound to an explicit loop handle at construction; there is
//! no ambient default loop.

mod combinator;

pub use combinator::{all, race, reject, resolve};

use crate::error::{PromiseError, Rejection};
use crate::event_loop::EventLoop;

use std::cell::RefCell;
use std::rc::Rc;

/// The observable state of a promise.
///
/// Once a promise leaves [`Pending`](PromiseState::Pending) it never
/// changes state again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    /// The asynchronous operation does not have a result yet.
    Pending,
    /// The asynchronous operation completed with a value.
    Fulfilled,
    /// The asynchronous operation completed with an error.
    Rejected,
}

/// A result that may not exist yet: either a plain value or a promise of
/// one.
///
/// Handlers passed to [`Promise::then`] return an `Awaitable`, which is how
/// a handler chooses between fulfilling the downstream promise immediately
/// and chaining it to another asynchronous operation. The coroutine adapter
/// yields `Awaitable`s for the same reason.
pub enum Awaitable<T> {
    /// The value is already available.
    Ready(T),
    /// The value will be the settlement of this promise.
    Pending(Promise<T>),
}

/// A continuation waiting on a promise's settlement.
pub(crate) type Subscriber<T> = Box<dyn FnOnce(Result<T, Rejection>)>;

/// Callback invoked when a pending promise is cancelled.
type CancelFn = Box<dyn FnOnce() -> Result<(), Rejection>>;

enum State<T> {
    /// Not settled yet; holds everything that reacts to settlement.
    Pending {
        subscribers: Vec<Subscriber<T>>,
        cancel_fn: Option<CancelFn>,
    },
    /// Terminal. The result is cloned into each subscriber.
    Settled(Result<T, Rejection>),
}

/// A single-assignment future bound to an [`EventLoop`].
///
/// The handle is cheap to clone and every clone refers to the same
/// underlying promise; holding a clone *is* the capability to settle it.
///
/// # Examples
///
/// ```rust
/// use tactus::{Awaitable, EventLoop, Promise};
///
/// let lp = EventLoop::new();
/// let promise: Promise<i32> = Promise::new(&lp);
/// let doubled = promise.then(|v| Ok(Awaitable::Ready(v * 2)));
///
/// promise.fulfill(21).unwrap();
/// assert_eq!(doubled.wait().unwrap(), 42);
/// ```
pub struct Promise<T> {
    state: Rc<RefCell<State<T>>>,
    event_loop: EventLoop,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            event_loop: self.event_loop.clone(),
        }
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// Creates a pending promise bound to the given loop.
    pub fn new(event_loop: &EventLoop) -> Self {
        Self {
            state: Rc::new(RefCell::new(State::Pending {
                subscribers: Vec::new(),
                cancel_fn: None,
            })),
            event_loop: event_loop.clone(),
        }
    }

    /// Creates a promise and runs `executor` synchronously with a clone of
    /// its handle, through which the executor can fulfill or reject it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tactus::{EventLoop, Promise};
    ///
    /// let lp = EventLoop::new();
    /// let promise = Promise::with_executor(&lp, |p| {
    ///     let _ = p.fulfill("hi");
    /// });
    /// assert_eq!(promise.wait().unwrap(), "hi");
    /// ```
    pub fn with_executor(event_loop: &EventLoop, executor: impl FnOnce(Promise<T>)) -> Self {
        let promise = Self::new(event_loop);
        executor(promise.clone());
        promise
    }

    /// Creates a pending promise with a cancellation callback.
    ///
    /// The callback runs exactly once if the promise is cancelled while
    /// pending. Returning an `Err` rejects the promise with that reason
    /// instead of the default [`Rejection::Cancelled`].
    pub fn with_canceller(
        event_loop: &EventLoop,
        on_cancel: impl FnOnce() -> Result<(), Rejection> + 'static,
    ) -> Self {
        let promise = Self::new(event_loop);
        if let State::Pending { cancel_fn, .. } = &mut *promise.state.borrow_mut() {
            *cancel_fn = Some(Box::new(on_cancel));
        }
        promise
    }

    /// Returns the current state.
    pub fn state(&self) -> PromiseState {
        match &*self.state.borrow() {
            State::Pending { .. } => PromiseState::Pending,
            State::Settled(Ok(_)) => PromiseState::Fulfilled,
            State::Settled(Err(_)) => PromiseState::Rejected,
        }
    }

    /// Marks this promise as fulfilled and sets its value.
    ///
    /// Every subscriber's fulfillment handler is scheduled on the loop;
    /// none runs synchronously with this call.
    ///
    /// # Errors
    ///
    /// [`PromiseError::AlreadySettled`] if the promise was fulfilled,
    /// rejected, or cancelled before.
    pub fn fulfill(&self, value: T) -> Result<(), PromiseError> {
        if self.settle(Ok(value)) {
            Ok(())
        } else {
            Err(PromiseError::AlreadySettled)
        }
    }

    /// Marks this promise as rejected and sets its rejection reason.
    ///
    /// Every subscriber's rejection handler is scheduled on the loop;
    /// none runs synchronously with this call.
    ///
    /// # Errors
    ///
    /// [`PromiseError::AlreadySettled`] if the promise was fulfilled,
    /// rejected, or cancelled before.
    pub fn reject(&self, reason: Rejection) -> Result<(), PromiseError> {
        if self.settle(Err(reason)) {
            Ok(())
        } else {
            Err(PromiseError::AlreadySettled)
        }
    }

    /// Registers a fulfillment handler and returns the downstream promise.
    ///
    /// The handler's return value drives the downstream promise:
    /// [`Awaitable::Ready`] fulfills it immediately,
    /// [`Awaitable::Pending`] chains it to that promise's settlement, and
    /// an `Err` rejects it. A rejection of this promise passes through to
    /// the downstream promise unchanged.
    ///
    /// If this promise is already settled the handler is scheduled right
    /// away, asynchronously, on the next tick.
    ///
    /// Cancelling the downstream promise cancels this one.
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<Awaitable<U>, Rejection> + 'static,
    {
        let downstream = self.sub_promise::<U>();
        let chained = downstream.clone();
        self.when_settled(Box::new(move |result| match result {
            Ok(value) => chained.settle_from(on_fulfilled(value)),
            Err(reason) => {
                chained.settle(Err(reason));
            }
        }));
        downstream
    }

    /// Registers a rejection handler and returns the downstream promise.
    ///
    /// The counterpart of [`then`](Self::then) for the rejection arm: a
    /// fulfillment value passes through to the downstream promise
    /// unchanged, which is what lets a handler further down a chain
    /// recover from an upstream failure.
    pub fn otherwise<F>(&self, on_rejected: F) -> Promise<T>
    where
        F: FnOnce(Rejection) -> Result<Awaitable<T>, Rejection> + 'static,
    {
        let downstream = self.sub_promise::<T>();
        let chained = downstream.clone();
        self.when_settled(Box::new(move |result| match result {
            Ok(value) => {
                chained.settle(Ok(value));
            }
            Err(reason) => chained.settle_from(on_rejected(reason)),
        }));
        downstream
    }

    /// Registers handlers for both arms and returns the downstream promise.
    pub fn then_or_else<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<Awaitable<U>, Rejection> + 'static,
        R: FnOnce(Rejection) -> Result<Awaitable<U>, Rejection> + 'static,
    {
        let downstream = self.sub_promise::<U>();
        let chained = downstream.clone();
        self.when_settled(Box::new(move |result| match result {
            Ok(value) => chained.settle_from(on_fulfilled(value)),
            Err(reason) => chained.settle_from(on_rejected(reason)),
        }));
        downstream
    }

    /// Cancels a pending promise.
    ///
    /// Subscribers are dropped so they can never fire. The cancellation
    /// callback, if any, runs once; if it returns an `Err` the promise is
    /// rejected with that reason, and if it settles the promise itself
    /// (through a captured handle) that settlement wins. Otherwise the
    /// promise is rejected with [`Rejection::Cancelled`].
    ///
    /// Cancelling a settled promise is a no-op.
    pub fn cancel(&self) {
        let cancel_fn = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                State::Pending {
                    subscribers,
                    cancel_fn,
                } => {
                    subscribers.clear();
                    cancel_fn.take()
                }
                State::Settled(_) => return,
            }
        };

        log::debug!("cancelling pending promise");

        if let Some(on_cancel) = cancel_fn {
            if let Err(reason) = on_cancel() {
                self.settle(Err(reason));
            }
        }

        // Reject only if the cancel callback did not already settle it.
        self.settle(Err(Rejection::Cancelled));
    }

    /// Blocks until this promise settles, driving the loop forward.
    ///
    /// This effectively turns the asynchronous operation into a
    /// synchronous one; call it on the last promise in a chain.
    ///
    /// # Errors
    ///
    /// [`PromiseError::Rejected`] with the rejection reason, or
    /// [`PromiseError::Starved`] if the loop runs out of events while the
    /// promise is still pending: nothing left in the loop could ever
    /// settle it, so waiting longer would hang forever.
    pub fn wait(&self) -> Result<T, PromiseError> {
        let mut has_events = true;
        loop {
            {
                let state = self.state.borrow();
                if let State::Settled(result) = &*state {
                    return result.clone().map_err(PromiseError::from);
                }
            }

            if !has_events {
                return Err(PromiseError::Starved);
            }

            // Not settled yet: tell the loop to handle events, blocking.
            has_events = self.event_loop.tick(true);
        }
    }

    /// The downstream promise returned by the `then` family. Cancelling it
    /// cancels its parent.
    fn sub_promise<U: Clone + 'static>(&self) -> Promise<U> {
        let parent = self.clone();
        Promise::with_canceller(&self.event_loop, move || {
            parent.cancel();
            Ok(())
        })
    }

    /// Settles the downstream promise from a handler's output.
    fn settle_from(&self, output: Result<Awaitable<T>, Rejection>) {
        match output {
            Ok(Awaitable::Ready(value)) => {
                self.settle(Ok(value));
            }
            Ok(Awaitable::Pending(upstream)) => {
                // The handler returned another promise: this promise
                // settles only once that one does.
                let downstream = self.clone();
                upstream.when_settled(Box::new(move |result| {
                    downstream.settle(result);
                }));
            }
            Err(reason) => {
                self.settle(Err(reason));
            }
        }
    }

    /// Invokes `subscriber` with the settlement of this promise, now or
    /// later, always via the loop's next-tick queue.
    pub(crate) fn when_settled(&self, subscriber: Subscriber<T>) {
        let settled = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                State::Pending { subscribers, .. } => {
                    subscribers.push(subscriber);
                    return;
                }
                State::Settled(result) => result.clone(),
            }
        };
        self.event_loop.next_tick(move || subscriber(settled));
    }

    /// Transitions to settled, scheduling all subscribers.
    ///
    /// Returns false without any effect if the promise is already settled;
    /// internal propagation paths (chain wiring, combinators, the
    /// cancellation default) rely on the no-op, while the public
    /// `fulfill`/`reject` report it as an error.
    pub(crate) fn settle(&self, result: Result<T, Rejection>) -> bool {
        let subscribers = {
            let mut state = self.state.borrow_mut();
            let taken = match &mut *state {
                State::Pending { subscribers, .. } => std::mem::take(subscribers),
                State::Settled(_) => return false,
            };
            *state = State::Settled(result.clone());
            taken
        };

        // Handlers are triggered outside of the calling stack that settled
        // the promise, which keeps the order of execution predictable.
        for subscriber in subscribers {
            let result = result.clone();
            self.event_loop.next_tick(move || subscriber(result));
        }
        true
    }
}
