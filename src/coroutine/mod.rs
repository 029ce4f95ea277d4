//! Turn asynchronous promise-based code into something that reads
//! sequentially again.
//!
//! A [`Coroutine`] is a resumable computation: each call to
//! [`resume`](Coroutine::resume) runs it up to its next suspension point,
//! where it either yields an [`Awaitable`] or completes. The
//! [`coroutine`] driver re-enters the computation whenever the awaitable it
//! yielded settles, passing the fulfillment value back in (or injecting
//! the rejection), so a chain of `then` calls collapses into one
//! straight-line state machine.
//!
//! Any `FnMut(Resume<T>) -> Result<Step<T>, Rejection>` closure is a
//! coroutine, which is usually all a caller needs:
//!
//! ```rust
//! use tactus::{Awaitable, EventLoop, Promise, Resume, Step, coroutine};
//!
//! let lp = EventLoop::new();
//! let fetch: Promise<i32> = Promise::new(&lp);
//!
//! let awaited = fetch.clone();
//! let mut stage = 0;
//! let total = coroutine(&lp, move |input: Resume<i32>| {
//!     stage += 1;
//!     match (stage, input) {
//!         (1, Resume::Start) => Ok(Step::Yield(Awaitable::Pending(awaited.clone()))),
//!         (2, Resume::Value(v)) => Ok(Step::Done(v + 1)),
//!         _ => unreachable!(),
//!     }
//! });
//!
//! fetch.fulfill(41).unwrap();
//! assert_eq!(total.wait().unwrap(), 42);
//! ```

use crate::error::Rejection;
use crate::event_loop::EventLoop;
use crate::promise::{Awaitable, Promise};

use std::cell::RefCell;
use std::rc::Rc;

/// What a coroutine is resumed with.
pub enum Resume<T> {
    /// The first entry into the computation.
    Start,
    /// The settlement value of the previously yielded awaitable (or the
    /// plain value itself, passed straight back through).
    Value(T),
    /// The previously yielded promise was rejected. A coroutine that wants
    /// to recover handles this and keeps going; returning it as an `Err`
    /// rejects the overall promise.
    Error(Rejection),
}

/// What a coroutine produced at a suspension point.
pub enum Step<T> {
    /// The computation is waiting on a value. An [`Awaitable::Ready`] value
    /// is passed back immediately and driving continues synchronously; an
    /// [`Awaitable::Pending`] promise suspends the computation until it
    /// settles.
    Yield(Awaitable<T>),
    /// The computation finished with its final value.
    Done(T),
}

/// A suspendable sequential computation.
///
/// Implemented as an explicit state machine: each `resume` advances the
/// computation to its next suspension point. An `Err` return corresponds
/// to an uncaught error and rejects the overall promise.
pub trait Coroutine<T> {
    /// Advances the computation once.
    fn resume(&mut self, input: Resume<T>) -> Result<Step<T>, Rejection>;
}

impl<T, F> Coroutine<T> for F
where
    F: FnMut(Resume<T>) -> Result<Step<T>, Rejection>,
{
    fn resume(&mut self, input: Resume<T>) -> Result<Step<T>, Rejection> {
        self(input)
    }
}

/// Drives a coroutine to completion, returning the promise of its result.
///
/// The returned promise fulfills with the coroutine's final value, or
/// rejects with the first error the coroutine does not handle. It settles
/// at most once.
pub fn coroutine<T, C>(event_loop: &EventLoop, routine: C) -> Promise<T>
where
    T: Clone + 'static,
    C: Coroutine<T> + 'static,
{
    let promise = Promise::new(event_loop);
    advance(Rc::new(RefCell::new(routine)), promise.clone(), Resume::Start);
    promise
}

/// Resumes the coroutine until it suspends on a pending promise or ends.
///
/// Ready yields are passed back in a synchronous loop; a pending yield
/// subscribes a continuation that re-enters this function with the
/// settlement, and driving becomes asynchronous from there.
fn advance<T: Clone + 'static>(
    routine: Rc<RefCell<dyn Coroutine<T>>>,
    promise: Promise<T>,
    input: Resume<T>,
) {
    let mut input = input;
    loop {
        let step = routine.borrow_mut().resume(input);
        match step {
            Ok(Step::Yield(Awaitable::Ready(value))) => {
                input = Resume::Value(value);
            }
            Ok(Step::Yield(Awaitable::Pending(awaited))) => {
                let routine = Rc::clone(&routine);
                let promise = promise.clone();
                awaited.when_settled(Box::new(move |settled| {
                    let input = match settled {
                        Ok(value) => Resume::Value(value),
                        Err(reason) => Resume::Error(reason),
                    };
                    advance(routine, promise, input);
                }));
                return;
            }
            Ok(Step::Done(value)) => {
                promise.settle(Ok(value));
                return;
            }
            Err(reason) => {
                promise.settle(Err(reason));
                return;
            }
        }
    }
}
