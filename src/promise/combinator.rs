//! Combinators over collections of promises.

use super::{Awaitable, Promise};
use crate::error::Rejection;
use crate::event_loop::EventLoop;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Waits for every promise to fulfill.
///
/// The returned promise fulfills with all values, in input order, once the
/// last input fulfills. It rejects as soon as any input rejects, with that
/// input's reason. An empty input fulfills immediately with an empty vec.
pub fn all<T: Clone + 'static>(event_loop: &EventLoop, promises: &[Promise<T>]) -> Promise<Vec<T>> {
    let result = Promise::new(event_loop);

    let total = promises.len();
    if total == 0 {
        result.settle(Ok(Vec::new()));
        return result;
    }

    let fulfilled = Rc::new(Cell::new(0usize));
    let values: Rc<RefCell<Vec<Option<T>>>> = Rc::new(RefCell::new(vec![None; total]));

    for (index, promise) in promises.iter().enumerate() {
        let result = result.clone();
        let fulfilled = Rc::clone(&fulfilled);
        let values = Rc::clone(&values);
        promise.when_settled(Box::new(move |settled| match settled {
            Ok(value) => {
                values.borrow_mut()[index] = Some(value);
                fulfilled.set(fulfilled.get() + 1);
                if fulfilled.get() == total {
                    let collected: Vec<T> = values.borrow_mut().drain(..).flatten().collect();
                    result.settle(Ok(collected));
                }
            }
            Err(reason) => {
                // First rejection wins; later settlements are no-ops.
                result.settle(Err(reason));
            }
        }));
    }

    result
}

/// Waits for the first promise to settle.
///
/// The returned promise adopts the first settlement among the inputs,
/// fulfilled or rejected. Every later settlement is ignored.
pub fn race<T: Clone + 'static>(event_loop: &EventLoop, promises: &[Promise<T>]) -> Promise<T> {
    let result = Promise::new(event_loop);

    for promise in promises {
        let result = result.clone();
        promise.when_settled(Box::new(move |settled| {
            result.settle(settled);
        }));
    }

    result
}

/// Lifts an [`Awaitable`] into a promise.
///
/// An [`Awaitable::Ready`] value becomes an already-fulfilled promise; an
/// [`Awaitable::Pending`] promise yields a new promise following its
/// settlement, rejections included.
pub fn resolve<T: Clone + 'static>(event_loop: &EventLoop, value: Awaitable<T>) -> Promise<T> {
    match value {
        Awaitable::Ready(value) => {
            let promise = Promise::new(event_loop);
            promise.settle(Ok(value));
            promise
        }
        Awaitable::Pending(upstream) => upstream.then(|value| Ok(Awaitable::Ready(value))),
    }
}

/// An already-rejected promise.
pub fn reject<T: Clone + 'static>(event_loop: &EventLoop, reason: Rejection) -> Promise<T> {
    let promise = Promise::new(event_loop);
    promise.settle(Err(reason));
    promise
}
