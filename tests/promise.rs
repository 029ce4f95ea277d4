use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tactus::promise::{all, race, reject, resolve};
use tactus::{Awaitable, EventLoop, Promise, PromiseError, PromiseState, Rejection};

#[test]
fn test_success() {
    let lp = EventLoop::new();
    let final_value = Rc::new(Cell::new(0));

    let promise: Promise<i32> = Promise::new(&lp);
    promise.fulfill(1).unwrap();

    let record = final_value.clone();
    promise.then(move |value| {
        record.set(value + 2);
        Ok(Awaitable::Ready(()))
    });

    assert_eq!(final_value.get(), 0, "handlers never run synchronously");
    lp.run();
    assert_eq!(final_value.get(), 3);
}

#[test]
fn test_fail() {
    let lp = EventLoop::new();
    let final_value = Rc::new(RefCell::new(String::new()));

    let promise: Promise<i32> = Promise::new(&lp);
    promise.reject(Rejection::msg("oops")).unwrap();

    let record = final_value.clone();
    promise.otherwise(move |reason| {
        *record.borrow_mut() = reason.to_string();
        Ok(Awaitable::Ready(0))
    });

    lp.run();
    assert_eq!(*final_value.borrow(), "oops");
}

#[test]
fn test_chain() {
    let lp = EventLoop::new();
    let final_value = Rc::new(Cell::new(0));

    let promise: Promise<i32> = Promise::new(&lp);
    promise.fulfill(1).unwrap();

    let record = final_value.clone();
    promise
        .then(|value| Ok(Awaitable::Ready(value + 2)))
        .then(move |value| {
            record.set(value + 4);
            Ok(Awaitable::Ready(()))
        });

    lp.run();
    assert_eq!(final_value.get(), 7);
}

#[test]
fn test_chain_through_promise() {
    let lp = EventLoop::new();
    let final_value = Rc::new(Cell::new(0));

    let promise: Promise<i32> = Promise::new(&lp);
    promise.fulfill(1).unwrap();

    let sub_promise: Promise<i32> = Promise::new(&lp);

    let chained = sub_promise.clone();
    let record = final_value.clone();
    promise
        .then(move |_| Ok(Awaitable::Pending(chained)))
        .then(move |value| {
            record.set(value + 4);
            Ok(Awaitable::Ready(()))
        });

    sub_promise.fulfill(2).unwrap();
    lp.run();

    assert_eq!(final_value.get(), 6);
}

#[test]
fn test_chain_through_promise_settled_later() {
    let lp = EventLoop::new();
    let recorded = Rc::new(RefCell::new(None));

    let p1: Promise<&str> = Promise::new(&lp);
    let p2: Promise<&str> = Promise::new(&lp);

    let chained = p2.clone();
    let record = recorded.clone();
    p1.then(move |_| Ok(Awaitable::Pending(chained)))
        .then(move |value| {
            *record.borrow_mut() = Some(value);
            Ok(Awaitable::Ready(()))
        });

    p1.fulfill("a").unwrap();
    lp.run();
    assert_eq!(*recorded.borrow(), None, "still waiting on p2");

    p2.fulfill("b").unwrap();
    lp.run();
    assert_eq!(*recorded.borrow(), Some("b"));
}

#[test]
fn test_handler_registered_before_settlement() {
    let lp = EventLoop::new();
    let final_value = Rc::new(Cell::new(0));

    let promise: Promise<i32> = Promise::new(&lp);

    let record = final_value.clone();
    promise.then(move |value| {
        record.set(value + 2);
        Ok(Awaitable::Ready(()))
    });

    promise.fulfill(4).unwrap();
    lp.run();
    assert_eq!(final_value.get(), 6);
}

#[test]
fn test_subscribers_run_in_registration_order() {
    let lp = EventLoop::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let promise: Promise<i32> = Promise::new(&lp);
    for tag in ["first", "second", "third"] {
        let log = log.clone();
        promise.then(move |_| {
            log.borrow_mut().push(tag);
            Ok(Awaitable::Ready(()))
        });
    }

    promise.fulfill(0).unwrap();
    lp.run();
    assert_eq!(log.borrow().as_slice(), ["first", "second", "third"]);
}

#[test]
fn test_executor_success() {
    let lp = EventLoop::new();
    let result = Rc::new(RefCell::new(None));

    let record = result.clone();
    Promise::with_executor(&lp, |p| {
        let _ = p.fulfill("hi");
    })
    .then(move |value| {
        *record.borrow_mut() = Some(value);
        Ok(Awaitable::Ready(()))
    });

    lp.run();
    assert_eq!(*result.borrow(), Some("hi"));
}

#[test]
fn test_executor_fail() {
    let lp = EventLoop::new();
    let result = Rc::new(RefCell::new(String::new()));

    let record = result.clone();
    Promise::<i32>::with_executor(&lp, |p| {
        let _ = p.reject(Rejection::msg("hi"));
    })
    .then(|_| Ok(Awaitable::Ready(0)))
    .otherwise(move |reason| {
        *record.borrow_mut() = reason.to_string();
        Ok(Awaitable::Ready(0))
    });

    lp.run();
    assert_eq!(*result.borrow(), "hi");
}

#[test]
fn test_fulfill_twice_is_an_error() {
    let lp = EventLoop::new();
    let promise: Promise<i32> = Promise::new(&lp);

    promise.fulfill(1).unwrap();
    assert!(matches!(
        promise.fulfill(1),
        Err(PromiseError::AlreadySettled)
    ));
    assert_eq!(promise.state(), PromiseState::Fulfilled);
}

#[test]
fn test_reject_twice_is_an_error() {
    let lp = EventLoop::new();
    let promise: Promise<i32> = Promise::new(&lp);

    promise.reject(Rejection::msg("1")).unwrap();
    assert!(matches!(
        promise.reject(Rejection::msg("1")),
        Err(PromiseError::AlreadySettled)
    ));
    assert!(matches!(
        promise.fulfill(1),
        Err(PromiseError::AlreadySettled)
    ));
    assert_eq!(promise.state(), PromiseState::Rejected);
}

#[test]
fn test_error_in_rejection_handler_rejects_downstream() {
    let lp = EventLoop::new();
    let outcome = Rc::new(Cell::new(0));

    let promise: Promise<i32> = Promise::new(&lp);

    let record = outcome.clone();
    promise
        .otherwise(|_| Err(Rejection::msg("hi")))
        .then_or_else(
            move |_| Ok(Awaitable::Ready(())),
            move |_| {
                record.set(1);
                Ok(Awaitable::Ready(()))
            },
        );

    promise.reject(Rejection::msg("foo")).unwrap();
    lp.run();

    assert_eq!(outcome.get(), 1);
}

#[test]
fn test_wait_resolve() {
    let lp = EventLoop::new();
    let promise: Promise<i32> = Promise::new(&lp);

    let settle = promise.clone();
    lp.next_tick(move || {
        let _ = settle.fulfill(1);
    });

    assert_eq!(promise.wait().unwrap(), 1);
}

#[test]
fn test_wait_will_never_resolve() {
    let lp = EventLoop::new();
    let promise: Promise<i32> = Promise::new(&lp);

    assert!(matches!(promise.wait(), Err(PromiseError::Starved)));
}

#[test]
fn test_wait_rejected() {
    let lp = EventLoop::new();
    let promise: Promise<i32> = Promise::new(&lp);

    let settle = promise.clone();
    lp.next_tick(move || {
        let _ = settle.reject(Rejection::msg("foo"));
    });

    match promise.wait() {
        Err(PromiseError::Rejected(reason)) => assert_eq!(reason.to_string(), "foo"),
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[test]
fn test_rejection_carries_application_errors() {
    let lp = EventLoop::new();
    let promise: Promise<i32> = Promise::new(&lp);

    let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    promise.reject(Rejection::failed(err)).unwrap();

    match promise.wait() {
        Err(PromiseError::Rejected(reason)) => {
            assert!(!reason.is_cancelled());
            assert_eq!(reason.to_string(), "gone");
        }
        other => panic!("expected the wrapped error, got {other:?}"),
    }
}

#[test]
fn test_wait_drives_timers() {
    let lp = EventLoop::new();
    let promise: Promise<&str> = Promise::new(&lp);

    let settle = promise.clone();
    lp.set_timeout(
        move || {
            let _ = settle.fulfill("done");
        },
        std::time::Duration::from_millis(20),
    );

    assert_eq!(promise.wait().unwrap(), "done");
}

#[test]
fn test_cancel_rejects_with_cancellation() {
    let lp = EventLoop::new();
    let promise: Promise<i32> = Promise::new(&lp);

    promise.cancel();

    assert_eq!(promise.state(), PromiseState::Rejected);
    match promise.wait() {
        Err(PromiseError::Rejected(reason)) => assert!(reason.is_cancelled()),
        other => panic!("expected a cancellation rejection, got {other:?}"),
    }
}

#[test]
fn test_cancel_settled_promise_is_a_noop() {
    let lp = EventLoop::new();
    let promise: Promise<i32> = Promise::new(&lp);

    promise.fulfill(7).unwrap();
    promise.cancel();

    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert_eq!(promise.wait().unwrap(), 7);
}

#[test]
fn test_cancel_drops_subscribers() {
    let lp = EventLoop::new();
    let invoked = Rc::new(Cell::new(false));

    let promise: Promise<i32> = Promise::new(&lp);
    let flag = invoked.clone();
    promise.then_or_else(
        move |_| Ok(Awaitable::Ready(())),
        move |_| {
            flag.set(true);
            Ok(Awaitable::Ready(()))
        },
    );

    promise.cancel();
    lp.run();

    assert!(
        !invoked.get(),
        "handlers registered before cancel() must never fire"
    );
}

#[test]
fn test_cancel_handler_settlement_wins() {
    let lp = EventLoop::new();

    let slot: Rc<RefCell<Option<Promise<i32>>>> = Rc::new(RefCell::new(None));
    let inner = slot.clone();
    let promise = Promise::with_canceller(&lp, move || {
        if let Some(p) = inner.borrow().as_ref() {
            let _ = p.fulfill(99);
        }
        Ok(())
    });
    *slot.borrow_mut() = Some(promise.clone());

    promise.cancel();

    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert_eq!(promise.wait().unwrap(), 99);
}

#[test]
fn test_cancel_handler_error_becomes_reason() {
    let lp = EventLoop::new();

    let promise: Promise<i32> = Promise::with_canceller(&lp, || Err(Rejection::msg("torn down")));
    promise.cancel();

    match promise.wait() {
        Err(PromiseError::Rejected(reason)) => {
            assert!(!reason.is_cancelled());
            assert_eq!(reason.to_string(), "torn down");
        }
        other => panic!("expected the canceller's reason, got {other:?}"),
    }
}

#[test]
fn test_cancelling_chained_promise_cancels_parent() {
    let lp = EventLoop::new();

    let parent: Promise<i32> = Promise::new(&lp);
    let child = parent.then(|v| Ok(Awaitable::Ready(v)));

    child.cancel();

    assert_eq!(parent.state(), PromiseState::Rejected);
    assert_eq!(child.state(), PromiseState::Rejected);

    // Draining the loop afterwards must be safe: the parent's subscriber
    // list was cleared along with the child's.
    lp.run();
    assert_eq!(child.state(), PromiseState::Rejected);
}

#[test]
fn test_all_waits_for_every_promise() {
    let lp = EventLoop::new();
    let final_value = Rc::new(RefCell::new(None));

    let p1: Promise<i32> = Promise::new(&lp);
    let p2: Promise<i32> = Promise::new(&lp);

    let record = final_value.clone();
    all(&lp, &[p1.clone(), p2.clone()]).then(move |values| {
        *record.borrow_mut() = Some(values);
        Ok(Awaitable::Ready(()))
    });

    p1.fulfill(1).unwrap();
    lp.run();
    assert_eq!(*final_value.borrow(), None);

    p2.fulfill(2).unwrap();
    lp.run();
    assert_eq!(*final_value.borrow(), Some(vec![1, 2]));
}

#[test]
fn test_all_of_nothing() {
    let lp = EventLoop::new();
    let values = all::<i32>(&lp, &[]).wait().unwrap();
    assert!(values.is_empty());
}

#[test]
fn test_all_rejects_with_first_rejection() {
    let lp = EventLoop::new();

    let p1: Promise<i32> = Promise::new(&lp);
    let p2: Promise<i32> = Promise::new(&lp);
    let combined = all(&lp, &[p1.clone(), p2.clone()]);

    p1.reject(Rejection::msg("1")).unwrap();
    p2.reject(Rejection::msg("2")).unwrap();

    match combined.wait() {
        Err(PromiseError::Rejected(reason)) => assert_eq!(reason.to_string(), "1"),
        other => panic!("expected the first rejection, got {other:?}"),
    }
}

#[test]
fn test_race_first_settlement_wins() {
    let lp = EventLoop::new();

    let p1: Promise<i32> = Promise::new(&lp);
    let p2: Promise<i32> = Promise::new(&lp);
    let winner = race(&lp, &[p1.clone(), p2.clone()]);

    p1.fulfill(1).unwrap();
    p2.fulfill(2).unwrap();

    assert_eq!(winner.wait().unwrap(), 1);
}

#[test]
fn test_race_rejection_wins() {
    let lp = EventLoop::new();

    let p1: Promise<i32> = Promise::new(&lp);
    let p2: Promise<i32> = Promise::new(&lp);
    let winner = race(&lp, &[p1.clone(), p2.clone()]);

    p1.reject(Rejection::msg("1")).unwrap();
    p2.fulfill(2).unwrap();

    match winner.wait() {
        Err(PromiseError::Rejected(reason)) => assert_eq!(reason.to_string(), "1"),
        other => panic!("expected the first settlement, got {other:?}"),
    }
}

#[test]
fn test_resolve_value() {
    let lp = EventLoop::new();
    let promise = resolve(&lp, Awaitable::Ready(1));
    assert_eq!(promise.wait().unwrap(), 1);
}

#[test]
fn test_resolve_follows_promise() {
    let lp = EventLoop::new();

    let upstream: Promise<i32> = Promise::new(&lp);
    upstream.reject(Rejection::msg("uh oh")).unwrap();

    let derived = resolve(&lp, Awaitable::Pending(upstream));
    match derived.wait() {
        Err(PromiseError::Rejected(reason)) => assert_eq!(reason.to_string(), "uh oh"),
        other => panic!("expected the upstream rejection, got {other:?}"),
    }
}

#[test]
fn test_reject_constructor() {
    let lp = EventLoop::new();
    let promise: Promise<i32> = reject(&lp, Rejection::msg("1"));

    assert_eq!(promise.state(), PromiseState::Rejected);
    match promise.wait() {
        Err(PromiseError::Rejected(reason)) => assert_eq!(reason.to_string(), "1"),
        other => panic!("expected a rejection, got {other:?}"),
    }
}
