//! # Tactus
//!
//! **Tactus** is a deterministic, single-threaded event loop for Rust,
//! paired with promises and a coroutine adapter for writing asynchronous
//! code that reads sequentially.
//!
//! Unlike general-purpose runtimes like Tokio or async-std, Tactus does not
//! spawn threads and does not poll futures. Concurrency is the interleaving
//! of plain callbacks driven by one loop, which makes execution order fully
//! deterministic: next-tick callbacks run in scheduling order, timers fire
//! in deadline order, and promise continuations are always deferred to the
//! next tick so observers never see re-entrant resolution.
//!
//! Tactus is built from the ground up with simplicity and predictability in
//! mind, offering:
//!
//! - A **cooperative event loop** with next-tick callbacks, timers,
//!   intervals, and readiness-based stream watches
//! - **Promises** with at-most-once settlement, chaining, cancellation, and
//!   a blocking `wait` that drives the loop
//! - A **coroutine adapter** that resumes a suspended computation whenever
//!   the awaitable it yielded settles
//! - A **prioritized event emitter** with hierarchical wildcard matching
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use tactus::{EventLoop, Promise};
//!
//! let lp = EventLoop::new();
//! let promise: Promise<&str> = Promise::new(&lp);
//!
//! let done = promise.clone();
//! lp.set_timeout(move || {
//!     let _ = done.fulfill("finished");
//! }, Duration::from_millis(10));
//!
//! assert_eq!(promise.wait().unwrap(), "finished");
//! ```
//!
//! ## Modules
//!
//! - [`event_loop`] — The scheduler: next-tick queue, timers, stream watches
//! - [`promise`] — Promises and the `all`/`race`/`resolve`/`reject` combinators
//! - [`coroutine`] — Sequential composition over promises
//! - [`emitter`] — Prioritized publish/subscribe events
//!
//! ## Getting Started
//!
//! Add Tactus to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tactus = "0.1"
//! ```

pub mod coroutine;
pub mod emitter;
pub mod error;
pub mod event_loop;
pub mod promise;

pub use coroutine::{Coroutine, Resume, Step, coroutine};
pub use emitter::{DEFAULT_PRIORITY, EventEmitter, Listener};
pub use error::{PromiseError, Rejection};
pub use event_loop::{EventLoop, IntervalHandle, StreamId};
pub use promise::{Awaitable, Promise, PromiseState};
