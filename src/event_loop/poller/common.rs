use std::time::Duration;

use super::StreamId;

/// A readiness event reported by the poller.
///
/// An `Event` carries readiness information for one watched stream. It is
/// produced by the platform backend and consumed by the loop to dispatch
/// the matching watch callbacks.
pub(crate) struct Event {
    /// The stream the readiness applies to.
    pub(crate) stream: StreamId,

    /// The stream is readable (or in an error/hang-up state a read would
    /// observe).
    pub(crate) readable: bool,

    /// The stream is writable (or in an error/hang-up state a write would
    /// observe).
    pub(crate) writable: bool,
}

/// Converts an optional wait into the millisecond timeout the platform
/// poll call expects; `None` means block indefinitely (`-1`).
///
/// Sub-millisecond remainders round up so a nearly-due timer never turns
/// into a zero-timeout spin.
pub(crate) fn poll_timeout_ms(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(t) => {
            let mut ms = t.as_millis();
            if Duration::from_millis(ms as u64) < t {
                ms += 1;
            }
            ms.min(i32::MAX as u128) as i32
        }
    }
}
