//! Unix `poll(2)`-based readiness backend.
//!
//! The loop passes its watched stream sets to every call, so the plain
//! `poll(2)` interface fits exactly: build one `pollfd` array, block up to
//! the computed wait, and translate the revents back into [`Event`]s.
//!
//! Responsibilities:
//! - Wait for readiness on the watched read/write descriptors
//! - Honor zero, finite, and indefinite timeouts
//! - Report error and hang-up conditions as readiness, so the watch
//!   callback runs and can observe the failure from its own read/write

use super::StreamId;
use super::common::{Event, poll_timeout_ms};

use libc::{POLLERR, POLLHUP, POLLIN, POLLOUT, nfds_t, poll, pollfd};
use std::io;
use std::time::Duration;

/// Polls the given descriptor sets for readiness.
///
/// Blocks until at least one descriptor is ready or the timeout elapses
/// (`None` blocks indefinitely). Ready descriptors are appended to
/// `events`.
///
/// A descriptor present in both sets is polled once with both interests.
/// An interrupted call (`EINTR`) reports no events rather than an error.
pub(crate) fn poll_streams(
    read: &[StreamId],
    write: &[StreamId],
    timeout: Option<Duration>,
    events: &mut Vec<Event>,
) -> io::Result<()> {
    events.clear();

    let mut fds: Vec<pollfd> = Vec::with_capacity(read.len() + write.len());

    for &fd in read {
        fds.push(pollfd {
            fd,
            events: POLLIN,
            revents: 0,
        });
    }

    for &fd in write {
        if let Some(existing) = fds.iter_mut().find(|p| p.fd == fd) {
            existing.events |= POLLOUT;
        } else {
            fds.push(pollfd {
                fd,
                events: POLLOUT,
                revents: 0,
            });
        }
    }

    let rc = unsafe { poll(fds.as_mut_ptr(), fds.len() as nfds_t, poll_timeout_ms(timeout)) };

    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(());
        }
        return Err(err);
    }

    for pfd in &fds {
        let re = pfd.revents;
        if re == 0 {
            continue;
        }

        events.push(Event {
            stream: pfd.fd,
            readable: re & (POLLIN | POLLERR | POLLHUP) != 0,
            writable: re & (POLLOUT | POLLERR | POLLHUP) != 0,
        });
    }

    Ok(())
}
