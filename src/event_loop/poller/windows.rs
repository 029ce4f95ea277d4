//! Windows `WSAPoll`-based readiness backend.
//!
//! Mirrors the semantics of the Unix `poll(2)` backend using non-blocking
//! sockets and `WSAPoll`. Winsock is initialized once per process on first
//! use.
//!
//! This backend is **readiness-based**: it reports which sockets can be
//! read or written, and does not rely on overlapped or completion-based
//! I/O.

use super::StreamId;
use super::common::{Event, poll_timeout_ms};

use std::io;
use std::sync::Once;
use std::time::Duration;

use windows_sys::Win32::Networking::WinSock::{
    POLLERR, POLLHUP, POLLIN, POLLOUT, SOCKET, SOCKET_ERROR, WSADATA, WSAPOLLFD, WSAPoll,
    WSAStartup,
};

/// Initializes Winsock exactly once for the process.
fn ensure_winsock() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let mut data: WSADATA = unsafe { std::mem::zeroed() };
        let rc = unsafe { WSAStartup(0x0202, &mut data) };
        assert!(rc == 0, "WSAStartup failed");
    });
}

/// Polls the given socket sets for readiness.
///
/// Blocks until at least one socket is ready or the timeout elapses
/// (`None` blocks indefinitely). Ready sockets are appended to `events`.
///
/// A socket present in both sets is polled once with both interests.
pub(crate) fn poll_streams(
    read: &[StreamId],
    write: &[StreamId],
    timeout: Option<Duration>,
    events: &mut Vec<Event>,
) -> io::Result<()> {
    ensure_winsock();

    events.clear();

    let mut fds: Vec<WSAPOLLFD> = Vec::with_capacity(read.len() + write.len());

    for &sock in read {
        fds.push(WSAPOLLFD {
            fd: sock as SOCKET,
            events: POLLIN,
            revents: 0,
        });
    }

    for &sock in write {
        if let Some(existing) = fds.iter_mut().find(|p| p.fd == sock as SOCKET) {
            existing.events |= POLLOUT;
        } else {
            fds.push(WSAPOLLFD {
                fd: sock as SOCKET,
                events: POLLOUT,
                revents: 0,
            });
        }
    }

    let rc = unsafe { WSAPoll(fds.as_mut_ptr(), fds.len() as u32, poll_timeout_ms(timeout)) };

    if rc == SOCKET_ERROR {
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
            stream: pfd.fd as StreamId,
            readable: re & (POLLIN | POLLERR | POLLHUP) != 0,
            writable: re & (POLLOUT | POLLERR | POLLHUP) != 0,
        });
    }

    Ok(())
}
