//! Portable Unix poller built on a self-pipe and `poll(2)`.
//!
//! Used on Unix targets without `epoll`. The read end of a non-blocking
//! pipe is polled with the timer timeout; the write end is the waker.

use super::common::{Waker, timeout_millis};

use libc::{F_GETFL, F_SETFD, F_SETFL, FD_CLOEXEC, O_NONBLOCK, POLLIN, fcntl, pollfd};
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Self-pipe poller.
pub(crate) struct PipePoller {
    /// Read end of the wake-up pipe.
    reader: RawFd,

    /// Waker wrapping the write end.
    waker: Arc<Waker>,
}

impl Waker {
    /// Wake the poller by writing one byte into the pipe.
    ///
    /// A full pipe already guarantees a pending wake-up, so `EAGAIN`
    /// is ignored.
    pub(crate) fn wake(&self) {
        let buf = [1u8];
        unsafe {
            libc::write(self.0, buf.as_ptr() as *const _, 1);
        }
    }
}

impl PipePoller {
    /// Creates the pipe and configures both ends as non-blocking and
    /// close-on-exec.
    pub(crate) fn new() -> io::Result<Self> {
        let mut fds = [0 as RawFd; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
            return Err(io::Error::last_os_error());
        }

        let [reader, writer] = fds;
        let waker = Arc::new(Waker(writer));

        for fd in fds {
            if let Err(err) = configure(fd) {
                unsafe { libc::close(reader) };
                return Err(err);
            }
        }

        Ok(Self { reader, waker })
    }

    /// Return the poller waker.
    pub(crate) fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    /// Blocks until the waker fires or the optional timeout expires.
    pub(crate) fn poll(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let mut fd = pollfd {
            fd: self.reader,
            events: POLLIN,
            revents: 0,
        };

        let n = unsafe { libc::poll(&mut fd, 1, timeout_millis(timeout)) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        if fd.revents & POLLIN != 0 {
            let mut buf = [0u8; 64];
            while unsafe { libc::read(self.reader, buf.as_mut_ptr() as *mut _, buf.len()) } > 0 {}
        }

        Ok(())
    }
}

impl Drop for PipePoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.reader);
        }
    }
}

/// Sets `O_NONBLOCK` and `FD_CLOEXEC` on a descriptor.
fn configure(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFL) };
    if flags < 0 || unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }

    if unsafe { fcntl(fd, F_SETFD, FD_CLOEXEC) } < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
