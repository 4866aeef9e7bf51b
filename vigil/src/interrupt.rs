//! External cancellation of blocking waits.
//!
//! An [`Interrupt`] is a cloneable token that waits register with while
//! they block. Triggering it interrupts every wait currently registered;
//! waits that start afterwards are unaffected, which matches how a
//! Ctrl-C in a shell cancels only the command in progress.

use crate::wait::{WaitSet, WaitState};

use std::fmt;
use std::sync::{Arc, Weak};

/// Cancellation token for blocking waits.
///
/// # Examples
///
/// ```rust,ignore
/// let interrupt = Interrupt::new();
/// let canceller = interrupt.clone();
///
/// thread::spawn(move || {
///     thread::sleep(Duration::from_secs(1));
///     canceller.trigger();
/// });
///
/// let err = EmCommand::with_interrupt(interrupt).run(&request, &mut evaluator, &mut out);
/// ```
#[derive(Clone)]
pub struct Interrupt {
    waits: Arc<WaitSet>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self {
            waits: Arc::new(WaitSet::new()),
        }
    }

    /// Interrupts every wait currently blocked on this token.
    ///
    /// Returns the number of waits that transitioned to `interrupted`.
    /// A wait that already had an outcome still reports the interruption
    /// to its caller.
    pub fn trigger(&self) -> usize {
        let interrupted = self.waits.deliver(WaitState::interrupt);
        tracing::debug!(interrupted, "interrupt triggered");

        interrupted
    }

    /// Number of waits currently registered.
    pub fn pending(&self) -> usize {
        self.waits.len()
    }

    pub(crate) fn register(&self, state: Weak<WaitState>) -> usize {
        self.waits.insert(state)
    }

    pub(crate) fn deregister(&self, key: usize) {
        self.waits.remove(key);
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupt")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(unix)]
mod sigint {
    use super::Interrupt;

    use libc::{F_GETFL, F_SETFD, F_SETFL, FD_CLOEXEC, O_NONBLOCK, SA_RESTART, SIGINT, c_int};
    use std::io;
    use std::mem;
    use std::os::fd::RawFd;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::{Mutex, PoisonError};
    use std::thread;

    /// Write end of the self-pipe, read by the signal handler.
    static PIPE_WRITER: AtomicI32 = AtomicI32::new(-1);

    /// Token the watcher thread triggers on each signal.
    static TARGET: Mutex<Option<Interrupt>> = Mutex::new(None);

    /// Serialises installation.
    static INSTALL: Mutex<()> = Mutex::new(());

    /// Writes one byte into the self-pipe, leaving `errno` as it found it.
    extern "C" fn on_signal(_: c_int) {
        let fd = PIPE_WRITER.load(Ordering::Relaxed);
        if fd < 0 {
            return;
        }

        let saved = errno::get();
        let byte = [1u8];
        unsafe {
            libc::write(fd, byte.as_ptr() as *const _, 1);
        }
        errno::set(saved);
    }

    mod errno {
        use libc::c_int;

        #[cfg(target_os = "linux")]
        fn location() -> *mut c_int {
            unsafe { libc::__errno_location() }
        }

        #[cfg(any(target_os = "android", target_os = "openbsd", target_os = "netbsd"))]
        fn location() -> *mut c_int {
            unsafe { libc::__errno() }
        }

        #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
        fn location() -> *mut c_int {
            unsafe { libc::__error() }
        }

        #[cfg(not(any(
            target_os = "linux",
            target_os = "android",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
        )))]
        fn location() -> *mut c_int {
            std::ptr::null_mut()
        }

        pub(super) fn get() -> Option<c_int> {
            let errno = location();
            (!errno.is_null()).then(|| unsafe { *errno })
        }

        pub(super) fn set(value: Option<c_int>) {
            let errno = location();
            match value {
                Some(value) if !errno.is_null() => unsafe { *errno = value },
                _ => {}
            }
        }
    }

    impl Interrupt {
        /// Routes SIGINT to this token.
        ///
        /// The signal handler only writes a byte into a pipe; a watcher
        /// thread named `vigil-sigint` reads it and calls
        /// [`trigger`](Interrupt::trigger). Installing again retargets the
        /// existing handler to the new token. A failed installation leaves
        /// nothing behind, so it can be retried.
        pub fn install_sigint(&self) -> io::Result<()> {
            self.route_signal(SIGINT)
        }

        fn route_signal(&self, signal: c_int) -> io::Result<()> {
            *TARGET.lock().unwrap_or_else(PoisonError::into_inner) = Some(self.clone());

            let _guard = INSTALL.lock().unwrap_or_else(PoisonError::into_inner);
            if PIPE_WRITER.load(Ordering::Acquire) >= 0 {
                return Ok(());
            }

            let mut fds = [0 as RawFd; 2];
            if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
                return Err(io::Error::last_os_error());
            }

            let [reader, writer] = fds;
            if let Err(err) = configure(reader, false).and_then(|()| configure(writer, true)) {
                close(&fds);
                return Err(err);
            }

            thread::Builder::new()
                .name("vigil-sigint".to_string())
                .spawn(move || watch(reader))
                .inspect_err(|_| close(&fds))?;

            PIPE_WRITER.store(writer, Ordering::Release);

            if let Err(err) = handle(signal) {
                // Closing the writer ends the watcher, which closes the reader.
                PIPE_WRITER.store(-1, Ordering::Release);
                unsafe { libc::close(writer) };
                return Err(err);
            }

            tracing::debug!(signal, "signal routed to interrupt token");
            Ok(())
        }
    }

    fn handle(signal: c_int) -> io::Result<()> {
        let mut action: libc::sigaction = unsafe { mem::zeroed() };
        action.sa_sigaction = on_signal as extern "C" fn(c_int) as libc::sighandler_t;
        action.sa_flags = SA_RESTART;

        let rc = unsafe {
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signal, &action, std::ptr::null_mut())
        };

        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Blocks on the pipe and triggers the current target per byte.
    fn watch(reader: RawFd) {
        let mut buf = [0u8; 16];

        loop {
            let n = unsafe { libc::read(reader, buf.as_mut_ptr() as *mut _, buf.len()) };

            if n < 0 && io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }

            if n <= 0 {
                break;
            }

            let target = TARGET.lock().unwrap_or_else(PoisonError::into_inner).clone();
            if let Some(interrupt) = target {
                interrupt.trigger();
            }
        }

        unsafe {
            libc::close(reader);
        }
    }

    fn configure(fd: RawFd, nonblocking: bool) -> io::Result<()> {
        if nonblocking {
            let flags = unsafe { libc::fcntl(fd, F_GETFL) };
            if flags < 0 || unsafe { libc::fcntl(fd, F_SETFL, flags | O_NONBLOCK) } < 0 {
                return Err(io::Error::last_os_error());
            }
        }

        if unsafe { libc::fcntl(fd, F_SETFD, FD_CLOEXEC) } < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    fn close(fds: &[RawFd; 2]) {
        for fd in fds {
            unsafe {
                libc::close(*fd);
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::{PIPE_WRITER, errno, on_signal};
        use crate::interrupt::Interrupt;

        use std::sync::atomic::Ordering;
        use std::sync::{Mutex, PoisonError};

        /// Both tests touch the process-wide pipe descriptor.
        static SERIAL: Mutex<()> = Mutex::new(());

        #[test]
        fn handler_leaves_errno_untouched() {
            let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);

            // Not an open descriptor, so the handler's write fails with EBADF.
            let previous = PIPE_WRITER.swap(i32::MAX, Ordering::SeqCst);

            errno::set(Some(libc::EDOM));
            on_signal(libc::SIGINT);
            let after = errno::get();

            PIPE_WRITER.store(previous, Ordering::SeqCst);
            assert_eq!(after, Some(libc::EDOM));
        }

        #[test]
        fn failed_install_can_be_retried() {
            let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
            let interrupt = Interrupt::new();

            // SIGKILL cannot be caught, so `sigaction` refuses it.
            assert!(interrupt.route_signal(libc::SIGKILL).is_err());
            assert_eq!(PIPE_WRITER.load(Ordering::SeqCst), -1);

            assert!(interrupt.route_signal(libc::SIGKILL).is_err());
            assert_eq!(PIPE_WRITER.load(Ordering::SeqCst), -1);
        }
    }
}
