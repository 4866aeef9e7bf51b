use super::core::{ErrorHandler, Reactor};
use super::error::ReactorStartError;
use super::handle::ReactorHandle;
use crate::wait;

use std::sync::mpsc;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;

/// The process-wide reactor, set once its thread reports it is running.
static REACTOR: OnceLock<ReactorHandle> = OnceLock::new();

/// Serialises start attempts so concurrent callers never spawn two loops.
static START: Mutex<()> = Mutex::new(());

/// Default name of the reactor thread.
const DEFAULT_THREAD_NAME: &str = "vigil-reactor";

/// Ensures the process-wide reactor is running and returns its handle.
///
/// The first call spawns the reactor thread and blocks until the loop is
/// up. Later calls, including concurrent ones, return the same handle
/// without spawning anything.
///
/// # Errors
///
/// Returns a [`ReactorStartError`] if the poller or the thread cannot be
/// created. Nothing is recorded on failure, so a later call retries.
///
/// # Examples
///
/// ```rust,ignore
/// let reactor = vigil::reactor::ensure_running()?;
/// reactor.schedule(|| println!("on the reactor"))?;
/// ```
pub fn ensure_running() -> Result<&'static ReactorHandle, ReactorStartError> {
    ReactorBuilder::new().start()
}

/// Returns the reactor handle if the reactor has been started.
pub fn current() -> Option<&'static ReactorHandle> {
    REACTOR.get()
}

/// Returns `true` once the reactor has been started.
pub fn is_running() -> bool {
    REACTOR.get().is_some()
}

/// Builder for configuring the process-wide reactor.
///
/// Configuration only applies to the call that actually starts the
/// reactor; once it is running, [`start`](Self::start) returns the
/// existing handle unchanged.
///
/// # Examples
///
/// ```rust,ignore
/// let reactor = ReactorBuilder::new()
///     .thread_name("shell-reactor")
///     .start()?;
/// ```
pub struct ReactorBuilder {
    /// Name given to the reactor thread.
    thread_name: String,
}

impl ReactorBuilder {
    /// Creates a builder with the default thread name.
    pub fn new() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }

    /// Sets the name of the reactor thread.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "thread_name must not be empty");

        self.thread_name = name;
        self
    }

    /// Starts the reactor if it is not running yet and returns its handle.
    pub fn start(self) -> Result<&'static ReactorHandle, ReactorStartError> {
        if let Some(handle) = REACTOR.get() {
            return Ok(handle);
        }

        let _guard = START.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(handle) = REACTOR.get() {
            return Ok(handle);
        }

        let handle = spawn(self.thread_name)?;
        Ok(REACTOR.get_or_init(|| handle))
    }
}

impl Default for ReactorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the reactor thread and waits for it to report readiness.
///
/// The poller is created on the reactor thread itself; its creation
/// result travels back over a one-shot channel.
fn spawn(thread_name: String) -> Result<ReactorHandle, ReactorStartError> {
    let (ready_tx, ready_rx) = mpsc::channel();

    let thread = thread::Builder::new()
        .name(thread_name)
        .spawn(move || {
            let on_fault: ErrorHandler = Arc::new(wait::report_fault);

            let (mut reactor, sender, waker) = match Reactor::new(on_fault) {
                Ok(parts) => parts,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };

            if ready_tx.send(Ok((sender, waker))).is_err() {
                return;
            }

            if let Err(err) = reactor.run() {
                tracing::error!(error = %err, "reactor loop exited");
            }
        })
        .map_err(ReactorStartError::Spawn)?;

    let thread_id = thread.thread().id();

    match ready_rx.recv() {
        Ok(Ok((sender, waker))) => {
            tracing::debug!(thread = ?thread_id, "reactor started");
            Ok(ReactorHandle::new(sender, waker, thread_id))
        }
        Ok(Err(err)) => Err(ReactorStartError::Poller(err)),
        Err(_) => Err(ReactorStartError::Died),
    }
}
