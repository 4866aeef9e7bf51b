use super::command::{Command, Job};
use super::error::ReactorStopped;
use super::poller::Waker;

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Handle used to submit work to the running reactor.
///
/// Handles are cheap to clone and may be used from any thread. Every
/// submission also wakes the reactor so that a blocked poll picks the
/// work up immediately.
#[derive(Clone)]
pub struct ReactorHandle {
    /// Command channel into the reactor loop.
    sender: Sender<Command>,

    /// Wakes the reactor out of its poll.
    waker: Arc<Waker>,

    /// Identity of the reactor thread.
    thread: ThreadId,
}

impl ReactorHandle {
    pub(crate) fn new(sender: Sender<Command>, waker: Arc<Waker>, thread: ThreadId) -> Self {
        Self {
            sender,
            waker,
            thread,
        }
    }

    /// Runs `job` on the reactor thread during its next loop turn.
    ///
    /// A panic inside `job` does not stop the reactor; it is handed to the
    /// reactor's error handler instead.
    pub fn schedule<F>(&self, job: F) -> Result<(), ReactorStopped>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(Command::Schedule(Box::new(job)))
    }

    /// Runs `job` once on the reactor thread after `duration` has elapsed.
    ///
    /// Timers cannot be cancelled; jobs that may outlive their purpose
    /// should hold weak references.
    pub fn add_timer<F>(&self, duration: Duration, job: F) -> Result<(), ReactorStopped>
    where
        F: FnOnce() + Send + 'static,
    {
        // A deadline past the end of time never fires.
        let Some(deadline) = Instant::now().checked_add(duration) else {
            return Ok(());
        };

        let job: Job = Box::new(job);
        self.send(Command::SetTimer { deadline, job })
    }

    /// Returns `true` when called from the reactor thread itself.
    pub fn is_reactor_thread(&self) -> bool {
        thread::current().id() == self.thread
    }

    /// Identity of the reactor thread.
    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    fn send(&self, command: Command) -> Result<(), ReactorStopped> {
        self.sender.send(command).map_err(|_| ReactorStopped)?;
        self.waker.wake();

        Ok(())
    }
}
