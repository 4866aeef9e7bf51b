use super::command::{Command, Job};
use super::error::ReactorFault;
use super::poller::{Poller, Waker};
use super::timer::TimerEntry;

use std::collections::BinaryHeap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::time::Instant;

/// Callback receiving faults captured on the reactor thread.
pub(crate) type ErrorHandler = Arc<dyn Fn(ReactorFault) + Send + Sync>;

/// The reactor event loop.
///
/// The reactor owns the timer heap and the OS poller. It is driven
/// exclusively by its own thread and communicates with the rest of the
/// process through [`Command`]s and the poller waker.
pub(crate) struct Reactor {
    /// Incoming commands from reactor handles.
    receiver: Receiver<Command>,

    /// OS poller used to sleep until the next deadline.
    poller: Poller,

    /// Pending timers, earliest deadline first.
    timers: BinaryHeap<TimerEntry>,

    /// Monotonic counter ordering timers with equal deadlines.
    sequence: u64,

    /// Installed handler for panics raised by jobs.
    on_fault: ErrorHandler,
}

impl Reactor {
    /// Creates a reactor, its command sender and its waker.
    ///
    /// Fails if the OS poller cannot be created.
    pub(crate) fn new(on_fault: ErrorHandler) -> io::Result<(Self, Sender<Command>, Arc<Waker>)> {
        let (transmitter, receiver) = channel();
        let poller = Poller::new()?;
        let waker = poller.waker();

        Ok((
            Self {
                receiver,
                poller,
                timers: BinaryHeap::new(),
                sequence: 0,
                on_fault,
            },
            transmitter,
            waker,
        ))
    }

    /// Runs the event loop.
    ///
    /// Returns once every command sender has been dropped, or with an
    /// error if the poller fails.
    pub(crate) fn run(&mut self) -> io::Result<()> {
        loop {
            loop {
                match self.receiver.try_recv() {
                    Ok(Command::Schedule(job)) => self.dispatch(job),
                    Ok(Command::SetTimer { deadline, job }) => {
                        self.timers.push(TimerEntry {
                            deadline,
                            sequence: self.sequence,
                            job,
                        });
                        self.sequence += 1;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return Ok(()),
                }
            }

            let timeout = self
                .timers
                .peek()
                .map(|t| t.deadline.saturating_duration_since(Instant::now()));

            self.poller.poll(timeout)?;

            let now = Instant::now();
            while self.timers.peek().is_some_and(|t| t.deadline <= now) {
                if let Some(timer) = self.timers.pop() {
                    self.dispatch(timer.job);
                }
            }
        }
    }

    /// Runs a job, routing a panic to the installed error handler.
    ///
    /// The handler itself is also guarded so that a failing report can
    /// never take the reactor thread down.
    fn dispatch(&self, job: Job) {
        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) else {
            return;
        };

        let fault = ReactorFault::from_panic(payload);
        tracing::debug!(%fault, "reactor job panicked");

        let on_fault = &self.on_fault;
        let _ = panic::catch_unwind(AssertUnwindSafe(|| on_fault(fault)));
    }
}
