use crate::reactor::ReactorFault;
use crate::value::Value;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// The wait has not reached an outcome yet.
///
/// This is the initial phase, set before any callback or timer is armed.
pub(crate) const WAITING: u8 = 0;

/// The deferred succeeded.
pub(crate) const SUCCEEDED: u8 = 1;

/// The deferred failed.
pub(crate) const FAILED: u8 = 2;

/// The timeout timer fired first.
pub(crate) const TIMED_OUT: u8 = 3;

/// The caller was interrupted while waiting.
pub(crate) const INTERRUPTED: u8 = 4;

/// The reactor raised while the caller was waiting.
pub(crate) const REACTOR_ERROR: u8 = 5;

/// Phase of a wait, as observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Succeeded,
    Failed,
    TimedOut,
    Interrupted,
    ReactorError,
}

impl Phase {
    fn from_raw(raw: u8) -> Self {
        match raw {
            SUCCEEDED => Phase::Succeeded,
            FAILED => Phase::Failed,
            TIMED_OUT => Phase::TimedOut,
            INTERRUPTED => Phase::Interrupted,
            REACTOR_ERROR => Phase::ReactorError,
            _ => Phase::Waiting,
        }
    }

    /// Every phase except `Waiting` is terminal.
    pub fn is_terminal(self) -> bool {
        self != Phase::Waiting
    }

    /// Short word a shell prints for this phase.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
            Phase::TimedOut => "timeout",
            Phase::Interrupted => "interrupted",
            Phase::ReactorError => "error",
        }
    }
}

/// Terminal result of a wait, with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The deferred succeeded with these values.
    Succeeded(Vec<Value>),
    /// The deferred failed with these values.
    Failed(Vec<Value>),
    /// No result arrived within the configured duration.
    TimedOut(Duration),
    /// The wait was cancelled from outside.
    Interrupted,
    /// A job on the reactor panicked while the caller was waiting.
    ReactorError(ReactorFault),
}

impl Outcome {
    pub fn phase(&self) -> Phase {
        match self {
            Outcome::Succeeded(_) => Phase::Succeeded,
            Outcome::Failed(_) => Phase::Failed,
            Outcome::TimedOut(_) => Phase::TimedOut,
            Outcome::Interrupted => Phase::Interrupted,
            Outcome::ReactorError(_) => Phase::ReactorError,
        }
    }

    fn raw(&self) -> u8 {
        match self {
            Outcome::Succeeded(_) => SUCCEEDED,
            Outcome::Failed(_) => FAILED,
            Outcome::TimedOut(_) => TIMED_OUT,
            Outcome::Interrupted => INTERRUPTED,
            Outcome::ReactorError(_) => REACTOR_ERROR,
        }
    }
}

/// Shared outcome record of one blocking wait.
///
/// The phase leaves `WAITING` exactly once: every writer races on a
/// compare-and-set and only the winner stores its payload and wakes the
/// caller. Losers are no-ops, which is how a late timer or a second
/// callback is neutralised without cancellation.
pub(crate) struct WaitState {
    /// Current phase, one of the constants above.
    phase: AtomicU8,

    /// Payload stored by the winning writer, taken by the caller.
    outcome: Mutex<Option<Outcome>>,

    /// Signalled once the outcome is stored.
    settled: Condvar,

    /// Set when an interrupt was delivered, whether or not it won.
    interrupt_requested: AtomicBool,
}

impl WaitState {
    pub(crate) fn new() -> Self {
        Self {
            phase: AtomicU8::new(WAITING),
            outcome: Mutex::new(None),
            settled: Condvar::new(),
            interrupt_requested: AtomicBool::new(false),
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        Phase::from_raw(self.phase.load(Ordering::Acquire))
    }

    /// Attempts the transition out of `WAITING`.
    ///
    /// Returns `true` if this call won and its outcome is final.
    pub(crate) fn settle(&self, outcome: Outcome) -> bool {
        if self
            .phase
            .compare_exchange(WAITING, outcome.raw(), Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        tracing::debug!(phase = outcome.phase().label(), "wait settled");

        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(outcome);
        self.settled.notify_all();

        true
    }

    /// Records an interrupt and attempts the `interrupted` transition.
    pub(crate) fn interrupt(&self) -> bool {
        self.interrupt_requested.store(true, Ordering::Release);
        self.settle(Outcome::Interrupted)
    }

    pub(crate) fn interrupt_requested(&self) -> bool {
        self.interrupt_requested.load(Ordering::Acquire)
    }

    /// Blocks until an outcome is stored and takes it.
    pub(crate) fn wait(&self) -> Outcome {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);

        loop {
            if let Some(outcome) = slot.take() {
                return outcome;
            }

            slot = self
                .settled
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Outcome, Phase, WaitState};
    use crate::value::Value;

    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn first_writer_wins() {
        let state = WaitState::new();
        assert_eq!(state.phase(), Phase::Waiting);

        assert!(state.settle(Outcome::Succeeded(vec![Value::Int(1)])));
        assert!(!state.settle(Outcome::TimedOut(Duration::from_millis(5))));
        assert!(!state.interrupt());

        assert_eq!(state.phase(), Phase::Succeeded);
        assert_eq!(state.wait(), Outcome::Succeeded(vec![Value::Int(1)]));
        assert!(state.interrupt_requested());
    }

    #[test]
    fn wait_wakes_on_settle_from_another_thread() {
        let state = Arc::new(WaitState::new());
        let writer = state.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.settle(Outcome::Failed(vec![Value::from("x")]))
        });

        assert_eq!(state.wait(), Outcome::Failed(vec![Value::from("x")]));
        assert!(handle.join().unwrap());
    }

    #[test]
    fn phase_follows_the_winning_writer() {
        let state = WaitState::new();

        assert!(state.interrupt());
        assert!(!state.settle(Outcome::Succeeded(vec![])));

        assert_eq!(state.phase(), Phase::Interrupted);
        assert_eq!(state.wait().phase(), state.phase());
    }

    #[test]
    fn racing_writers_settle_once() {
        let state = Arc::new(WaitState::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = state.clone();
                thread::spawn(move || state.settle(Outcome::Succeeded(vec![Value::Int(i)])))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert!(state.phase().is_terminal());
    }
}
