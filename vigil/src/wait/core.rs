use super::set::WaitSet;
use super::state::{Outcome, WaitState};
use crate::deferred::{self, Observation};
use crate::error::BridgeError;
use crate::interrupt::Interrupt;
use crate::reactor::{ReactorFault, ReactorHandle};
use crate::value::Value;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

/// Every wait currently blocked in [`wait_for`], process-wide.
static OUTSTANDING: OnceLock<WaitSet> = OnceLock::new();

fn outstanding() -> &'static WaitSet {
    OUTSTANDING.get_or_init(WaitSet::new)
}

/// Number of callers currently blocked in [`wait_for`].
pub fn outstanding_waits() -> usize {
    outstanding().len()
}

/// Blocks the calling thread until `value` resolves, `timeout` elapses or
/// `interrupt` is triggered.
///
/// The wait goes through these steps:
/// 1. refuse to run on the reactor thread, which would deadlock,
/// 2. register a fresh wait state where the reactor's error handler and
///    `interrupt` can reach it,
/// 3. arm a timer for `timeout`, if any,
/// 4. subscribe to both channels of the deferred,
/// 5. sleep on a condition variable until one party settles the state.
///
/// A value that is not deferrable settles immediately as a success
/// carrying itself. `None` waits indefinitely.
///
/// # Errors
///
/// - [`BridgeError::Deadlock`] when called on the reactor thread,
/// - [`BridgeError::ReactorStopped`] if the timer cannot be armed.
///
/// Every other result, including timeouts and interruptions, is an
/// [`Outcome`] for the translator to turn into a value or an error.
pub fn wait_for(
    reactor: &ReactorHandle,
    value: Value,
    timeout: Option<Duration>,
    interrupt: &Interrupt,
) -> Result<Outcome, BridgeError> {
    if reactor.is_reactor_thread() {
        return Err(BridgeError::Deadlock);
    }

    let state = Arc::new(WaitState::new());
    let _registration = Registration::new(&state, interrupt);

    if let Some(after) = timeout {
        let timer = Arc::downgrade(&state);
        reactor.add_timer(after, move || {
            settle(&timer, Outcome::TimedOut(after));
        })?;
    }

    let (on_success, on_failure) = (Arc::downgrade(&state), Arc::downgrade(&state));

    let observation = deferred::observe(
        value,
        move |values| {
            settle(&on_success, Outcome::Succeeded(values));
        },
        move |values| {
            settle(&on_failure, Outcome::Failed(values));
        },
    );

    if let Observation::NotDeferrable(value) = observation {
        state.settle(Outcome::Succeeded(vec![value]));
    }

    let outcome = state.wait();
    tracing::debug!(phase = state.phase().label(), "wait finished");

    if state.interrupt_requested() {
        return Ok(Outcome::Interrupted);
    }

    Ok(outcome)
}

/// Settles a wait that may already have returned.
fn settle(state: &Weak<WaitState>, outcome: Outcome) {
    if let Some(state) = state.upgrade() {
        state.settle(outcome);
    }
}

/// The reactor's installed error handler.
///
/// Hands the fault to every outstanding wait so it is re-raised on the
/// waiting callers' threads. With nobody waiting, the fault is reported
/// out-of-band; a failure while reporting is swallowed.
pub(crate) fn report_fault(fault: ReactorFault) {
    let delivered = outstanding().deliver(|state| state.settle(Outcome::ReactorError(fault.clone())));

    if delivered == 0 {
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            tracing::error!(%fault, "reactor error with no waiting caller");
        }));
    }
}

/// Keeps a wait registered for the duration of [`wait_for`].
struct Registration<'a> {
    interrupt: &'a Interrupt,
    outstanding_key: usize,
    interrupt_key: usize,
}

impl<'a> Registration<'a> {
    fn new(state: &Arc<WaitState>, interrupt: &'a Interrupt) -> Self {
        Self {
            interrupt,
            outstanding_key: outstanding().insert(Arc::downgrade(state)),
            interrupt_key: interrupt.register(Arc::downgrade(state)),
        }
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        outstanding().remove(self.outstanding_key);
        self.interrupt.deregister(self.interrupt_key);
    }
}
