use vigil::reactor;
use vigil::wait::{Outcome, wait_for};
use vigil::{BridgeError, Deferred, EmCommand, EmRequest, Evaluator, Interrupt, Value};

use std::convert::Infallible;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Evaluates every source to the same deferred.
struct Fixed(Value);

impl Evaluator for Fixed {
    type Error = Infallible;

    fn evaluate(&mut self, _source: &str) -> Result<Value, Infallible> {
        Ok(self.0.clone())
    }
}

/// Triggers `interrupt` once a wait is registered on it.
fn trigger_when_waiting(interrupt: Interrupt) -> thread::JoinHandle<usize> {
    thread::spawn(move || {
        while interrupt.pending() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        thread::sleep(Duration::from_millis(20));
        interrupt.trigger()
    })
}

#[test]
fn test_interrupt_cancels_active_wait() {
    let reactor = reactor::ensure_running().unwrap();
    let interrupt = Interrupt::new();
    let canceller = trigger_when_waiting(interrupt.clone());

    let start = Instant::now();
    let pending = Value::Deferred(Arc::new(Deferred::new()));
    let outcome = wait_for(reactor, pending, None, &interrupt).unwrap();

    assert_eq!(outcome, Outcome::Interrupted);
    assert_eq!(canceller.join().unwrap(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(interrupt.pending(), 0);
}

#[test]
fn test_interrupt_is_propagated_by_em() {
    let interrupt = Interrupt::new();
    let command = EmCommand::with_interrupt(interrupt.clone());
    let canceller = trigger_when_waiting(interrupt);

    let mut evaluator = Fixed(Value::Deferred(Arc::new(Deferred::new())));
    let mut out = Vec::new();
    let request = EmRequest::new("forever", Some(Duration::from_secs(5)));

    let result = command.run(&request, &mut evaluator, &mut out);

    assert!(matches!(result, Err(BridgeError::Interrupted)));
    assert_eq!(String::from_utf8(out).unwrap(), "interrupted ");
    canceller.join().unwrap();
}

#[test]
fn test_interrupt_does_not_affect_later_waits() {
    let reactor = reactor::ensure_running().unwrap();
    let interrupt = Interrupt::new();

    assert_eq!(interrupt.trigger(), 0);

    let deferred = Arc::new(Deferred::new());
    let resolver = deferred.clone();
    reactor
        .add_timer(Duration::from_millis(10), move || {
            resolver.succeed(vec![Value::Int(5)]);
        })
        .unwrap();

    let outcome = wait_for(reactor, Value::Deferred(deferred), None, &interrupt).unwrap();
    assert_eq!(outcome, Outcome::Succeeded(vec![Value::Int(5)]));
}

#[cfg(unix)]
#[test]
fn test_sigint_interrupts_wait() {
    let reactor = reactor::ensure_running().unwrap();
    let interrupt = Interrupt::new();
    interrupt.install_sigint().unwrap();

    let watched = interrupt.clone();
    let signaller = thread::spawn(move || {
        while watched.pending() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        unsafe { libc::raise(libc::SIGINT) }
    });

    let pending = Value::Deferred(Arc::new(Deferred::new()));
    let outcome = wait_for(reactor, pending, Some(Duration::from_secs(5)), &interrupt).unwrap();

    assert_eq!(outcome, Outcome::Interrupted);
    assert_eq!(signaller.join().unwrap(), 0);
}
