use vigil::command::{DESCRIPTION, LISTING, NAME};
use vigil::reactor;
use vigil::{BridgeError, Deferred, EmCommand, ErrorValue, Evaluator, Value};

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

#[derive(Debug)]
struct UnknownSource(String);

impl fmt::Display for UnknownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "undefined local variable `{}`", self.0)
    }
}

impl std::error::Error for UnknownSource {}

/// Evaluates a handful of fixed sources, resolving deferreds from the reactor.
struct Script;

impl Script {
    fn later(success: bool, values: Vec<Value>) -> Value {
        let deferred = Arc::new(Deferred::new());
        let resolver = deferred.clone();

        reactor::current()
            .expect("em starts the reactor before evaluating")
            .add_timer(Duration::from_millis(10), move || {
                if success {
                    resolver.succeed(values);
                } else {
                    resolver.fail(values);
                }
            })
            .unwrap();

        Value::Deferred(deferred)
    }
}

impl Evaluator for Script {
    type Error = UnknownSource;

    fn evaluate(&mut self, source: &str) -> Result<Value, UnknownSource> {
        match source.trim() {
            "nil" => Ok(Value::Nil),
            "answer" => Ok(Script::later(true, vec![Value::Int(42)])),
            "pair" => Ok(Script::later(true, vec![Value::Int(1), Value::Int(2)])),
            "boom" => Ok(Script::later(
                false,
                vec![Value::Error(ErrorValue::runtime("boom"))],
            )),
            "missing" => Ok(Script::later(false, vec![Value::from("404")])),
            "never" => Ok(Value::Deferred(Arc::new(Deferred::new()))),
            "plain" => Ok(Value::from("just a string")),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

fn em(line: &str) -> (Option<Result<Value, BridgeError>>, String) {
    let mut out = Vec::new();
    let result = EmCommand::new().run_line(line, &mut Script, &mut out);
    (result, String::from_utf8(out).unwrap())
}

#[test]
fn test_metadata() {
    assert_eq!(NAME, "em");
    assert_eq!(LISTING, "em[timeout]:");
    assert!(DESCRIPTION.starts_with("Wait for a deferrable"));
}

#[test]
fn test_success_is_returned_without_annotation() {
    let (result, out) = em("em: answer");
    assert_eq!(result.unwrap().unwrap(), Value::Int(42));
    assert_eq!(out, "");

    let (result, _) = em("em 2: pair");
    assert_eq!(
        result.unwrap().unwrap(),
        Value::List(vec![Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn test_failure_is_annotated() {
    let (result, out) = em("em 2: boom");
    assert!(matches!(
        result,
        Some(Err(BridgeError::DeferredFailure(e))) if e.message() == "boom"
    ));
    assert_eq!(out, "failed ");

    let (result, out) = em("em 2: missing");
    assert_eq!(result.unwrap().unwrap(), Value::from("404"));
    assert_eq!(out, "failed ");
}

#[test]
fn test_timeout_is_annotated() {
    let (result, out) = em("em 0.05: never");

    assert!(matches!(result, Some(Err(BridgeError::Timeout { .. }))));
    assert_eq!(out, "timeout ");
}

#[test]
fn test_nil_is_a_no_op() {
    let (result, out) = em("em: nil");

    assert_eq!(result.unwrap().unwrap(), Value::Nil);
    assert_eq!(out, "");
}

#[test]
fn test_plain_value_is_returned_with_warning() {
    let (result, out) = em("em: plain");

    assert_eq!(result.unwrap().unwrap(), Value::from("just a string"));
    assert_eq!(out, "WARNING: is not deferrable? \"just a string\"\n");
}

#[test]
fn test_evaluation_errors_propagate() {
    let (result, _) = em("em: nope");

    match result {
        Some(Err(err @ BridgeError::Eval(_))) => {
            assert_eq!(err.to_string(), "evaluation failed: undefined local variable `nope`");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_non_commands_are_left_to_the_host() {
    let (result, out) = em("answer");

    assert!(result.is_none());
    assert_eq!(out, "");
}

#[test]
fn test_invalid_timeout() {
    let (result, _) = em("em 1..5: answer");

    assert!(matches!(result, Some(Err(BridgeError::InvalidTimeout(t))) if t == "1..5"));
}

#[test]
fn test_em_on_reactor_thread_is_refused() {
    let reactor = reactor::ensure_running().unwrap();
    let (tx, rx) = mpsc::channel();

    reactor
        .schedule(move || {
            let (result, _) = em("em: never");
            let _ = tx.send(matches!(result, Some(Err(BridgeError::Deadlock))));
        })
        .unwrap();

    assert!(rx.recv_timeout(Duration::from_secs(1)).unwrap());
}
