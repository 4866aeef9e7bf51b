//! Turning a wait outcome into what the shell shows.
//!
//! Success hands back a value; everything else writes a short state word
//! (`failed `, `timeout `, ...) to the shell's output before surfacing
//! its value or error.

use crate::error::BridgeError;
use crate::value::Value;
use crate::wait::{Outcome, Phase};

use std::io::Write;

/// Converts a terminal [`Outcome`] into a value or an error.
///
/// - `Succeeded`: one value is returned bare, several as a list.
/// - `Failed`: a single error object is raised, anything else is
///   returned as a value.
/// - `TimedOut`, `Interrupted`, `ReactorError`: raised.
///
/// Every phase but `Succeeded` is annotated on `out` first. A failure to
/// write the annotation is logged and never replaces the outcome.
pub fn translate<W>(outcome: Outcome, out: &mut W) -> Result<Value, BridgeError>
where
    W: Write + ?Sized,
{
    let phase = outcome.phase();
    if phase != Phase::Succeeded {
        annotate(out, phase);
    }

    match outcome {
        Outcome::Succeeded(values) => Ok(collapse(values)),
        Outcome::Failed(values) => match collapse(values) {
            Value::Error(err) => Err(BridgeError::DeferredFailure(err)),
            value => Ok(value),
        },
        Outcome::TimedOut(after) => Err(BridgeError::Timeout { after }),
        Outcome::Interrupted => Err(BridgeError::Interrupted),
        Outcome::ReactorError(fault) => Err(BridgeError::Reactor(fault)),
    }
}

/// One value bare, several as a list, none as nil.
pub(crate) fn collapse(mut values: Vec<Value>) -> Value {
    match values.len() {
        0 => Value::Nil,
        1 => values.pop().unwrap_or_default(),
        _ => Value::List(values),
    }
}

fn annotate<W>(out: &mut W, phase: Phase)
where
    W: Write + ?Sized,
{
    let written = write!(out, "{} ", phase.label()).and_then(|()| out.flush());

    if let Err(err) = written {
        tracing::warn!(error = %err, phase = phase.label(), "could not write state annotation");
    }
}
