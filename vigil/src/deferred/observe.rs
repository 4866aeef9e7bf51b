use crate::value::Value;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of subscribing to a value.
#[derive(Debug)]
pub enum Observation {
    /// Both callbacks are attached to the deferred.
    Subscribed,
    /// The value has no completion channels. It is handed back so the
    /// caller can treat it as already resolved with itself.
    NotDeferrable(Value),
}

/// Subscribes `on_success` and `on_failure` to a deferred value.
///
/// At most one of the two callbacks runs, at most once, even if the
/// deferred misbehaves and fires both channels: they share a single
/// fire-once latch.
///
/// A value without the [`Deferrable`](super::Deferrable) capability is
/// not an error. Neither callback runs; a warning is logged and the
/// value comes back as [`Observation::NotDeferrable`].
pub fn observe<S, F>(value: Value, on_success: S, on_failure: F) -> Observation
where
    S: FnOnce(Vec<Value>) + Send + 'static,
    F: FnOnce(Vec<Value>) + Send + 'static,
{
    let Some(deferrable) = value.as_deferrable().cloned() else {
        tracing::warn!(value = %value, "is not deferrable?");
        return Observation::NotDeferrable(value);
    };

    let fired = Arc::new(AtomicBool::new(false));
    let fired_err = fired.clone();

    deferrable.callback(Box::new(move |values| {
        if !fired.swap(true, Ordering::AcqRel) {
            on_success(values);
        }
    }));

    deferrable.errback(Box::new(move |values| {
        if !fired_err.swap(true, Ordering::AcqRel) {
            on_failure(values);
        }
    }));

    Observation::Subscribed
}
