//! Errors surfaced to the caller of the bridge.

use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

use crate::reactor::{ReactorFault, ReactorStartError, ReactorStopped};
use crate::value::ErrorValue;

/// Everything that can go wrong while waiting on a deferred.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The wait was attempted on the reactor thread, which would block the
    /// very loop that has to complete the deferred.
    #[error(
        "could not wait for deferrable, you're on the reactor thread! \
         return from the reactor callback before waiting"
    )]
    Deadlock,

    /// No result arrived within the configured duration.
    #[error("timeout after {} seconds", .after.as_secs_f64())]
    Timeout { after: Duration },

    /// The deferred failed with an error object.
    #[error("{0}")]
    DeferredFailure(ErrorValue),

    /// A reactor job raised while the caller was waiting.
    #[error("{0}")]
    Reactor(ReactorFault),

    /// The wait was cancelled from outside.
    #[error("interrupted")]
    Interrupted,

    /// The reactor could not be started.
    #[error(transparent)]
    ReactorStart(#[from] ReactorStartError),

    /// The reactor loop exited and no longer accepts work.
    #[error(transparent)]
    ReactorStopped(#[from] ReactorStopped),

    /// The timeout before the colon is not a number.
    #[error("invalid timeout `{0}`")]
    InvalidTimeout(String),

    /// The host evaluator could not produce a value.
    #[error("evaluation failed: {0}")]
    Eval(#[source] Box<dyn StdError + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::BridgeError;

    use std::time::Duration;

    #[test]
    fn messages() {
        let timeout = BridgeError::Timeout {
            after: Duration::from_millis(100),
        };
        assert_eq!(timeout.to_string(), "timeout after 0.1 seconds");

        let timeout = BridgeError::Timeout {
            after: Duration::from_secs(3),
        };
        assert_eq!(timeout.to_string(), "timeout after 3 seconds");

        assert!(BridgeError::Deadlock.to_string().contains("reactor thread"));
    }
}
