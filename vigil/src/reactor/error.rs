use std::any::Any;
use std::io;

use thiserror::Error;

/// A failure raised while the reactor thread was running a job.
///
/// Jobs run under `catch_unwind`; a panic is captured here with its
/// message so it can be re-raised on the thread of a waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ReactorFault {
    message: String,
}

impl ReactorFault {
    /// Creates a fault with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Builds a fault from a panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_string(),
                Err(_) => "reactor job panicked".to_string(),
            },
        };

        Self { message }
    }

    /// The captured message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Reasons the reactor could not be brought up.
#[derive(Debug, Error)]
pub enum ReactorStartError {
    /// The OS poller could not be created.
    #[error("failed to create reactor poller: {0}")]
    Poller(#[source] io::Error),

    /// The reactor thread could not be spawned.
    #[error("failed to spawn reactor thread: {0}")]
    Spawn(#[source] io::Error),

    /// The reactor thread exited before reporting that it was running.
    #[error("reactor thread exited during startup")]
    Died,
}

/// Work could not be submitted because the reactor loop has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("reactor is no longer running")]
pub struct ReactorStopped;
