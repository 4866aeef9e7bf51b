use super::{Callback, Deferrable};
use crate::value::Value;

use std::fmt;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Resolution state of a [`Deferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredStatus {
    Pending,
    Succeeded,
    Failed,
}

enum State {
    Pending {
        callbacks: Vec<Callback>,
        errbacks: Vec<Callback>,
    },
    Succeeded(Vec<Value>),
    Failed(Vec<Value>),
}

/// A thread-safe deferred result.
///
/// Resolving is first-wins: once [`succeed`](Self::succeed) or
/// [`fail`](Self::fail) has been called, later resolutions are ignored.
/// Callbacks registered before resolution run on the resolving thread in
/// registration order; callbacks registered afterwards run immediately
/// on the registering thread. Callbacks never run under the internal
/// lock, so they may freely touch the deferred again.
///
/// # Examples
///
/// ```rust,ignore
/// let deferred = Arc::new(Deferred::new());
/// let value = Value::Deferred(deferred.clone());
///
/// reactor.add_timer(Duration::from_millis(50), move || {
///     deferred.succeed(vec![Value::Int(42)]);
/// })?;
/// ```
pub struct Deferred {
    state: Mutex<State>,
}

impl Deferred {
    /// Creates a pending deferred.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Pending {
                callbacks: Vec::new(),
                errbacks: Vec::new(),
            }),
        }
    }

    /// Resolves successfully with `values`.
    ///
    /// Returns `false` if the deferred was already resolved.
    pub fn succeed(&self, values: Vec<Value>) -> bool {
        self.resolve(State::Succeeded(values.clone()), true, values)
    }

    /// Resolves as failed with `values`, conventionally one error.
    ///
    /// Returns `false` if the deferred was already resolved.
    pub fn fail(&self, values: Vec<Value>) -> bool {
        self.resolve(State::Failed(values.clone()), false, values)
    }

    /// Current resolution state.
    pub fn status(&self) -> DeferredStatus {
        match &*self.lock() {
            State::Pending { .. } => DeferredStatus::Pending,
            State::Succeeded(_) => DeferredStatus::Succeeded,
            State::Failed(_) => DeferredStatus::Failed,
        }
    }

    /// Returns `true` once the deferred has succeeded or failed.
    pub fn is_resolved(&self) -> bool {
        self.status() != DeferredStatus::Pending
    }

    fn resolve(&self, resolved: State, success: bool, values: Vec<Value>) -> bool {
        let mut state = self.lock();

        let State::Pending {
            callbacks,
            errbacks,
        } = &mut *state
        else {
            return false;
        };

        let listeners = if success {
            mem::take(callbacks)
        } else {
            mem::take(errbacks)
        };

        *state = resolved;
        drop(state);

        for listener in listeners {
            listener(values.clone());
        }

        true
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Deferred {
    fn default() -> Self {
        Self::new()
    }
}

impl Deferrable for Deferred {
    fn callback(&self, f: Callback) {
        let mut state = self.lock();

        match &mut *state {
            State::Pending { callbacks, .. } => callbacks.push(f),
            State::Succeeded(values) => {
                let values = values.clone();
                drop(state);
                f(values);
            }
            State::Failed(_) => {}
        }
    }

    fn errback(&self, f: Callback) {
        let mut state = self.lock();

        match &mut *state {
            State::Pending { errbacks, .. } => errbacks.push(f),
            State::Failed(values) => {
                let values = values.clone();
                drop(state);
                f(values);
            }
            State::Succeeded(_) => {}
        }
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("status", &self.status())
            .finish()
    }
}
