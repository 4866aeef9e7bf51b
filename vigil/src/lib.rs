//! # Vigil
//!
//! **Vigil** blocks an interactive, synchronous caller on a deferred result
//! that is driven by a background reactor thread.
//!
//! A shell user types `em: <expression>`; the expression evaluates to a
//! deferred that will succeed or fail later on the reactor. Vigil keeps the
//! reactor running on its own thread, parks the shell's thread until the
//! deferred resolves, a timeout fires, or the user interrupts, and then
//! hands back one shell-friendly value or a proper error.
//!
//! It provides:
//!
//! - A **process-wide reactor** started once on demand, running jobs and
//!   timers and capturing panics raised on its thread
//! - A **deferred** capability with fire-once success and failure channels
//! - A **blocking wait** where the first of success, failure, timeout,
//!   interruption or reactor error wins
//! - A **translator** that collapses results into a single value and
//!   annotates non-success outcomes for display
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use vigil::{Deferred, Value};
//!
//! let reactor = vigil::reactor::ensure_running()?;
//!
//! let deferred = Arc::new(Deferred::new());
//! let resolver = deferred.clone();
//! reactor.add_timer(Duration::from_millis(50), move || {
//!     resolver.succeed(vec![Value::Int(42)]);
//! })?;
//!
//! let value = vigil::block_on(Value::Deferred(deferred), Some(Duration::from_secs(1)))?;
//! assert_eq!(value, Value::Int(42));
//! ```
//!
//! ## Modules
//!
//! - [`reactor`] — Reactor lifecycle, jobs and timers
//! - [`deferred`] — The deferrable capability and its observation
//! - [`wait`] — The blocking wait and its outcomes
//! - [`command`] — The `em [timeout]: <source>` shell command

mod error;
mod interrupt;
mod translate;
mod utils;
mod value;

pub mod command;
pub mod deferred;
pub mod reactor;
pub mod wait;

pub use command::{EmCommand, EmRequest, Evaluator};
pub use deferred::{Deferrable, Deferred};
pub use error::BridgeError;
pub use interrupt::Interrupt;
pub use translate::translate;
pub use value::{ErrorValue, Value};

use std::io;
use std::time::Duration;

/// Waits for `value` on the process-wide reactor and returns its result.
///
/// Starts the reactor if needed, waits as [`wait::wait_for`] does with a
/// private, never-triggered [`Interrupt`], and translates the outcome
/// without printing annotations. `None` waits forever.
pub fn block_on(value: Value, timeout: Option<Duration>) -> Result<Value, BridgeError> {
    let reactor = reactor::ensure_running()?;
    let outcome = wait::wait_for(reactor, value, timeout, &Interrupt::new())?;

    translate(outcome, &mut io::sink())
}
