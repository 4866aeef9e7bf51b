//! Reactor lifecycle and event loop.
//!
//! This module implements the background reactor the bridge waits on.
//! The reactor is responsible for:
//! - running scheduled jobs on its own thread,
//! - firing timers,
//! - capturing panics raised by those jobs.
//!
//! There is exactly one reactor per process. It is started lazily by
//! [`ensure_running`] (or a configured [`ReactorBuilder`]) and is never
//! stopped by this crate, since other users may still depend on it.

mod command;
mod core;
mod error;
mod handle;
mod lifecycle;
mod poller;
mod timer;

pub use error::{ReactorFault, ReactorStartError, ReactorStopped};
pub use handle::ReactorHandle;
pub use lifecycle::{ReactorBuilder, current, ensure_running, is_running};
