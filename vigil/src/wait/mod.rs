//! The blocking bridge.
//!
//! [`wait_for`] parks the calling thread until a deferred resolves on the
//! reactor, a timeout fires or the wait is interrupted. Each call owns a
//! fresh wait state; whichever party settles it first decides the
//! [`Outcome`], and every later attempt is a no-op.

mod core;
mod set;
mod state;

pub use core::{outstanding_waits, wait_for};
pub use state::{Outcome, Phase};

pub(crate) use core::report_fault;
pub(crate) use set::WaitSet;
pub(crate) use state::WaitState;
