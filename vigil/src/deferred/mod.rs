//! Deferred results and their observation.
//!
//! A deferred is a computation whose success or failure becomes known
//! later, usually on the reactor thread. This module defines:
//! - the [`Deferrable`] capability, i.e. the two subscription points,
//! - [`Deferred`], a ready-made implementation hosts can hand out,
//! - [`observe`], which subscribes a pair of fire-once callbacks.

mod core;
mod observe;

pub use core::{Deferred, DeferredStatus};
pub use observe::{Observation, observe};

use crate::value::Value;

use std::fmt;

/// Callback receiving the values a deferred resolved with.
pub type Callback = Box<dyn FnOnce(Vec<Value>) + Send + 'static>;

/// The capability of completing later with success or failure.
///
/// Implementors invoke at most one of the two channels, at most once,
/// passing every value they resolved with. A subscription made after
/// resolution must fire immediately.
pub trait Deferrable: Send + Sync + fmt::Debug {
    /// Subscribes to the success channel.
    fn callback(&self, f: Callback);

    /// Subscribes to the failure channel.
    fn errback(&self, f: Callback);
}
