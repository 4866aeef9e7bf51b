//! Small internal data structures.
//!
//! This module exposes a [`Slab`] used for keyed storage with reuse of
//! freed slots, which backs the sets of outstanding waits.

mod slab;

pub(crate) use slab::Slab;
