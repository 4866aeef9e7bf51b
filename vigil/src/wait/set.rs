use super::state::WaitState;
use crate::utils::Slab;

use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

/// A set of in-flight waits.
///
/// Used both for the process-wide registry the reactor's error handler
/// consults, and by [`Interrupt`](crate::Interrupt) tokens. Entries are
/// weak: the set never keeps a finished wait alive.
pub(crate) struct WaitSet {
    entries: Mutex<Slab<Weak<WaitState>>>,
}

impl WaitSet {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Slab::new(4)),
        }
    }

    /// Adds a wait and returns the key to remove it with.
    pub(crate) fn insert(&self, state: Weak<WaitState>) -> usize {
        self.lock().insert(state)
    }

    pub(crate) fn remove(&self, key: usize) {
        self.lock().remove(key);
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Applies `f` to every live wait and returns how many accepted.
    ///
    /// The entries are snapshotted first so `f` runs without the set lock.
    pub(crate) fn deliver(&self, f: impl Fn(&WaitState) -> bool) -> usize {
        let live: Vec<_> = self.lock().iter().filter_map(Weak::upgrade).collect();

        live.iter().filter(|state| f(state)).count()
    }

    fn lock(&self) -> MutexGuard<'_, Slab<Weak<WaitState>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::WaitSet;
    use crate::wait::state::{Outcome, WaitState};

    use std::sync::Arc;

    #[test]
    fn delivers_only_to_live_waits() {
        let set = WaitSet::new();

        let live = Arc::new(WaitState::new());
        let dead = Arc::new(WaitState::new());

        set.insert(Arc::downgrade(&live));
        let dead_key = set.insert(Arc::downgrade(&dead));
        drop(dead);

        assert_eq!(set.deliver(|s| s.settle(Outcome::Interrupted)), 1);
        assert_eq!(set.deliver(|s| s.settle(Outcome::Interrupted)), 0);

        set.remove(dead_key);
        assert_eq!(set.len(), 1);
    }
}
