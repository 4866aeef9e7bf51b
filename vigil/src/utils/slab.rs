/// A simple slab of reusable slots.
///
/// A `Slab` stores values of type `T` in a contiguous vector and hands
/// out small indices that stay valid until the value is removed. Freed
/// indices are recycled by later insertions.
///
/// It backs the wait sets, where entries come and go with every
/// blocking call and must be removable by key from an RAII guard.
pub(crate) struct Slab<T> {
    /// Storage for entries; `None` marks a free slot.
    items: Vec<Option<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
}

impl<T> Slab<T> {
    /// Creates an empty `Slab` with room for `size` entries.
    pub(crate) fn new(size: usize) -> Self {
        Self {
            items: Vec::with_capacity(size),
            free: Vec::new(),
        }
    }

    /// Inserts a value and returns its index.
    ///
    /// A free slot is reused when available, otherwise the slab grows.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.items[index] = Some(item);
                index
            }
            None => {
                self.items.push(Some(item));
                self.items.len() - 1
            }
        }
    }

    /// Removes and returns the value stored at `index`.
    ///
    /// Returns `None` if the slot is out of range or already free, so a
    /// double removal is harmless.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        let item = self.items.get_mut(index)?.take()?;
        self.free.push(index);

        Some(item)
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.items.len() - self.free.len()
    }

    /// Iterates over the occupied slots.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::Slab;

    #[test]
    fn reuses_freed_indices() {
        let mut slab = Slab::new(2);
        let a = slab.insert("a");
        let b = slab.insert("b");

        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.len(), 1);

        let c = slab.insert("c");
        assert_eq!(c, a);
        assert_eq!(slab.iter().copied().collect::<Vec<_>>(), vec!["c", "b"]);
        assert_ne!(b, c);
    }

    #[test]
    fn double_remove_is_none() {
        let mut slab = Slab::new(0);
        let idx = slab.insert(7);

        assert_eq!(slab.remove(idx), Some(7));
        assert_eq!(slab.remove(idx), None);
        assert_eq!(slab.remove(42), None);
        assert_eq!(slab.len(), 0);
    }
}
