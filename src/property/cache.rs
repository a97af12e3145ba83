use std::cell::RefCell;

/// A lazily computed value that is dropped whenever the inputs it was
/// derived from are invalidated.
///
/// Pair it with [`PropertyBuilder::on_invalidated`](super::PropertyBuilder::on_invalidated)
/// so the cache is cleared on the same edge that notifies listeners; a
/// reader can then never observe a value computed from stale inputs.
///
/// ```
/// use std::rc::Rc;
/// use proplink::{DerivedCache, Property};
///
/// let baseline = Rc::new(DerivedCache::new());
/// let hook = Rc::clone(&baseline);
/// let spacing = Property::builder(4.0_f64)
///     .on_invalidated(move |_| hook.invalidate())
///     .build();
///
/// assert_eq!(baseline.get_or_compute(|| spacing.get() * 2.0), 8.0);
/// spacing.set(5.0).unwrap();
/// assert!(!baseline.is_cached());
/// ```
#[derive(Debug)]
pub struct DerivedCache<T> {
    slot: RefCell<Option<T>>,
}

impl<T> Default for DerivedCache<T> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }
}

impl<T: Clone> DerivedCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value, computing it first if needed.
    ///
    /// `compute` runs with no borrow held, so it may read properties whose
    /// invalidation hooks clear this very cache.
    pub fn get_or_compute(&self, compute: impl FnOnce() -> T) -> T {
        if let Some(value) = self.slot.borrow().as_ref() {
            return value.clone();
        }
        let value = compute();
        *self.slot.borrow_mut() = Some(value.clone());
        value
    }

    pub fn invalidate(&self) {
        self.slot.borrow_mut().take();
    }

    pub fn is_cached(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn computes_once_until_invalidated() {
        let cache = DerivedCache::new();
        let runs = Cell::new(0);
        let compute = || {
            runs.set(runs.get() + 1);
            42
        };
        assert_eq!(cache.get_or_compute(compute), 42);
        assert_eq!(cache.get_or_compute(compute), 42);
        assert_eq!(runs.get(), 1);

        cache.invalidate();
        assert!(!cache.is_cached());
        assert_eq!(cache.get_or_compute(compute), 42);
        assert_eq!(runs.get(), 2);
    }
}
