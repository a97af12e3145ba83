//! Listeners that do not keep their owner alive.
//!
//! A [`WeakListener`] holds a `Weak` reference to its owner and forwards
//! events only while the owner is alive. Once the owner is dropped the
//! adapter reports itself as reclaimed, and the registry it sits in removes
//! it during its next notification (or the next `add`). The upstream
//! observable therefore never has to be told about the owner's destruction.

use std::rc::{Rc, Weak};

use crate::observable::{Observable, ObservableValue};

use super::{ChangeListener, InvalidationListener};

/// A listener adapter bound to a weakly held owner.
///
/// The forwarding function receives the upgraded owner handle.
pub struct WeakListener<O: ?Sized, F> {
    owner: Weak<O>,
    forward: F,
}

impl<O: ?Sized, F> WeakListener<O, F> {
    pub fn new(owner: &Rc<O>, forward: F) -> Self {
        Self {
            owner: Rc::downgrade(owner),
            forward,
        }
    }

    pub fn owner_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }

    /// The owner if it is still alive, together with the forwarding function.
    pub(crate) fn upgrade(&self) -> Option<(Rc<O>, &F)> {
        self.owner.upgrade().map(|owner| (owner, &self.forward))
    }
}

impl<O, F> InvalidationListener for WeakListener<O, F>
where
    O: ?Sized,
    F: Fn(&Rc<O>, &dyn Observable),
{
    fn invalidated(&self, observable: &dyn Observable) {
        match self.owner.upgrade() {
            Some(owner) => (self.forward)(&owner, observable),
            None => tracing::trace!(
                observable = %observable.observable_id(),
                "weak listener owner dropped, not forwarding"
            ),
        }
    }

    fn was_reclaimed(&self) -> bool {
        !self.owner_alive()
    }
}

impl<O, T, F> ChangeListener<T> for WeakListener<O, F>
where
    O: ?Sized,
    F: Fn(&Rc<O>, &dyn ObservableValue<T>, &T, &T),
{
    fn changed(&self, observable: &dyn ObservableValue<T>, old: &T, new: &T) {
        if let Some(owner) = self.owner.upgrade() {
            (self.forward)(&owner, observable, old, new);
        }
    }

    fn was_reclaimed(&self) -> bool {
        !self.owner_alive()
    }
}

/// Build an invalidation listener that forwards to `owner` while it lives.
pub fn weak_invalidation_listener<O, F>(owner: &Rc<O>, forward: F) -> Rc<dyn InvalidationListener>
where
    O: ?Sized + 'static,
    F: Fn(&Rc<O>, &dyn Observable) + 'static,
{
    Rc::new(WeakListener::new(owner, forward))
}

/// Build a change listener that forwards to `owner` while it lives.
pub fn weak_change_listener<O, T, F>(owner: &Rc<O>, forward: F) -> Rc<dyn ChangeListener<T>>
where
    O: ?Sized + 'static,
    T: 'static,
    F: Fn(&Rc<O>, &dyn ObservableValue<T>, &T, &T) + 'static,
{
    Rc::new(WeakListener::new(owner, forward))
}

/// Wrap `listener` so that registering the wrapper does not keep
/// `listener` alive. The caller must hold the strong handle.
pub fn weak_wrapper(listener: &Rc<dyn InvalidationListener>) -> Rc<dyn InvalidationListener> {
    weak_invalidation_listener(listener, |inner: &Rc<dyn InvalidationListener>, observable| {
        inner.invalidated(observable)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::invalidation_listener;
    use crate::property::Property;
    use std::cell::Cell;

    #[test]
    fn forwards_while_owner_alive() {
        let owner = Rc::new(Cell::new(0u32));
        let listener = weak_invalidation_listener(&owner, |count: &Rc<Cell<u32>>, _| {
            count.set(count.get() + 1)
        });
        let p = Property::new(1);
        listener.invalidated(&p);
        assert_eq!(owner.get(), 1);
        assert!(!listener.was_reclaimed());
    }

    #[test]
    fn reclaimed_after_owner_drop() {
        let owner = Rc::new(Cell::new(0u32));
        let listener = weak_invalidation_listener(&owner, |count: &Rc<Cell<u32>>, _| {
            count.set(count.get() + 1)
        });
        drop(owner);
        assert!(listener.was_reclaimed());
        // Forwarding to a dropped owner is silently skipped.
        listener.invalidated(&Property::new(1));
    }

    #[test]
    fn wrapped_listener_is_pruned_from_source() {
        let p = Property::new(0);
        let calls = Rc::new(Cell::new(0u32));
        let calls_clone = Rc::clone(&calls);
        let strong = invalidation_listener(move |_| calls_clone.set(calls_clone.get() + 1));
        p.add_listener(weak_wrapper(&strong));

        p.set(1).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(p.invalidation_listener_count(), 1);

        drop(strong);
        p.get();
        p.set(2).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(p.invalidation_listener_count(), 0);
    }
}
