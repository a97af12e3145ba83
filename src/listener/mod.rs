//! Listener traits, the per-observable listener registry and weak adapters.
//!
//! Listeners are stored as `Rc<dyn ...>` handles. Any closure with the
//! right signature is a listener; removal matches the exact `Rc` that was
//! registered.

mod registry;
mod weak;

use std::rc::Rc;

use crate::observable::{Observable, ObservableValue};

pub use registry::{ListenerList, ListenerRegistry, Reclaimable};
pub use weak::{weak_change_listener, weak_invalidation_listener, weak_wrapper, WeakListener};

/// Receives "the value may be stale" signals.
pub trait InvalidationListener {
    fn invalidated(&self, observable: &dyn Observable);

    /// True once the logical owner of this listener is gone. Registries
    /// skip such entries and drop them on the next notification.
    fn was_reclaimed(&self) -> bool {
        false
    }
}

impl<F> InvalidationListener for F
where
    F: Fn(&dyn Observable),
{
    fn invalidated(&self, observable: &dyn Observable) {
        self(observable)
    }
}

/// Receives old/new value pairs.
pub trait ChangeListener<T> {
    fn changed(&self, observable: &dyn ObservableValue<T>, old: &T, new: &T);

    fn was_reclaimed(&self) -> bool {
        false
    }
}

impl<T, F> ChangeListener<T> for F
where
    F: Fn(&dyn ObservableValue<T>, &T, &T),
{
    fn changed(&self, observable: &dyn ObservableValue<T>, old: &T, new: &T) {
        self(observable, old, new)
    }
}

impl Reclaimable for dyn InvalidationListener {
    fn is_reclaimed(&self) -> bool {
        self.was_reclaimed()
    }
}

impl<T> Reclaimable for dyn ChangeListener<T> {
    fn is_reclaimed(&self) -> bool {
        self.was_reclaimed()
    }
}

/// Box a closure as an invalidation listener handle.
pub fn invalidation_listener<F>(f: F) -> Rc<dyn InvalidationListener>
where
    F: Fn(&dyn Observable) + 'static,
{
    Rc::new(f)
}

/// Box a closure as a change listener handle.
pub fn change_listener<T, F>(f: F) -> Rc<dyn ChangeListener<T>>
where
    T: 'static,
    F: Fn(&dyn ObservableValue<T>, &T, &T) + 'static,
{
    Rc::new(f)
}
