//! Observable abstractions shared by properties, computed bindings and lists.
//!
//! - [`Observable`]: something that can be watched for invalidation.
//! - [`ObservableValue`]: an observable that also yields a value and reports
//!   old/new pairs to change listeners.
//!
//! Every observable carries a stable [`ObservableId`]. Handles are cheap to
//! clone and all clones share one identity, so identity comparisons (rebind
//! short-circuits, self-binding checks) go through the id rather than through
//! pointer equality of a particular handle.

use std::fmt;
use std::rc::Rc;

use crate::listener::{ChangeListener, InvalidationListener};

/// Identity of an observable, unique per thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservableId(pub(crate) u64);

impl fmt::Display for ObservableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An entity that can report that its value may have become stale.
pub trait Observable {
    fn observable_id(&self) -> ObservableId;

    /// Human readable name used in errors and log lines.
    fn display_name(&self) -> String {
        self.observable_id().to_string()
    }

    fn add_listener(&self, listener: Rc<dyn InvalidationListener>);

    /// Remove one registration of `listener`, matched by pointer identity.
    /// Removing a listener that was never added is a no-op.
    fn remove_listener(&self, listener: &Rc<dyn InvalidationListener>);
}

/// An [`Observable`] that wraps a value of type `T`.
pub trait ObservableValue<T>: Observable {
    /// Current value. Reading may revalidate a lazily invalidated observable.
    fn value(&self) -> T;

    fn add_change_listener(&self, listener: Rc<dyn ChangeListener<T>>);

    fn remove_change_listener(&self, listener: &Rc<dyn ChangeListener<T>>);

    /// The observable this one is value-bound to, if any.
    ///
    /// Used to reject binding chains that would loop back on themselves.
    fn bound_source(&self) -> Option<Rc<dyn ObservableValue<T>>> {
        None
    }
}
