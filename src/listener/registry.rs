use std::cell::RefCell;
use std::rc::Rc;

use crate::observable::{Observable, ObservableValue};
use crate::runtime::ReactiveRuntime;

use super::{ChangeListener, InvalidationListener};

/// Lets a [`ListenerList`] ask whether an entry's owner is gone.
pub trait Reclaimable {
    fn is_reclaimed(&self) -> bool;
}

/// An ordered, removal-tolerant list of listener handles.
///
/// Duplicates are distinct entries. Iteration always runs over a snapshot
/// taken before the first callback, so callbacks may add or remove listeners
/// (including themselves) without disturbing the current cycle. Additions
/// are seen from the next cycle on; removals take effect immediately for
/// the next cycle, but an entry removed mid-cycle is still visited in the
/// cycle that was already running.
pub struct ListenerList<L: ?Sized> {
    entries: RefCell<Vec<Rc<L>>>,
}

impl<L: ?Sized> Default for ListenerList<L> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }
}

impl<L: ?Sized + Reclaimable> ListenerList<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener, dropping any entries whose owner is gone.
    pub fn add(&self, listener: Rc<L>) {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|l| !l.is_reclaimed());
        entries.push(listener);
    }

    /// Remove the first entry that is the same `Rc` as `listener`.
    pub fn remove(&self, listener: &Rc<L>) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().position(|l| Rc::ptr_eq(l, listener)) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, listener: &Rc<L>) -> bool {
        self.entries.borrow().iter().any(|l| Rc::ptr_eq(l, listener))
    }

    /// Number of entries, including reclaimed ones not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Call `f` for every live entry of a snapshot, then prune reclaimed
    /// entries. Returns the number of entries pruned.
    pub fn for_each_live(&self, mut f: impl FnMut(&L)) -> usize {
        let snapshot: Vec<Rc<L>> = self.entries.borrow().clone();
        let mut reclaimed = false;
        for listener in &snapshot {
            if listener.is_reclaimed() {
                reclaimed = true;
                continue;
            }
            f(listener);
        }
        if reclaimed {
            self.prune()
        } else {
            0
        }
    }

    /// Drop entries whose owner is gone.
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|l| !l.is_reclaimed());
        let pruned = before - entries.len();
        if pruned > 0 {
            tracing::trace!(pruned, "pruned reclaimed listeners");
        }
        pruned
    }
}

/// Listener storage for one observable value: invalidation listeners plus
/// change listeners, with the value last reported to change listeners.
///
/// The registry never decides whether to notify; the owning observable
/// calls [`fire`](Self::fire) when its validity protocol says so.
pub struct ListenerRegistry<T> {
    invalidation: ListenerList<dyn InvalidationListener>,
    change: ListenerList<dyn ChangeListener<T>>,
    /// Value seen by change listeners. `Some` iff change listeners exist.
    current: RefCell<Option<T>>,
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self {
            invalidation: ListenerList::default(),
            change: ListenerList::default(),
            current: RefCell::new(None),
        }
    }
}

impl<T: Clone + PartialEq + 'static> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_invalidation_listener(&self, listener: Rc<dyn InvalidationListener>) {
        self.invalidation.add(listener);
    }

    pub fn remove_invalidation_listener(&self, listener: &Rc<dyn InvalidationListener>) {
        self.invalidation.remove(listener);
    }

    /// Register a change listener. `current` is evaluated only when this is
    /// the first change listener, to seed the old value of the next change.
    pub fn add_change_listener(
        &self,
        listener: Rc<dyn ChangeListener<T>>,
        current: impl FnOnce() -> T,
    ) {
        if self.change.is_empty() {
            let value = current();
            *self.current.borrow_mut() = Some(value);
        }
        self.change.add(listener);
    }

    pub fn remove_change_listener(&self, listener: &Rc<dyn ChangeListener<T>>) {
        if self.change.remove(listener) && self.change.is_empty() {
            self.current.borrow_mut().take();
        }
    }

    pub fn invalidation_listener_count(&self) -> usize {
        self.invalidation.len()
    }

    pub fn change_listener_count(&self) -> usize {
        self.change.len()
    }

    pub fn has_listeners(&self) -> bool {
        !self.invalidation.is_empty() || !self.change.is_empty()
    }

    /// Notify invalidation listeners, then change listeners if the value
    /// read back from `observable` differs from the last reported one.
    ///
    /// Returns `false` if the runtime dropped the notification for nesting
    /// too deeply, in which case no listener ran.
    pub fn fire<O>(&self, observable: &O) -> bool
    where
        O: ObservableValue<T>,
    {
        let id = observable.observable_id();
        let runtime = ReactiveRuntime::current();
        let Some(_depth) = runtime.enter_notification(id) else {
            return false;
        };

        tracing::trace!(observable = %id, listeners = self.invalidation.len(), "invalidation fan-out");
        self.invalidation
            .for_each_live(|listener| listener.invalidated(observable as &dyn Observable));

        if self.change.is_empty() {
            return true;
        }
        let new = observable.value();
        let old = self.current.borrow_mut().replace(new.clone());
        match old {
            Some(old) if old != new => {
                self.change.for_each_live(|listener| {
                    listener.changed(observable as &dyn ObservableValue<T>, &old, &new)
                });
            }
            _ => {}
        }
        if self.change.is_empty() {
            // Every change listener was reclaimed during this cycle.
            self.current.borrow_mut().take();
        }
        true
    }
}
