//! Lazily computed values derived from other observables.
//!
//! [`Computed<T>`] registers a weak invalidation listener on each dependency.
//! A dependency change only flips the validity flag and notifies once; the
//! compute function runs on the next read. Because the listeners are weak, a
//! dropped `Computed` does not linger in its dependencies' listener lists
//! past their next notification.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::listener::{
    weak_invalidation_listener, ChangeListener, InvalidationListener, ListenerRegistry,
};
use crate::observable::{Observable, ObservableId, ObservableValue};
use crate::runtime::ReactiveRuntime;

struct ComputedInner<T> {
    id: ObservableId,
    name: Option<String>,
    compute: Box<dyn Fn() -> T>,
    cached: RefCell<Option<T>>,
    valid: Cell<bool>,
    listeners: ListenerRegistry<T>,
    dependencies: RefCell<Vec<Rc<dyn Observable>>>,
    dependency_listener: RefCell<Option<Rc<dyn InvalidationListener>>>,
}

/// A memoized value computed from other observables.
///
/// Cloning a `Computed` creates a new handle to the same value.
///
/// ```
/// use proplink::{Computed, Property};
///
/// let width = Property::new(3);
/// let height = Property::new(4);
/// let area = Computed::builder({
///     let (w, h) = (width.clone(), height.clone());
///     move || w.get() * h.get()
/// })
/// .depends_on(&width)
/// .depends_on(&height)
/// .build();
///
/// assert_eq!(area.get(), 12);
/// width.set(5).unwrap();
/// assert_eq!(area.get(), 20);
/// ```
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

pub struct ComputedBuilder<T> {
    compute: Box<dyn Fn() -> T>,
    name: Option<String>,
    dependencies: Vec<Rc<dyn Observable>>,
}

impl<T: Clone + PartialEq + 'static> ComputedBuilder<T> {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn depends_on<O>(mut self, dependency: &O) -> Self
    where
        O: Observable + Clone + 'static,
    {
        self.dependencies.push(Rc::new(dependency.clone()));
        self
    }

    pub fn build(self) -> Computed<T> {
        let inner = Rc::new(ComputedInner {
            id: ReactiveRuntime::next_id(),
            name: self.name,
            compute: self.compute,
            cached: RefCell::new(None),
            valid: Cell::new(false),
            listeners: ListenerRegistry::new(),
            dependencies: RefCell::new(Vec::new()),
            dependency_listener: RefCell::new(None),
        });
        let listener = weak_invalidation_listener(&inner, |inner: &Rc<ComputedInner<T>>, _| {
            Computed {
                inner: Rc::clone(inner),
            }
            .invalidate()
        });
        for dependency in &self.dependencies {
            dependency.add_listener(Rc::clone(&listener));
        }
        *inner.dependencies.borrow_mut() = self.dependencies;
        *inner.dependency_listener.borrow_mut() = Some(listener);
        Computed { inner }
    }
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
    pub fn builder(compute: impl Fn() -> T + 'static) -> ComputedBuilder<T> {
        ComputedBuilder {
            compute: Box::new(compute),
            name: None,
            dependencies: Vec::new(),
        }
    }

    /// Current value, recomputed if a dependency changed since the last read.
    pub fn get(&self) -> T {
        if !self.inner.valid.get() {
            let value = (self.inner.compute)();
            *self.inner.cached.borrow_mut() = Some(value.clone());
            self.inner.valid.set(true);
            return value;
        }
        match self.inner.cached.borrow().as_ref() {
            Some(value) => value.clone(),
            None => (self.inner.compute)(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.inner.valid.get()
    }

    /// Mark the cached value stale and notify listeners, once per valid edge.
    pub fn invalidate(&self) {
        if !self.inner.valid.replace(false) {
            return;
        }
        tracing::trace!(computed = %self.display_name(), "invalidated");
        if !self.inner.listeners.fire(self) {
            // Re-arm without a cache: reads recompute until the next edge.
            self.inner.cached.borrow_mut().take();
            self.inner.valid.set(true);
        }
    }

    /// Stop observing all dependencies. The last value stays readable but
    /// will not be invalidated by dependencies again.
    pub fn dispose(&self) {
        let dependencies = std::mem::take(&mut *self.inner.dependencies.borrow_mut());
        if let Some(listener) = self.inner.dependency_listener.borrow_mut().take() {
            for dependency in &dependencies {
                dependency.remove_listener(&listener);
            }
        }
    }

    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    pub fn invalidation_listener_count(&self) -> usize {
        self.inner.listeners.invalidation_listener_count()
    }
}

impl<T: Clone + PartialEq + 'static> Observable for Computed<T> {
    fn observable_id(&self) -> ObservableId {
        self.inner.id
    }

    fn display_name(&self) -> String {
        match &self.inner.name {
            Some(name) => name.clone(),
            None => format!("Computed{}", self.inner.id),
        }
    }

    fn add_listener(&self, listener: Rc<dyn InvalidationListener>) {
        self.inner.listeners.add_invalidation_listener(listener);
    }

    fn remove_listener(&self, listener: &Rc<dyn InvalidationListener>) {
        self.inner.listeners.remove_invalidation_listener(listener);
    }
}

impl<T: Clone + PartialEq + 'static> ObservableValue<T> for Computed<T> {
    fn value(&self) -> T {
        self.get()
    }

    fn add_change_listener(&self, listener: Rc<dyn ChangeListener<T>>) {
        self.inner
            .listeners
            .add_change_listener(listener, || self.get());
    }

    fn remove_change_listener(&self, listener: &Rc<dyn ChangeListener<T>>) {
        self.inner.listeners.remove_change_listener(listener);
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("cached", &self.inner.cached.borrow())
            .field("valid", &self.inner.valid.get())
            .finish()
    }
}
