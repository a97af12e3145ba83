use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::binding::value::{check_bind, ValueBinding};
use crate::binding::Computed;
use crate::error::{BindError, Result};
use crate::listener::{
    weak_invalidation_listener, ChangeListener, InvalidationListener, ListenerRegistry,
};
use crate::observable::{Observable, ObservableId, ObservableValue};
use crate::runtime::ReactiveRuntime;

type InvalidatedHook<T> = Box<dyn Fn(&Property<T>)>;

struct PropertyState<T> {
    value: T,
    /// False while the cached value may be stale. Notifications are only
    /// sent on the valid -> invalid edge.
    valid: bool,
    binding: Option<ValueBinding<T>>,
}

struct PropertyInner<T> {
    id: ObservableId,
    name: Option<String>,
    fixed: Cell<bool>,
    state: RefCell<PropertyState<T>>,
    listeners: ListenerRegistry<T>,
    on_invalidated: Option<InvalidatedHook<T>>,
    /// Registered on the binding source; created on first bind.
    binding_listener: RefCell<Option<Rc<dyn InvalidationListener>>>,
}

/// A typed, observable, bindable value.
///
/// Cloning a `Property` creates a new handle to the **same** property.
///
/// Writes go through [`set`](Self::set) unless the property is value-bound,
/// in which case the value mirrors the binding source and writes fail.
/// Invalidation is lazy: a change marks the property invalid and notifies
/// listeners once; further changes are silent until somebody reads the
/// value again.
///
/// # Examples
///
/// ```
/// use proplink::Property;
///
/// let source = Property::new(1);
/// let target = Property::new(0);
/// target.bind(&source).unwrap();
///
/// source.set(5).unwrap();
/// assert_eq!(target.get(), 5);
/// assert!(target.set(6).is_err());
///
/// target.unbind().unwrap();
/// target.set(6).unwrap();
/// assert_eq!(target.get(), 6);
/// ```
pub struct Property<T> {
    inner: Rc<PropertyInner<T>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Builder for properties that need a name or an invalidation hook.
pub struct PropertyBuilder<T> {
    value: T,
    name: Option<String>,
    on_invalidated: Option<InvalidatedHook<T>>,
}

impl<T: Clone + PartialEq + 'static> PropertyBuilder<T> {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Hook run each time the property turns invalid, before any listener
    /// is notified. Caches derived from the value should be dropped here.
    pub fn on_invalidated(mut self, hook: impl Fn(&Property<T>) + 'static) -> Self {
        self.on_invalidated = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Property<T> {
        Property {
            inner: Rc::new(PropertyInner {
                id: ReactiveRuntime::next_id(),
                name: self.name,
                fixed: Cell::new(false),
                state: RefCell::new(PropertyState {
                    value: self.value,
                    valid: true,
                    binding: None,
                }),
                listeners: ListenerRegistry::new(),
                on_invalidated: self.on_invalidated,
                binding_listener: RefCell::new(None),
            }),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    pub fn new(value: T) -> Self {
        Self::builder(value).build()
    }

    pub fn named(name: impl Into<String>, value: T) -> Self {
        Self::builder(value).name(name).build()
    }

    pub fn builder(value: T) -> PropertyBuilder<T> {
        PropertyBuilder {
            value,
            name: None,
            on_invalidated: None,
        }
    }

    /// A property permanently bound to `source`.
    ///
    /// [`bind`](Self::bind) and [`unbind`](Self::unbind) on the result fail
    /// with [`BindError::IllegalState`].
    pub fn fixed<S>(source: &S) -> Self
    where
        S: ObservableValue<T> + Clone + 'static,
    {
        let property = Self::new(source.value());
        property.attach(Rc::new(source.clone()));
        property.inner.fixed.set(true);
        property
    }

    pub fn id(&self) -> ObservableId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.state.borrow().valid
    }

    pub fn is_bound(&self) -> bool {
        self.inner.state.borrow().binding.is_some()
    }

    pub fn is_fixed(&self) -> bool {
        self.inner.fixed.get()
    }

    /// Current value. A bound property pulls from its source here.
    pub fn get(&self) -> T {
        let source = self
            .inner
            .state
            .borrow()
            .binding
            .as_ref()
            .map(ValueBinding::source);

        // The source is read with no borrow held: it may be arbitrarily
        // deep and may call back into this property's listeners.
        let pulled = source.map(|source| source.value());

        let mut state = self.inner.state.borrow_mut();
        if let Some(value) = pulled {
            state.value = value;
        }
        state.valid = true;
        state.value.clone()
    }

    /// Set a new value.
    ///
    /// Fails with [`BindError::BoundPropertyWrite`] while value-bound.
    /// Setting a value equal to the cached one does nothing.
    pub fn set(&self, value: T) -> Result<()> {
        if self.is_bound() {
            return Err(BindError::bound_write(self.display_name()));
        }
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            if state.value == value {
                false
            } else {
                state.value = value;
                true
            }
        };
        if changed {
            self.mark_invalid();
        }
        Ok(())
    }

    /// Modify a copy of the value and store it back with [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<()> {
        if self.is_bound() {
            return Err(BindError::bound_write(self.display_name()));
        }
        let mut value = self.inner.state.borrow().value.clone();
        f(&mut value);
        self.set(value)
    }

    /// Bind to `source`, replacing any previous binding.
    pub fn bind<S>(&self, source: &S) -> Result<()>
    where
        S: ObservableValue<T> + Clone + 'static,
    {
        self.bind_shared(Rc::new(source.clone()))
    }

    /// [`bind`](Self::bind) for a source that is already type-erased.
    pub fn bind_shared(&self, source: Rc<dyn ObservableValue<T>>) -> Result<()> {
        if self.is_fixed() {
            return Err(BindError::illegal_state(
                self.display_name(),
                "a fixed binding cannot be replaced",
            ));
        }

        let current = self
            .inner
            .state
            .borrow()
            .binding
            .as_ref()
            .map(ValueBinding::source_id);
        if current == Some(source.observable_id()) {
            return Ok(());
        }
        check_bind(self.id(), &self.display_name(), source.as_ref())?;

        self.detach();
        tracing::debug!(
            property = %self.display_name(),
            source = %source.observable_id(),
            "bind"
        );
        self.attach(source);
        Ok(())
    }

    /// Drop the binding, keeping the last value of the source.
    pub fn unbind(&self) -> Result<()> {
        if self.is_fixed() {
            return Err(BindError::illegal_state(
                self.display_name(),
                "a fixed binding cannot be removed",
            ));
        }
        if self.detach() {
            tracing::debug!(property = %self.display_name(), "unbind");
        }
        Ok(())
    }

    /// Notify listeners as if the value had changed. Change listeners still
    /// only fire when the value actually differs from the last one they saw.
    pub fn fire_value_changed(&self) {
        self.inner.listeners.fire(self);
    }

    /// Register a closure as invalidation listener. Keep the returned handle
    /// to remove it later.
    pub fn on_invalidation(
        &self,
        f: impl Fn(&dyn Observable) + 'static,
    ) -> Rc<dyn InvalidationListener> {
        let listener: Rc<dyn InvalidationListener> = Rc::new(f);
        self.add_listener(Rc::clone(&listener));
        listener
    }

    /// Register a closure receiving `(old, new)` as change listener.
    pub fn on_change(&self, f: impl Fn(&T, &T) + 'static) -> Rc<dyn ChangeListener<T>> {
        let listener: Rc<dyn ChangeListener<T>> =
            Rc::new(move |_: &dyn ObservableValue<T>, old: &T, new: &T| f(old, new));
        self.add_change_listener(Rc::clone(&listener));
        listener
    }

    pub fn invalidation_listener_count(&self) -> usize {
        self.inner.listeners.invalidation_listener_count()
    }

    pub fn change_listener_count(&self) -> usize {
        self.inner.listeners.change_listener_count()
    }

    /// A lazily computed view of this property.
    pub fn map<U, F>(&self, f: F) -> Computed<U>
    where
        U: Clone + PartialEq + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let source = self.clone();
        Computed::builder(move || f(&source.get()))
            .depends_on(self)
            .build()
    }

    fn attach(&self, source: Rc<dyn ObservableValue<T>>) {
        let binding = ValueBinding::attach(source, self.binding_listener());
        self.inner.state.borrow_mut().binding = Some(binding);
        self.mark_invalid();
    }

    /// Remove the current binding, if any. Returns whether one existed.
    fn detach(&self) -> bool {
        let binding = self.inner.state.borrow_mut().binding.take();
        match binding {
            Some(binding) => {
                let last = binding.detach();
                self.inner.state.borrow_mut().value = last;
                true
            }
            None => false,
        }
    }

    fn binding_listener(&self) -> Rc<dyn InvalidationListener> {
        let mut slot = self.inner.binding_listener.borrow_mut();
        let listener = slot.get_or_insert_with(|| {
            weak_invalidation_listener(&self.inner, |inner: &Rc<PropertyInner<T>>, _| {
                Property {
                    inner: Rc::clone(inner),
                }
                .mark_invalid()
            })
        });
        Rc::clone(listener)
    }

    fn mark_invalid(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.valid {
                return;
            }
            state.valid = false;
        }
        tracing::trace!(property = %self.display_name(), "invalidated");
        if let Some(hook) = &self.inner.on_invalidated {
            hook(self);
        }
        if !self.inner.listeners.fire(self) {
            // Nobody heard about this edge, so the next change must notify.
            self.inner.state.borrow_mut().valid = true;
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable for Property<T> {
    fn observable_id(&self) -> ObservableId {
        self.inner.id
    }

    fn display_name(&self) -> String {
        match &self.inner.name {
            Some(name) => name.clone(),
            None => format!("Property{}", self.inner.id),
        }
    }

    fn add_listener(&self, listener: Rc<dyn InvalidationListener>) {
        self.inner.listeners.add_invalidation_listener(listener);
    }

    fn remove_listener(&self, listener: &Rc<dyn InvalidationListener>) {
        self.inner.listeners.remove_invalidation_listener(listener);
    }
}

impl<T: Clone + PartialEq + 'static> ObservableValue<T> for Property<T> {
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

    fn bound_source(&self) -> Option<Rc<dyn ObservableValue<T>>> {
        self.inner
            .state
            .borrow()
            .binding
            .as_ref()
            .map(ValueBinding::source)
    }
}

impl<T: fmt::Debug> fmt::Display for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.write_str("Property [")?;
        if let Some(name) = &self.inner.name {
            write!(f, "name: {name}, ")?;
        }
        if state.binding.is_some() {
            f.write_str("bound, ")?;
            if state.valid {
                write!(f, "value: {:?}", state.value)?;
            } else {
                f.write_str("invalid")?;
            }
        } else {
            write!(f, "value: {:?}", state.value)?;
        }
        f.write_str("]")
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Property")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("value", &state.value)
            .field("valid", &state.valid)
            .field("bound", &state.binding.is_some())
            .finish()
    }
}
