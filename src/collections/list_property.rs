use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::list::{weak_list_change_listener, ListChange, ListChangeListener, ListSource};
use super::ObservableList;
use crate::content::{self, ContentState, Endpoint};
use crate::error::{BindError, Result};
use crate::listener::{ChangeListener, InvalidationListener, ListenerList};
use crate::observable::{Observable, ObservableId, ObservableValue};
use crate::property::Property;

type Observed<E> = (ObservableList<E>, Rc<dyn ListChangeListener<E>>);

struct ListPropertyInner<E> {
    property: Property<Option<ObservableList<E>>>,
    list_listeners: ListenerList<dyn ListChangeListener<E>>,
    /// The list currently forwarded from, with the forwarder registered on it.
    observed: RefCell<Option<Observed<E>>>,
    content: RefCell<ContentState<E>>,
}

/// A property whose value is an optional [`ObservableList`].
///
/// Besides the usual property notifications, a `ListProperty` relays every
/// structural change of the list it currently holds to its own list change
/// listeners. Replacing the list is reported to them as one change replacing
/// the old elements with the new ones.
///
/// Content bindings belong to the property, not to the list it holds, and
/// survive the property switching lists. A property holding no list may
/// still be the bound side; it picks the content up once it holds a list.
///
/// ```
/// use proplink::{ListProperty, ObservableList};
///
/// let items = ListProperty::new(ObservableList::from_vec(vec![1, 2]));
/// let mirror = ObservableList::new();
/// mirror.bind_content(&items).unwrap();
///
/// items.push(3).unwrap();
/// assert_eq!(mirror.to_vec(), vec![1, 2, 3]);
///
/// items.set(Some(ObservableList::from_vec(vec![7]))).unwrap();
/// assert_eq!(mirror.to_vec(), vec![7]);
/// ```
pub struct ListProperty<E> {
    inner: Rc<ListPropertyInner<E>>,
}

impl<E> Clone for ListProperty<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Non-owning handle to a [`ListProperty`].
pub(crate) struct WeakListProperty<E> {
    inner: Weak<ListPropertyInner<E>>,
}

impl<E> Clone for WeakListProperty<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<E> WeakListProperty<E> {
    pub(crate) fn upgrade(&self) -> Option<ListProperty<E>> {
        self.inner.upgrade().map(|inner| ListProperty { inner })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<E: Clone + PartialEq + 'static> ListProperty<E> {
    pub fn new(list: ObservableList<E>) -> Self {
        Self::with_parts(None, Some(list))
    }

    /// A list property holding no list.
    pub fn empty() -> Self {
        Self::with_parts(None, None)
    }

    pub fn named(name: impl Into<String>, list: ObservableList<E>) -> Self {
        Self::with_parts(Some(name.into()), Some(list))
    }

    fn with_parts(name: Option<String>, list: Option<ObservableList<E>>) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<ListPropertyInner<E>>| {
            let weak = Weak::clone(weak);
            let mut builder = Property::builder(list).on_invalidated(move |_| {
                if let Some(inner) = weak.upgrade() {
                    ListProperty { inner }.track_current_list();
                }
            });
            if let Some(name) = name {
                builder = builder.name(name);
            }
            ListPropertyInner {
                property: builder.build(),
                list_listeners: ListenerList::new(),
                observed: RefCell::new(None),
                content: RefCell::new(ContentState::default()),
            }
        });
        let property = Self { inner };
        property.track_current_list();
        property
    }

    pub fn get(&self) -> Option<ObservableList<E>> {
        self.inner.property.get()
    }

    pub fn set(&self, list: Option<ObservableList<E>>) -> Result<()> {
        self.inner.property.set(list)
    }

    /// Value-bind to another observable list holder.
    pub fn bind<S>(&self, source: &S) -> Result<()>
    where
        S: ObservableValue<Option<ObservableList<E>>> + Clone + 'static,
    {
        self.inner.property.bind(source)
    }

    pub fn unbind(&self) -> Result<()> {
        self.inner.property.unbind()
    }

    pub fn is_bound(&self) -> bool {
        self.inner.property.is_bound()
    }

    /// The underlying property.
    pub fn property(&self) -> &Property<Option<ObservableList<E>>> {
        &self.inner.property
    }

    pub fn len(&self) -> usize {
        self.get().map_or(0, |list| list.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<E> {
        self.get().map(|list| list.to_vec()).unwrap_or_default()
    }

    /// Append to the held list. Fails with `NullArgument` if there is none.
    pub fn push(&self, element: E) -> Result<()> {
        let list = self
            .get()
            .ok_or_else(|| BindError::null(self.display_name()))?;
        list.push(element);
        Ok(())
    }

    pub fn add_list_change_listener(&self, listener: Rc<dyn ListChangeListener<E>>) {
        self.inner.list_listeners.add(listener);
    }

    pub fn remove_list_change_listener(&self, listener: &Rc<dyn ListChangeListener<E>>) {
        self.inner.list_listeners.remove(listener);
    }

    pub fn on_list_change(
        &self,
        f: impl Fn(&ListChange<E>) + 'static,
    ) -> Rc<dyn ListChangeListener<E>> {
        let listener: Rc<dyn ListChangeListener<E>> = Rc::new(f);
        self.add_list_change_listener(Rc::clone(&listener));
        listener
    }

    pub fn list_listener_count(&self) -> usize {
        self.inner.list_listeners.len()
    }

    /// Keep the held list's content equal to `source`'s.
    ///
    /// Switching to another list keeps the binding; the new list is filled
    /// from `source`. Mutating the held list directly removes the binding.
    pub fn bind_content(&self, source: &impl ListSource<E>) -> Result<()> {
        let source = Endpoint::holding_list(source)?;
        content::bind_unidirectional(&self.endpoint(), &source)
    }

    pub fn unbind_content(&self) {
        content::unbind_unidirectional(&self.endpoint());
    }

    pub fn is_content_bound(&self) -> bool {
        self.inner.content.borrow().unidirectional.is_some()
    }

    /// Keep the held list and `other` equal in both directions. Switching
    /// to another list replaces `other`'s content with the new list's.
    pub fn bind_content_bidirectional(&self, other: &impl ListSource<E>) -> Result<()> {
        let other = Endpoint::holding_list(other)?;
        content::bind_bidirectional(&self.endpoint(), &other)
    }

    pub fn unbind_content_bidirectional(&self, other: &impl ListSource<E>) -> Result<()> {
        let other = Endpoint::of(other)?;
        content::unbind_bidirectional(&self.endpoint(), &other)
    }

    pub fn is_content_bound_bidirectional(&self) -> bool {
        content::bidirectional_partner(&self.endpoint()).is_some()
    }

    pub(crate) fn content_state(&self) -> &RefCell<ContentState<E>> {
        &self.inner.content
    }

    pub(crate) fn downgrade(&self) -> WeakListProperty<E> {
        WeakListProperty {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn endpoint(&self) -> Endpoint<E> {
        Endpoint::Property(self.clone())
    }

    /// Move the forwarder to the currently held list, report the swap and
    /// bring content relations in line with the new list.
    fn track_current_list(&self) {
        let current = self.inner.property.get();
        let unchanged = self
            .inner
            .observed
            .borrow()
            .as_ref()
            .map(|(list, _)| list)
            == current.as_ref();
        if unchanged {
            return;
        }

        let previous = self.inner.observed.borrow_mut().take();
        let removed = match &previous {
            Some((list, forwarder)) => {
                list.remove_change_listener(forwarder);
                list.to_vec()
            }
            None => Vec::new(),
        };
        let added = match &current {
            Some(list) => {
                let forwarder = weak_list_change_listener(
                    &self.inner,
                    |inner: &Rc<ListPropertyInner<E>>, change: &ListChange<E>| {
                        ListProperty {
                            inner: Rc::clone(inner),
                        }
                        .forward(change)
                    },
                );
                list.add_change_listener(Rc::clone(&forwarder));
                *self.inner.observed.borrow_mut() = Some((list.clone(), forwarder));
                list.to_vec()
            }
            None => Vec::new(),
        };

        if removed != added {
            let change = ListChange::new(self.observable_id(), 0, removed, added);
            self.inner
                .list_listeners
                .for_each_live(|listener| listener.on_changed(&change));
        }
        content::list_switched(&self.endpoint());
    }

    fn forward(&self, change: &ListChange<E>) {
        self.inner.property.fire_value_changed();
        self.inner
            .list_listeners
            .for_each_live(|listener| listener.on_changed(change));
    }
}

impl<E: Clone + PartialEq + 'static> Observable for ListProperty<E> {
    fn observable_id(&self) -> ObservableId {
        self.inner.property.observable_id()
    }

    fn display_name(&self) -> String {
        match self.inner.property.name() {
            Some(name) => name.to_string(),
            None => format!("ListProperty{}", self.observable_id()),
        }
    }

    fn add_listener(&self, listener: Rc<dyn InvalidationListener>) {
        self.inner.property.add_listener(listener);
    }

    fn remove_listener(&self, listener: &Rc<dyn InvalidationListener>) {
        self.inner.property.remove_listener(listener);
    }
}

impl<E: Clone + PartialEq + 'static> ObservableValue<Option<ObservableList<E>>>
    for ListProperty<E>
{
    fn value(&self) -> Option<ObservableList<E>> {
        self.get()
    }

    fn add_change_listener(&self, listener: Rc<dyn ChangeListener<Option<ObservableList<E>>>>) {
        self.inner.property.add_change_listener(listener);
    }

    fn remove_change_listener(
        &self,
        listener: &Rc<dyn ChangeListener<Option<ObservableList<E>>>>,
    ) {
        self.inner.property.remove_change_listener(listener);
    }

    fn bound_source(&self) -> Option<Rc<dyn ObservableValue<Option<ObservableList<E>>>>> {
        self.inner.property.bound_source()
    }
}

impl<E: Clone + PartialEq + 'static> ListSource<E> for ListProperty<E> {
    fn source_list(&self) -> Option<ObservableList<E>> {
        self.get()
    }

    fn source_name(&self) -> String {
        self.display_name()
    }

    fn as_list_property(&self) -> Option<&ListProperty<E>> {
        Some(self)
    }
}

impl<E: fmt::Debug + 'static> fmt::Display for ListProperty<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let property = &self.inner.property;
        f.write_str("ListProperty [")?;
        if let Some(name) = property.name() {
            write!(f, "name: {name}, ")?;
        }
        if property.is_bound() {
            f.write_str("bound, ")?;
            if !property.is_valid() {
                return f.write_str("invalid]");
            }
        }
        match &*self.inner.observed.borrow() {
            Some((list, _)) => list.with(|elements| write!(f, "value: {elements:?}"))?,
            None => f.write_str("value: None")?,
        }
        f.write_str("]")
    }
}

impl<E: fmt::Debug> fmt::Debug for ListProperty<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListProperty")
            .field("property", &self.inner.property)
            .field("forwarding", &self.inner.observed.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn forwards_changes_of_held_list() {
        let list = ObservableList::new();
        let property = ListProperty::new(list.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        property.on_list_change(move |change| {
            seen_clone.borrow_mut().extend_from_slice(change.added())
        });

        list.push(1);
        property.push(2).unwrap();
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(property.len(), 2);
    }

    #[test]
    fn replacing_the_list_moves_the_forwarder() {
        let first = ObservableList::from_vec(vec![1]);
        let second = ObservableList::from_vec(vec![2, 3]);
        let property = ListProperty::new(first.clone());
        let changes = Rc::new(RefCell::new(Vec::new()));
        let changes_clone = Rc::clone(&changes);
        property.on_list_change(move |change: &ListChange<i32>| {
            changes_clone.borrow_mut().push(change.clone())
        });

        property.set(Some(second.clone())).unwrap();
        assert_eq!(first.change_listener_count(), 0);
        {
            let changes = changes.borrow();
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].removed(), &[1]);
            assert_eq!(changes[0].added(), &[2, 3]);
        }

        first.push(9);
        second.push(4);
        assert_eq!(changes.borrow().len(), 2);
        assert_eq!(property.to_vec(), vec![2, 3, 4]);
    }

    #[test]
    fn list_changes_notify_invalidation_listeners() {
        let list = ObservableList::new();
        let property = ListProperty::new(list.clone());
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        property.add_listener(Rc::new(move |_: &dyn Observable| {
            count_clone.set(count_clone.get() + 1)
        }));
        list.push("a");
        list.push("b");
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn value_binding_follows_source_list() {
        let source = ListProperty::new(ObservableList::from_vec(vec![1]));
        let target = ListProperty::empty();
        target.bind(&source).unwrap();
        assert_eq!(target.to_vec(), vec![1]);

        source.set(Some(ObservableList::from_vec(vec![7, 8]))).unwrap();
        assert_eq!(target.to_vec(), vec![7, 8]);
        assert!(target.set(None).is_err());
    }

    #[test]
    fn self_value_binding_is_rejected() {
        let property = ListProperty::new(ObservableList::<i32>::new());
        let err = property.bind(&property.clone()).unwrap_err();
        assert!(matches!(err, BindError::SelfBinding { .. }));
    }

    #[test]
    fn empty_property_can_be_bound_but_not_bound_to() {
        let empty = ListProperty::<i32>::empty();
        let list = ObservableList::from_vec(vec![1]);
        assert!(matches!(
            list.bind_content(&empty),
            Err(BindError::NullArgument { .. })
        ));
        assert!(matches!(empty.push(1), Err(BindError::NullArgument { .. })));

        empty.bind_content(&list).unwrap();
        assert!(empty.is_content_bound());
        list.push(2);

        let held = ObservableList::new();
        empty.set(Some(held.clone())).unwrap();
        assert_eq!(held.to_vec(), vec![1, 2]);
        assert!(empty.is_content_bound());
    }

    #[test]
    fn display_shows_held_elements() {
        let property = ListProperty::named("rows", ObservableList::from_vec(vec![1, 2]));
        assert_eq!(property.to_string(), "ListProperty [name: rows, value: [1, 2]]");

        let empty = ListProperty::<i32>::empty();
        assert_eq!(empty.to_string(), "ListProperty [value: None]");

        let follower = ListProperty::empty();
        follower.bind(&property).unwrap();
        assert_eq!(follower.to_string(), "ListProperty [bound, value: [1, 2]]");
    }

    #[test]
    fn dropped_property_is_pruned_from_list() {
        let list = ObservableList::new();
        let property = ListProperty::new(list.clone());
        assert_eq!(list.change_listener_count(), 1);
        drop(property);
        list.push(1);
        assert_eq!(list.change_listener_count(), 0);
    }
}
