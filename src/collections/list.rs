use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::{Rc, Weak};

use super::ListProperty;
use crate::content::{self, ContentState, Endpoint};
use crate::error::Result;
use crate::listener::{InvalidationListener, ListenerList, Reclaimable, WeakListener};
use crate::observable::{Observable, ObservableId};
use crate::runtime::ReactiveRuntime;

/// One structural change: the elements in `from..from + removed.len()` were
/// replaced by `added`.
///
/// Insertions have an empty `removed`, removals an empty `added`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChange<E> {
    source: ObservableId,
    from: usize,
    removed: Vec<E>,
    added: Vec<E>,
}

impl<E> ListChange<E> {
    pub(crate) fn new(source: ObservableId, from: usize, removed: Vec<E>, added: Vec<E>) -> Self {
        Self {
            source,
            from,
            removed,
            added,
        }
    }

    /// The list the change happened on.
    pub fn source(&self) -> ObservableId {
        self.source
    }

    pub fn from(&self) -> usize {
        self.from
    }

    /// End of the affected range after the change.
    pub fn to(&self) -> usize {
        self.from + self.added.len()
    }

    pub fn removed(&self) -> &[E] {
        &self.removed
    }

    pub fn added(&self) -> &[E] {
        &self.added
    }

    pub fn was_added(&self) -> bool {
        !self.added.is_empty()
    }

    pub fn was_removed(&self) -> bool {
        !self.removed.is_empty()
    }

    pub fn was_replaced(&self) -> bool {
        self.was_added() && self.was_removed()
    }
}

/// Receives structural changes of an [`ObservableList`].
pub trait ListChangeListener<E> {
    fn on_changed(&self, change: &ListChange<E>);

    fn was_reclaimed(&self) -> bool {
        false
    }
}

impl<E, F> ListChangeListener<E> for F
where
    F: Fn(&ListChange<E>),
{
    fn on_changed(&self, change: &ListChange<E>) {
        self(change)
    }
}

impl<O, E, F> ListChangeListener<E> for WeakListener<O, F>
where
    O: ?Sized,
    F: Fn(&Rc<O>, &ListChange<E>),
{
    fn on_changed(&self, change: &ListChange<E>) {
        if let Some((owner, forward)) = self.upgrade() {
            forward(&owner, change);
        }
    }

    fn was_reclaimed(&self) -> bool {
        !self.owner_alive()
    }
}

impl<E> Reclaimable for dyn ListChangeListener<E> {
    fn is_reclaimed(&self) -> bool {
        self.was_reclaimed()
    }
}

/// Build a list change listener that forwards to `owner` while it lives.
pub fn weak_list_change_listener<O, E, F>(
    owner: &Rc<O>,
    forward: F,
) -> Rc<dyn ListChangeListener<E>>
where
    O: ?Sized + 'static,
    E: 'static,
    F: Fn(&Rc<O>, &ListChange<E>) + 'static,
{
    Rc::new(WeakListener::new(owner, forward))
}

struct ListInner<E> {
    id: ObservableId,
    name: Option<String>,
    elements: RefCell<Vec<E>>,
    invalidation: ListenerList<dyn InvalidationListener>,
    changes: ListenerList<dyn ListChangeListener<E>>,
    content: RefCell<ContentState<E>>,
}

/// An ordered collection that reports every structural change.
///
/// Cloning an `ObservableList` creates a new handle to the **same** list, and
/// equality between handles is identity.
///
/// Each mutating call produces at most one [`ListChange`]; calls that leave
/// the list untouched produce none. Listeners run after the mutation is
/// complete and may mutate the list again.
///
/// # Examples
///
/// ```
/// use proplink::ObservableList;
///
/// let source = ObservableList::from_vec(vec!["a"]);
/// let mirror = ObservableList::new();
/// mirror.bind_content(&source).unwrap();
///
/// source.push("b");
/// assert_eq!(mirror.to_vec(), vec!["a", "b"]);
/// ```
pub struct ObservableList<E> {
    inner: Rc<ListInner<E>>,
}

impl<E> Clone for ObservableList<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> PartialEq for ObservableList<E> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E> Eq for ObservableList<E> {}

/// Non-owning handle to an [`ObservableList`].
pub(crate) struct WeakObservableList<E> {
    inner: Weak<ListInner<E>>,
}

impl<E> Clone for WeakObservableList<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<E> WeakObservableList<E> {
    pub(crate) fn upgrade(&self) -> Option<ObservableList<E>> {
        self.inner.upgrade().map(|inner| ObservableList { inner })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<E> Default for ObservableList<E> {
    fn default() -> Self {
        Self::with_parts(None, Vec::new())
    }
}

impl<E> ObservableList<E> {
    fn with_parts(name: Option<String>, elements: Vec<E>) -> Self {
        Self {
            inner: Rc::new(ListInner {
                id: ReactiveRuntime::next_id(),
                name,
                elements: RefCell::new(elements),
                invalidation: ListenerList::default(),
                changes: ListenerList::default(),
                content: RefCell::new(ContentState::default()),
            }),
        }
    }

    pub fn id(&self) -> ObservableId {
        self.inner.id
    }

    pub fn len(&self) -> usize {
        self.inner.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.elements.borrow().is_empty()
    }

    /// Read the elements without cloning them.
    pub fn with<R>(&self, f: impl FnOnce(&[E]) -> R) -> R {
        f(&self.inner.elements.borrow())
    }

    pub(crate) fn downgrade(&self) -> WeakObservableList<E> {
        WeakObservableList {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub(crate) fn content_state(&self) -> &RefCell<ContentState<E>> {
        &self.inner.content
    }

    #[cfg(test)]
    pub(crate) fn raw_elements(&self) -> &RefCell<Vec<E>> {
        &self.inner.elements
    }
}

impl<E: Clone + PartialEq + 'static> ObservableList<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::with_parts(Some(name.into()), Vec::new())
    }

    pub fn from_vec(elements: Vec<E>) -> Self {
        Self::with_parts(None, elements)
    }

    pub fn get(&self, index: usize) -> Option<E> {
        self.inner.elements.borrow().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<E> {
        self.inner.elements.borrow().clone()
    }

    pub fn contains(&self, element: &E) -> bool {
        self.inner.elements.borrow().contains(element)
    }

    pub fn index_of(&self, element: &E) -> Option<usize> {
        self.inner
            .elements
            .borrow()
            .iter()
            .position(|e| e == element)
    }

    pub fn push(&self, element: E) {
        let end = self.len();
        self.splice_unchecked(end..end, vec![element]);
    }

    pub fn extend(&self, elements: impl IntoIterator<Item = E>) {
        let end = self.len();
        self.splice_unchecked(end..end, elements.into_iter().collect());
    }

    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&self, index: usize, element: E) {
        let len = self.len();
        assert!(index <= len, "insertion index (is {index}) should be <= len (is {len})");
        self.splice_unchecked(index..index, vec![element]);
    }

    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn remove(&self, index: usize) -> E {
        let len = self.len();
        assert!(index < len, "removal index (is {index}) should be < len (is {len})");
        let mut removed = self.splice_unchecked(index..index + 1, Vec::new());
        removed.remove(0)
    }

    /// Remove the first element equal to `element`.
    pub fn remove_item(&self, element: &E) -> bool {
        match self.index_of(element) {
            Some(index) => {
                self.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replace the element at `index`, returning the old one.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn set(&self, index: usize, element: E) -> E {
        let len = self.len();
        assert!(index < len, "index (is {index}) should be < len (is {len})");
        let mut removed = self.splice_unchecked(index..index + 1, vec![element]);
        removed.remove(0)
    }

    /// Replace `range` with `elements` as a single change.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds or decreasing.
    pub fn replace_range(&self, range: Range<usize>, elements: Vec<E>) -> Vec<E> {
        let len = self.len();
        assert!(
            range.start <= range.end && range.end <= len,
            "range {range:?} out of bounds for length {len}"
        );
        self.splice_unchecked(range, elements)
    }

    /// Replace the whole content. Nothing is reported if the content is
    /// already equal to `elements`.
    pub fn set_all(&self, elements: Vec<E>) {
        if *self.inner.elements.borrow() == elements {
            return;
        }
        let len = self.len();
        self.splice_unchecked(0..len, elements);
    }

    pub fn clear(&self) {
        let len = self.len();
        self.splice_unchecked(0..len, Vec::new());
    }

    /// Keep only the elements matching `keep`, reported as one change
    /// covering the whole list.
    pub fn retain(&self, mut keep: impl FnMut(&E) -> bool) {
        let kept: Vec<E> = self
            .inner
            .elements
            .borrow()
            .iter()
            .filter(|e| keep(e))
            .cloned()
            .collect();
        if kept.len() != self.len() {
            self.set_all(kept);
        }
    }

    /// Apply a change observed on another list. Returns `false` without
    /// touching this list if the change does not fit its current length.
    pub(crate) fn try_apply(&self, change: &ListChange<E>) -> bool {
        let end = change.from + change.removed.len();
        if end > self.len() {
            return false;
        }
        self.splice_unchecked(change.from..end, change.added.clone());
        true
    }

    pub fn add_change_listener(&self, listener: Rc<dyn ListChangeListener<E>>) {
        self.inner.changes.add(listener);
    }

    pub fn remove_change_listener(&self, listener: &Rc<dyn ListChangeListener<E>>) {
        self.inner.changes.remove(listener);
    }

    /// Register a closure as list change listener. Keep the returned handle
    /// to remove it later.
    pub fn on_change(
        &self,
        f: impl Fn(&ListChange<E>) + 'static,
    ) -> Rc<dyn ListChangeListener<E>> {
        let listener: Rc<dyn ListChangeListener<E>> = Rc::new(f);
        self.add_change_listener(Rc::clone(&listener));
        listener
    }

    pub fn change_listener_count(&self) -> usize {
        self.inner.changes.len()
    }

    pub fn invalidation_listener_count(&self) -> usize {
        self.inner.invalidation.len()
    }

    /// Keep this list's content equal to `source`'s.
    ///
    /// Replaces any previous unidirectional content binding of this list.
    /// Mutating this list directly afterwards removes the binding.
    ///
    /// A [`ListProperty`](crate::ListProperty) source is followed across
    /// list switches: this list then takes the newly held list's content.
    pub fn bind_content(&self, source: &impl ListSource<E>) -> Result<()> {
        let source = Endpoint::holding_list(source)?;
        content::bind_unidirectional(&self.endpoint(), &source)
    }

    /// Remove the unidirectional content binding; the content stays as is.
    pub fn unbind_content(&self) {
        content::unbind_unidirectional(&self.endpoint());
    }

    pub fn is_content_bound(&self) -> bool {
        self.content_state().borrow().unidirectional.is_some()
    }

    /// Keep this list and `other` equal in both directions. This list takes
    /// `other`'s content first.
    pub fn bind_content_bidirectional(&self, other: &impl ListSource<E>) -> Result<()> {
        let other = Endpoint::holding_list(other)?;
        content::bind_bidirectional(&self.endpoint(), &other)
    }

    /// Remove the bidirectional content binding with `other`, if there is one.
    pub fn unbind_content_bidirectional(&self, other: &impl ListSource<E>) -> Result<()> {
        let other = Endpoint::of(other)?;
        content::unbind_bidirectional(&self.endpoint(), &other)
    }

    pub fn is_content_bound_bidirectional(&self) -> bool {
        content::bidirectional_partner(&self.endpoint()).is_some()
    }

    fn endpoint(&self) -> Endpoint<E> {
        Endpoint::List(self.clone())
    }

    fn splice_unchecked(&self, range: Range<usize>, added: Vec<E>) -> Vec<E> {
        if range.is_empty() && added.is_empty() {
            return Vec::new();
        }
        let from = range.start;
        let removed: Vec<E> = self
            .inner
            .elements
            .borrow_mut()
            .splice(range, added.iter().cloned())
            .collect();
        let change = ListChange::new(self.inner.id, from, removed.clone(), added);
        self.fire(&change);
        removed
    }

    fn fire(&self, change: &ListChange<E>) {
        let runtime = ReactiveRuntime::current();
        let Some(_depth) = runtime.enter_notification(self.inner.id) else {
            return;
        };
        self.inner
            .invalidation
            .for_each_live(|listener| listener.invalidated(self));
        self.inner
            .changes
            .for_each_live(|listener| listener.on_changed(change));
    }
}

impl<E: Clone + PartialEq + 'static> Observable for ObservableList<E> {
    fn observable_id(&self) -> ObservableId {
        self.inner.id
    }

    fn display_name(&self) -> String {
        match &self.inner.name {
            Some(name) => name.clone(),
            None => format!("ObservableList{}", self.inner.id),
        }
    }

    fn add_listener(&self, listener: Rc<dyn InvalidationListener>) {
        self.inner.invalidation.add(listener);
    }

    fn remove_listener(&self, listener: &Rc<dyn InvalidationListener>) {
        self.inner.invalidation.remove(listener);
    }
}

impl<E: fmt::Debug> fmt::Debug for ObservableList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("id", &self.inner.id)
            .field("elements", &self.inner.elements.borrow())
            .finish()
    }
}

/// Anything that may currently provide an [`ObservableList`].
pub trait ListSource<E> {
    /// The list to bind against, or `None` if there is none right now.
    fn source_list(&self) -> Option<ObservableList<E>>;

    fn source_name(&self) -> String;

    /// The list property behind this source, if it is one. Content bindings
    /// attach to the property itself and follow it when it switches lists.
    fn as_list_property(&self) -> Option<&ListProperty<E>> {
        None
    }
}

impl<E: Clone + PartialEq + 'static> ListSource<E> for ObservableList<E> {
    fn source_list(&self) -> Option<ObservableList<E>> {
        Some(self.clone())
    }

    fn source_name(&self) -> String {
        self.display_name()
    }
}
