use std::cell::RefCell;
use std::rc::Rc;

use super::ContentState;
use crate::collections::{
    ListChange, ListChangeListener, ListProperty, ListSource, ObservableList, WeakListProperty,
    WeakObservableList,
};
use crate::error::{BindError, Result};
use crate::observable::{Observable, ObservableId};

/// One side of a content binding.
///
/// A list property is bound as itself rather than through the list it holds
/// at bind time: its relations live on the property and are fed from its
/// list change stream, which also reports the property switching lists.
pub(crate) enum Endpoint<E> {
    List(ObservableList<E>),
    Property(ListProperty<E>),
}

impl<E> Clone for Endpoint<E> {
    fn clone(&self) -> Self {
        match self {
            Endpoint::List(list) => Endpoint::List(list.clone()),
            Endpoint::Property(property) => Endpoint::Property(property.clone()),
        }
    }
}

pub(crate) enum WeakEndpoint<E> {
    List(WeakObservableList<E>),
    Property(WeakListProperty<E>),
}

impl<E> WeakEndpoint<E> {
    pub(crate) fn upgrade(&self) -> Option<Endpoint<E>> {
        match self {
            WeakEndpoint::List(list) => list.upgrade().map(Endpoint::List),
            WeakEndpoint::Property(property) => property.upgrade().map(Endpoint::Property),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        match self {
            WeakEndpoint::List(list) => list.is_alive(),
            WeakEndpoint::Property(property) => property.is_alive(),
        }
    }
}

impl<E: Clone + PartialEq + 'static> Endpoint<E> {
    /// Fails with `NullArgument` for a source that is neither a list
    /// property nor currently provides a list.
    pub(crate) fn of(source: &impl ListSource<E>) -> Result<Self> {
        if let Some(property) = source.as_list_property() {
            return Ok(Endpoint::Property(property.clone()));
        }
        source
            .source_list()
            .map(Endpoint::List)
            .ok_or_else(|| BindError::null(source.source_name()))
    }

    /// Like [`Endpoint::of`], but the endpoint must hold a list right now.
    /// Used for the side whose content is copied at bind time.
    pub(crate) fn holding_list(source: &impl ListSource<E>) -> Result<Self> {
        let endpoint = Self::of(source)?;
        if endpoint.current_list().is_none() {
            return Err(BindError::null(endpoint.name()));
        }
        Ok(endpoint)
    }

    pub(crate) fn id(&self) -> ObservableId {
        match self {
            Endpoint::List(list) => list.id(),
            Endpoint::Property(property) => property.observable_id(),
        }
    }

    pub(crate) fn name(&self) -> String {
        match self {
            Endpoint::List(list) => list.display_name(),
            Endpoint::Property(property) => property.display_name(),
        }
    }

    pub(crate) fn state(&self) -> &RefCell<ContentState<E>> {
        match self {
            Endpoint::List(list) => list.content_state(),
            Endpoint::Property(property) => property.content_state(),
        }
    }

    pub(crate) fn current_list(&self) -> Option<ObservableList<E>> {
        match self {
            Endpoint::List(list) => Some(list.clone()),
            Endpoint::Property(property) => property.get(),
        }
    }

    pub(crate) fn elements(&self) -> Vec<E> {
        self.current_list()
            .map(|list| list.to_vec())
            .unwrap_or_default()
    }

    /// The same endpoint, or two endpoints that currently share one list.
    pub(crate) fn aliases(&self, other: &Endpoint<E>) -> bool {
        if self.id() == other.id() {
            return true;
        }
        matches!(
            (self.current_list(), other.current_list()),
            (Some(a), Some(b)) if a == b
        )
    }

    /// Whether `change` reports this endpoint switching to another list.
    pub(crate) fn is_swap(&self, change: &ListChange<E>) -> bool {
        match self {
            Endpoint::List(_) => false,
            Endpoint::Property(property) => change.source() == property.observable_id(),
        }
    }

    /// Replay a change observed elsewhere. An endpoint without a list has
    /// nothing to keep in step and accepts any change.
    pub(crate) fn apply(&self, change: &ListChange<E>) -> bool {
        self.current_list()
            .map_or(true, |list| list.try_apply(change))
    }

    pub(crate) fn replace_all(&self, elements: Vec<E>) {
        if let Some(list) = self.current_list() {
            list.set_all(elements);
        }
    }

    pub(crate) fn add_listener(&self, listener: Rc<dyn ListChangeListener<E>>) {
        match self {
            Endpoint::List(list) => list.add_change_listener(listener),
            Endpoint::Property(property) => property.add_list_change_listener(listener),
        }
    }

    pub(crate) fn remove_listener(&self, listener: &Rc<dyn ListChangeListener<E>>) {
        match self {
            Endpoint::List(list) => list.remove_change_listener(listener),
            Endpoint::Property(property) => property.remove_list_change_listener(listener),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakEndpoint<E> {
        match self {
            Endpoint::List(list) => WeakEndpoint::List(list.downgrade()),
            Endpoint::Property(property) => WeakEndpoint::Property(property.downgrade()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_holding_a_list_aliases_it() {
        let list = ObservableList::<i32>::new();
        let property = Endpoint::Property(ListProperty::new(list.clone()));
        assert!(property.aliases(&Endpoint::List(list)));
        assert!(!property.aliases(&Endpoint::List(ObservableList::new())));
    }

    #[test]
    fn empty_property_accepts_changes_and_has_no_elements() {
        let empty = ListProperty::<i32>::empty();
        let endpoint = Endpoint::Property(empty.clone());
        let change = ListChange::new(empty.observable_id(), 3, vec![1], vec![2]);
        assert!(endpoint.apply(&change));
        assert!(endpoint.elements().is_empty());
        assert!(endpoint.is_swap(&change));
        assert!(matches!(
            Endpoint::holding_list(&empty),
            Err(BindError::NullArgument { .. })
        ));
    }
}
