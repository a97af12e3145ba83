use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use super::{Endpoint, ReplayGuard, WeakEndpoint};
use crate::collections::{ListChange, ListChangeListener};
use crate::error::{BindError, ContentBindMode, Result};
use crate::observable::ObservableId;

/// Replays changes of `origin` onto `other`.
///
/// Each side of a pair registers one of these on its own change stream. The
/// `updating` flag is shared by both, so a replayed change does not bounce
/// back.
struct PairListener<E> {
    origin: WeakEndpoint<E>,
    other: WeakEndpoint<E>,
    updating: Rc<Cell<bool>>,
}

impl<E: Clone + PartialEq + 'static> ListChangeListener<E> for PairListener<E> {
    fn on_changed(&self, change: &ListChange<E>) {
        if self.updating.get() {
            return;
        }
        let (Some(origin), Some(other)) = (self.origin.upgrade(), self.other.upgrade()) else {
            return;
        };
        if origin.aliases(&other) {
            debug!(
                list = %origin.name(),
                other = %other.name(),
                "both sides hold the same list, dropping bidirectional content binding"
            );
            release(&origin);
            return;
        }
        // Switching lists is handled by `push_switched`.
        if origin.is_swap(change) {
            return;
        }
        let _updating = ReplayGuard::enter(&self.updating);
        if !other.apply(change) {
            debug!(list = %other.name(), "content out of step, resynchronizing");
            other.replace_all(origin.elements());
        }
    }

    fn was_reclaimed(&self) -> bool {
        !self.other.is_alive()
    }
}

/// One side's view of a bidirectional relation.
pub(crate) struct BidirectionalBinding<E> {
    partner: WeakEndpoint<E>,
    partner_id: ObservableId,
    /// Registered on this side's own change stream.
    listener: Rc<dyn ListChangeListener<E>>,
    updating: Rc<Cell<bool>>,
}

/// The endpoint `endpoint` is bidirectionally bound to, if it is still
/// alive.
pub(crate) fn bidirectional_partner<E>(endpoint: &Endpoint<E>) -> Option<Endpoint<E>>
where
    E: Clone + PartialEq + 'static,
{
    endpoint
        .state()
        .borrow()
        .bidirectional
        .as_ref()
        .and_then(|binding| binding.partner.upgrade())
}

pub(crate) fn bind<E>(list: &Endpoint<E>, other: &Endpoint<E>) -> Result<()>
where
    E: Clone + PartialEq + 'static,
{
    if list.aliases(other) {
        return Err(BindError::self_binding(list.name()));
    }
    // Both endpoints are checked before either is touched.
    for endpoint in [list, other] {
        if endpoint.state().borrow().unidirectional.is_some() {
            return Err(BindError::conflict(
                ContentBindMode::Bidirectional,
                endpoint.name(),
            ));
        }
    }

    if bidirectional_partner(list).is_some_and(|partner| partner.id() == other.id()) {
        debug!(
            list = %list.name(),
            other = %other.name(),
            "replacing bidirectional content binding"
        );
    }
    release(list);
    release(other);

    list.replace_all(other.elements());

    let updating = Rc::new(Cell::new(false));
    let forward: Rc<dyn ListChangeListener<E>> = Rc::new(PairListener {
        origin: list.downgrade(),
        other: other.downgrade(),
        updating: Rc::clone(&updating),
    });
    let backward: Rc<dyn ListChangeListener<E>> = Rc::new(PairListener {
        origin: other.downgrade(),
        other: list.downgrade(),
        updating: Rc::clone(&updating),
    });
    list.add_listener(Rc::clone(&forward));
    other.add_listener(Rc::clone(&backward));
    list.state().borrow_mut().bidirectional = Some(BidirectionalBinding {
        partner: other.downgrade(),
        partner_id: other.id(),
        listener: forward,
        updating: Rc::clone(&updating),
    });
    other.state().borrow_mut().bidirectional = Some(BidirectionalBinding {
        partner: list.downgrade(),
        partner_id: list.id(),
        listener: backward,
        updating,
    });
    debug!(
        list = %list.name(),
        other = %other.name(),
        "content bound bidirectionally"
    );
    Ok(())
}

/// Replace the partner's content with what a property holds after switching
/// lists.
pub(crate) fn push_switched<E>(list: &Endpoint<E>)
where
    E: Clone + PartialEq + 'static,
{
    let relation = list
        .state()
        .borrow()
        .bidirectional
        .as_ref()
        .and_then(|binding| {
            let partner = binding.partner.upgrade()?;
            Some((partner, Rc::clone(&binding.updating)))
        });
    let Some((partner, updating)) = relation else {
        return;
    };
    if list.aliases(&partner) {
        debug!(
            list = %list.name(),
            other = %partner.name(),
            "both sides hold the same list, dropping bidirectional content binding"
        );
        release(list);
        return;
    }
    let _updating = ReplayGuard::enter(&updating);
    debug!(
        list = %list.name(),
        other = %partner.name(),
        "switched lists, pushing content"
    );
    partner.replace_all(list.elements());
}

/// Remove the relation between `list` and `other`. Nothing happens if the
/// two are not bound to each other.
pub(crate) fn unbind<E>(list: &Endpoint<E>, other: &Endpoint<E>) -> Result<()>
where
    E: Clone + PartialEq + 'static,
{
    if list.aliases(other) {
        return Err(BindError::self_binding(list.name()));
    }
    let bound_to_other = list
        .state()
        .borrow()
        .bidirectional
        .as_ref()
        .is_some_and(|binding| binding.partner_id == other.id());
    if bound_to_other {
        release(list);
        debug!(
            list = %list.name(),
            other = %other.name(),
            "bidirectional content binding removed"
        );
    }
    Ok(())
}

/// Drop whatever bidirectional relation `list` takes part in, on both sides.
fn release<E>(list: &Endpoint<E>)
where
    E: Clone + PartialEq + 'static,
{
    let Some(binding) = list.state().borrow_mut().bidirectional.take() else {
        return;
    };
    list.remove_listener(&binding.listener);
    let Some(partner) = binding.partner.upgrade() else {
        return;
    };
    let partner_binding = {
        let mut state = partner.state().borrow_mut();
        let points_back = state
            .bidirectional
            .as_ref()
            .is_some_and(|back| back.partner_id == list.id());
        if points_back {
            state.bidirectional.take()
        } else {
            None
        }
    };
    if let Some(back) = partner_binding {
        partner.remove_listener(&back.listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::{ListProperty, ObservableList};

    #[test]
    fn changes_flow_both_ways_without_echo() {
        let a = ObservableList::from_vec(vec![1]);
        let b = ObservableList::from_vec(vec![2, 3]);
        a.bind_content_bidirectional(&b).unwrap();
        assert_eq!(a.to_vec(), vec![2, 3]);

        let a_changes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&a_changes);
        a.on_change(move |_| counter.set(counter.get() + 1));

        a.push(4);
        b.remove(0);
        assert_eq!(a.to_vec(), vec![3, 4]);
        assert_eq!(b.to_vec(), vec![3, 4]);
        assert_eq!(a_changes.get(), 2);
    }

    #[test]
    fn binding_a_new_partner_releases_the_old_pair() {
        let a = ObservableList::new();
        let b = ObservableList::from_vec(vec![1]);
        let c = ObservableList::from_vec(vec![2]);
        a.bind_content_bidirectional(&b).unwrap();
        a.bind_content_bidirectional(&c).unwrap();

        assert!(!b.is_content_bound_bidirectional());
        assert_eq!(b.change_listener_count(), 0);
        b.push(5);
        assert_eq!(a.to_vec(), vec![2]);
        c.push(6);
        assert_eq!(a.to_vec(), vec![2, 6]);
    }

    #[test]
    fn unbinding_an_unrelated_list_is_a_noop() {
        let a = ObservableList::<i32>::new();
        let b = ObservableList::new();
        let c = ObservableList::new();
        a.bind_content_bidirectional(&b).unwrap();
        a.unbind_content_bidirectional(&c).unwrap();
        assert!(a.is_content_bound_bidirectional());
        assert!(b.is_content_bound_bidirectional());
    }

    #[test]
    fn either_side_can_unbind() {
        let a = ObservableList::<i32>::new();
        let b = ObservableList::new();
        a.bind_content_bidirectional(&b).unwrap();
        b.unbind_content_bidirectional(&a).unwrap();
        assert!(!a.is_content_bound_bidirectional());
        assert_eq!(a.change_listener_count(), 0);
        assert_eq!(b.change_listener_count(), 0);
    }

    #[test]
    fn dropped_partner_ends_the_relation() {
        let a = ObservableList::<i32>::new();
        let b = ObservableList::new();
        a.bind_content_bidirectional(&b).unwrap();
        drop(b);
        assert!(!a.is_content_bound_bidirectional());
        a.push(1);
        assert_eq!(a.change_listener_count(), 0);

        let c = ObservableList::new();
        a.bind_content(&c).unwrap();
    }

    #[test]
    fn property_switching_lists_pushes_its_new_content() {
        let model = ObservableList::from_vec(vec![1]);
        let editor = ListProperty::new(ObservableList::new());
        editor.bind_content_bidirectional(&model).unwrap();

        let replacement = ObservableList::from_vec(vec![5, 6]);
        editor.set(Some(replacement.clone())).unwrap();
        assert_eq!(model.to_vec(), vec![5, 6]);

        model.push(7);
        assert_eq!(replacement.to_vec(), vec![5, 6, 7]);
        replacement.remove(0);
        assert_eq!(model.to_vec(), vec![6, 7]);
        assert!(editor.is_content_bound_bidirectional());
    }
}
