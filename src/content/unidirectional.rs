use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, warn};

use super::{bidirectional_partner, Endpoint, ReplayGuard, WeakEndpoint};
use crate::collections::{ListChange, ListChangeListener};
use crate::error::{BindError, ContentBindMode, Result};
use crate::runtime::ReactiveRuntime;

/// A bound side's view of its unidirectional relation.
///
/// Two listeners are involved: `replay` sits on the source and copies its
/// changes onto the bound side, `guard` sits on the bound side and drops the
/// relation when it changes for any other reason. Both hold the bound side
/// weakly.
pub(crate) struct UnidirectionalBinding<E> {
    source: Endpoint<E>,
    replay: Rc<dyn ListChangeListener<E>>,
    guard: Rc<dyn ListChangeListener<E>>,
    replaying: Rc<Cell<bool>>,
}

struct Replay<E> {
    target: WeakEndpoint<E>,
    source: WeakEndpoint<E>,
    replaying: Rc<Cell<bool>>,
}

impl<E: Clone + PartialEq + 'static> ListChangeListener<E> for Replay<E> {
    fn on_changed(&self, change: &ListChange<E>) {
        let (Some(target), Some(source)) = (self.target.upgrade(), self.source.upgrade()) else {
            return;
        };
        if target.aliases(&source) {
            debug!(
                list = %target.name(),
                "content source now holds the bound list, dropping content binding"
            );
            unbind(&target);
            return;
        }
        if source.is_swap(change) {
            let _replaying = ReplayGuard::enter(&self.replaying);
            debug!(
                list = %target.name(),
                source = %source.name(),
                "content source switched lists"
            );
            target.replace_all(source.elements());
            return;
        }
        let _replaying = ReplayGuard::enter(&self.replaying);
        if !target.apply(change) {
            debug!(list = %target.name(), "content out of step, resynchronizing");
            target.replace_all(source.elements());
        }
    }

    fn was_reclaimed(&self) -> bool {
        !self.target.is_alive()
    }
}

struct Guard<E> {
    target: WeakEndpoint<E>,
    replaying: Rc<Cell<bool>>,
}

impl<E: Clone + PartialEq + 'static> ListChangeListener<E> for Guard<E> {
    fn on_changed(&self, change: &ListChange<E>) {
        if self.replaying.get() {
            return;
        }
        let Some(target) = self.target.upgrade() else {
            return;
        };
        // Switching lists is handled by `refill`.
        if target.is_swap(change) {
            return;
        }
        debug!(
            list = %target.name(),
            "content-bound list mutated directly, dropping content binding"
        );
        unbind(&target);
    }
}

fn content_source<E>(endpoint: &Endpoint<E>) -> Option<Endpoint<E>>
where
    E: Clone + PartialEq + 'static,
{
    let own = endpoint
        .state()
        .borrow()
        .unidirectional
        .as_ref()
        .map(|binding| binding.source.clone());
    match (own, endpoint) {
        (Some(source), _) => Some(source),
        // A property without a relation of its own may hold a bound list.
        (None, Endpoint::Property(_)) => endpoint
            .current_list()
            .and_then(|list| content_source(&Endpoint::List(list))),
        (None, Endpoint::List(_)) => None,
    }
}

/// Reject `target <- source` if `source` already mirrors `target`, directly
/// or through other unidirectional relations.
fn check_cycle<E>(target: &Endpoint<E>, source: &Endpoint<E>) -> Result<()>
where
    E: Clone + PartialEq + 'static,
{
    let limit = ReactiveRuntime::current().config().max_notification_depth;
    let mut next = content_source(source);
    let mut steps = 0;
    while let Some(endpoint) = next {
        if endpoint.aliases(target) {
            return Err(BindError::self_binding(target.name()));
        }
        steps += 1;
        if steps >= limit {
            warn!(
                list = %target.name(),
                limit,
                "content binding chain longer than the notification depth, cycle check stopped"
            );
            break;
        }
        next = content_source(&endpoint);
    }
    Ok(())
}

pub(crate) fn bind<E>(target: &Endpoint<E>, source: &Endpoint<E>) -> Result<()>
where
    E: Clone + PartialEq + 'static,
{
    if target.aliases(source) {
        return Err(BindError::self_binding(target.name()));
    }
    if bidirectional_partner(target).is_some() {
        return Err(BindError::conflict(
            ContentBindMode::Unidirectional,
            target.name(),
        ));
    }
    check_cycle(target, source)?;

    if target.state().borrow().unidirectional.is_some() {
        debug!(list = %target.name(), "replacing content binding");
        unbind(target);
    }

    target.replace_all(source.elements());

    let replaying = Rc::new(Cell::new(false));
    let replay: Rc<dyn ListChangeListener<E>> = Rc::new(Replay {
        target: target.downgrade(),
        source: source.downgrade(),
        replaying: Rc::clone(&replaying),
    });
    let guard: Rc<dyn ListChangeListener<E>> = Rc::new(Guard {
        target: target.downgrade(),
        replaying: Rc::clone(&replaying),
    });

    source.add_listener(Rc::clone(&replay));
    target.add_listener(Rc::clone(&guard));
    target.state().borrow_mut().unidirectional = Some(UnidirectionalBinding {
        source: source.clone(),
        replay,
        guard,
        replaying,
    });
    debug!(list = %target.name(), source = %source.name(), "content bound");
    Ok(())
}

/// Fill a bound property's newly held list from its source.
pub(crate) fn refill<E>(target: &Endpoint<E>)
where
    E: Clone + PartialEq + 'static,
{
    let relation = target
        .state()
        .borrow()
        .unidirectional
        .as_ref()
        .map(|binding| (binding.source.clone(), Rc::clone(&binding.replaying)));
    let Some((source, replaying)) = relation else {
        return;
    };
    if target.aliases(&source) {
        debug!(
            list = %target.name(),
            "content-bound property now holds its source list, dropping content binding"
        );
        unbind(target);
        return;
    }
    let _replaying = ReplayGuard::enter(&replaying);
    debug!(
        list = %target.name(),
        "content-bound property switched lists, refilling"
    );
    target.replace_all(source.elements());
}

pub(crate) fn unbind<E>(target: &Endpoint<E>)
where
    E: Clone + PartialEq + 'static,
{
    let Some(binding) = target.state().borrow_mut().unidirectional.take() else {
        return;
    };
    binding.source.remove_listener(&binding.replay);
    target.remove_listener(&binding.guard);
    debug!(
        list = %target.name(),
        source = %binding.source.name(),
        "content unbound"
    );
}
