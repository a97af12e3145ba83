//! One-way value binding rules.
//!
//! A bound property has exactly one source. Binding replaces, never stacks;
//! rebinding to the current source is a no-op; binding to itself, directly
//! or through a chain of value bindings, is rejected. Binding only installs
//! a listener and invalidates: the value is pulled on the next read.

use std::rc::Rc;

use crate::error::{BindError, Result};
use crate::listener::InvalidationListener;
use crate::observable::{ObservableId, ObservableValue};
use crate::runtime::ReactiveRuntime;

/// An active source plus the listener the bound side registered on it.
pub(crate) struct ValueBinding<T> {
    source: Rc<dyn ObservableValue<T>>,
    listener: Rc<dyn InvalidationListener>,
}

impl<T: 'static> ValueBinding<T> {
    pub(crate) fn attach(
        source: Rc<dyn ObservableValue<T>>,
        listener: Rc<dyn InvalidationListener>,
    ) -> Self {
        source.add_listener(Rc::clone(&listener));
        Self { source, listener }
    }

    pub(crate) fn source(&self) -> Rc<dyn ObservableValue<T>> {
        Rc::clone(&self.source)
    }

    pub(crate) fn source_id(&self) -> ObservableId {
        self.source.observable_id()
    }

    /// Read the source one last time and remove the listener.
    pub(crate) fn detach(self) -> T {
        let last = self.source.value();
        self.source.remove_listener(&self.listener);
        last
    }
}

/// Reject bindings that would make `target` depend on itself.
pub(crate) fn check_bind<T>(
    target: ObservableId,
    target_name: &str,
    source: &dyn ObservableValue<T>,
) -> Result<()> {
    if source.observable_id() == target {
        return Err(BindError::self_binding(target_name));
    }

    let limit = ReactiveRuntime::current().config().max_notification_depth;
    let mut hops = 0usize;
    let mut upstream = source.bound_source();
    while let Some(next) = upstream {
        if next.observable_id() == target {
            tracing::debug!(
                target = %target,
                source = %source.observable_id(),
                hops,
                "rejecting binding that closes a cycle"
            );
            return Err(BindError::self_binding(target_name));
        }
        hops += 1;
        if hops > limit {
            tracing::warn!(target = %target, hops, "binding chain longer than depth limit, not followed further");
            break;
        }
        upstream = next.bound_source();
    }
    Ok(())
}
