//! Content bindings between observable lists.
//!
//! A content binding keeps the *elements* of two lists in sync by replaying
//! structural changes, as opposed to a value binding, which makes two
//! properties share one list instance.
//!
//! Each list, and each list property, carries a [`ContentState`] with at
//! most one relation per mode:
//!
//! ```text
//! Unbound --bind_content--> Unidirectional --unbind_content / direct write--> Unbound
//! Unbound --bind_content_bidirectional--> Bidirectional --unbind_content_bidirectional--> Unbound
//! ```
//!
//! Moving straight from one bound mode to the other is rejected with
//! [`BindError::ContentBindConflict`](crate::BindError::ContentBindConflict).
//!
//! A list property keeps its relations when it switches lists. The bound
//! side of a one-way relation refills its new list from the source; either
//! side of a two-way relation pushes its new content to the other.

mod bidirectional;
mod endpoint;
mod unidirectional;

use std::cell::Cell;

pub(crate) use bidirectional::{
    bidirectional_partner, bind as bind_bidirectional, unbind as unbind_bidirectional,
    BidirectionalBinding,
};
pub(crate) use endpoint::{Endpoint, WeakEndpoint};
pub(crate) use unidirectional::{
    bind as bind_unidirectional, unbind as unbind_unidirectional, UnidirectionalBinding,
};

/// Bring the relations of a list property in line with the list it has just
/// switched to.
pub(crate) fn list_switched<E>(property: &Endpoint<E>)
where
    E: Clone + PartialEq + 'static,
{
    unidirectional::refill(property);
    bidirectional::push_switched(property);
}

/// Content relations held by one list or list property.
pub(crate) struct ContentState<E> {
    /// Relation in which this side is bound by `bind_content`.
    pub(crate) unidirectional: Option<UnidirectionalBinding<E>>,
    pub(crate) bidirectional: Option<BidirectionalBinding<E>>,
}

impl<E> Default for ContentState<E> {
    fn default() -> Self {
        Self {
            unidirectional: None,
            bidirectional: None,
        }
    }
}

/// Raises a replay flag for the duration of one replayed change.
struct ReplayGuard<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl<'a> ReplayGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        let previous = flag.replace(true);
        Self { flag, previous }
    }
}

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}
