//! Observable collections.
//!
//! - [`ObservableList`]: an ordered list reporting every structural change
//!   as a [`ListChange`].
//! - [`ListProperty`]: a property holding an optional list, forwarding the
//!   changes of whichever list it currently holds.

mod list;
mod list_property;

pub use list::{
    weak_list_change_listener, ListChange, ListChangeListener, ListSource, ObservableList,
};
pub use list_property::ListProperty;

pub(crate) use list::WeakObservableList;
pub(crate) use list_property::WeakListProperty;
