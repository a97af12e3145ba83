//! # Proplink
//!
//! Observable properties with lazy invalidation, value binding and list
//! content binding, for single-threaded UI state.
//!
//! ## Values
//!
//! - `Property<T>` - A typed value that can be set, observed and bound
//! - `Computed<T>` - A value recomputed lazily from other observables
//! - Invalidation listeners hear "may be stale" once per change burst,
//!   change listeners hear `(old, new)` pairs
//!
//! ## Lists
//!
//! - `ObservableList<E>` - An ordered list reporting structural changes
//! - `ListProperty<E>` - A property holding a list and relaying its changes
//! - Content bindings mirror one list into another, one way or both ways
//!
//! Listeners registered through the weak adapters in [`listener`] never keep
//! their owner alive; they are dropped from the registry once the owner is
//! gone.
//!
//! ```
//! use proplink::{ObservableList, Property};
//!
//! let width = Property::new(10);
//! let doubled = width.map(|w| w * 2);
//! width.set(21).unwrap();
//! assert_eq!(doubled.get(), 42);
//!
//! let model = ObservableList::from_vec(vec!["a"]);
//! let view = ObservableList::new();
//! view.bind_content_bidirectional(&model).unwrap();
//! view.push("b");
//! assert_eq!(model.to_vec(), vec!["a", "b"]);
//! ```

pub mod binding;
pub mod collections;
mod content;
pub mod error;
pub mod listener;
pub mod observable;
pub mod property;
pub mod runtime;

// Re-export main types for convenience
pub use binding::{Computed, ComputedBuilder};
pub use collections::{ListChange, ListChangeListener, ListProperty, ListSource, ObservableList};
pub use error::{BindError, ContentBindMode, Result};
pub use listener::{ChangeListener, InvalidationListener, WeakListener};
pub use observable::{Observable, ObservableId, ObservableValue};
pub use property::{
    BooleanProperty, DerivedCache, DoubleProperty, IntegerProperty, LongProperty,
    ObjectProperty, Property, PropertyBuilder, StringProperty,
};
pub use runtime::{ReactiveRuntime, RuntimeConfig};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let source = Property::new(0);
        let target = Property::new(0);
        target.bind(&source).unwrap();
        source.set(42).unwrap();
        assert_eq!(target.get(), 42);
    }
}
