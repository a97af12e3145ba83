//! Observable properties.
//!
//! [`Property<T>`] is the building block: a cached value, a validity flag and
//! an optional value binding. The aliases below name the common slots a
//! UI node exposes.

mod cache;
#[allow(clippy::module_inception)]
mod property;

pub use cache::DerivedCache;
pub use property::{Property, PropertyBuilder};

pub type BooleanProperty = Property<bool>;
pub type IntegerProperty = Property<i32>;
pub type LongProperty = Property<i64>;
pub type DoubleProperty = Property<f64>;
pub type StringProperty = Property<String>;
/// A nullable slot: `None` and `Some(_)` always compare unequal.
pub type ObjectProperty<T> = Property<Option<T>>;
