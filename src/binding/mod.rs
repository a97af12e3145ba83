//! Value bindings.
//!
//! - `value`: the rules for binding a property's value to one source.
//! - [`Computed`]: lazily recomputed values over arbitrary dependencies.

mod computed;
pub(crate) mod value;

pub use computed::{Computed, ComputedBuilder};
