//! Runtime support for observables.
//!
//! This module provides identity allocation, the notification depth guard
//! and the configuration that governs it.

mod context;

pub use context::{ReactiveRuntime, RuntimeConfig, MAX_DEPTH_ENV};
