use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::observable::ObservableId;

/// Environment variable read by [`RuntimeConfig::from_env`].
pub const MAX_DEPTH_ENV: &str = "PROPLINK_MAX_NOTIFICATION_DEPTH";

const DEFAULT_MAX_NOTIFICATION_DEPTH: usize = 256;

/// Tunables for a [`ReactiveRuntime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum number of notification cycles that may be nested inside each
    /// other before further fan-out is dropped.
    pub max_notification_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_notification_depth: DEFAULT_MAX_NOTIFICATION_DEPTH,
        }
    }
}

impl RuntimeConfig {
    /// Build a config from the process environment, falling back to the
    /// defaults for anything missing or malformed.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(MAX_DEPTH_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => config.max_notification_depth = depth,
                _ => tracing::warn!(
                    value = %raw,
                    "ignoring invalid {MAX_DEPTH_ENV}, using {DEFAULT_MAX_NOTIFICATION_DEPTH}"
                ),
            }
        }
        config
    }

    #[must_use]
    pub fn with_max_notification_depth(mut self, depth: usize) -> Self {
        self.max_notification_depth = depth.max(1);
        self
    }
}

thread_local! {
    // Stack of scoped runtimes; the thread runtime is used when it is empty.
    static RUNTIME_STACK: RefCell<Vec<Rc<ReactiveRuntime>>> = const { RefCell::new(Vec::new()) };
    static THREAD_RUNTIME: Rc<ReactiveRuntime> = ReactiveRuntime::new(RuntimeConfig::from_env());
    // Identities are unique per thread, independent of runtime scoping, so
    // observables created under different scopes never compare equal.
    static NEXT_ID: Cell<u64> = const { Cell::new(0) };
}

/// Per-thread execution context for property notification.
///
/// The runtime owns no observables. It hands out identities and keeps track
/// of how deeply notification cycles are nested, so that a runaway chain of
/// listeners is cut off instead of overflowing the stack.
///
/// # Examples
///
/// Using the thread runtime:
///
/// ```
/// use proplink::Property;
///
/// let width = Property::new(10.0_f64);
/// assert_eq!(width.get(), 10.0);
/// ```
///
/// Using a scoped runtime with its own limits:
///
/// ```
/// use proplink::runtime::{ReactiveRuntime, RuntimeConfig};
/// use proplink::Property;
///
/// let config = RuntimeConfig::default().with_max_notification_depth(8);
/// ReactiveRuntime::with_config(config, || {
///     let p = Property::new(0);
///     p.set(1).unwrap();
///     assert_eq!(ReactiveRuntime::current().config().max_notification_depth, 8);
/// });
/// ```
#[derive(Debug)]
pub struct ReactiveRuntime {
    config: RuntimeConfig,
    depth: Cell<usize>,
    dropped: Cell<u64>,
}

impl ReactiveRuntime {
    fn new(config: RuntimeConfig) -> Rc<Self> {
        Rc::new(ReactiveRuntime {
            config,
            depth: Cell::new(0),
            dropped: Cell::new(0),
        })
    }

    /// Run a function with a fresh isolated runtime using default limits.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_runtime(Self::new(RuntimeConfig::default()), f)
    }

    /// Run a function with a fresh isolated runtime using `config`.
    pub fn with_config<F, R>(config: RuntimeConfig, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_runtime(Self::new(config), f)
    }

    /// Get the current reactive runtime (scoped, or the thread runtime).
    pub fn current() -> Rc<Self> {
        RUNTIME_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .cloned()
                .unwrap_or_else(|| THREAD_RUNTIME.with(Rc::clone))
        })
    }

    /// Run a function with a specific runtime as the current context.
    pub fn with_runtime<F, R>(runtime: Rc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    pub fn config(&self) -> RuntimeConfig {
        self.config
    }

    /// Current nesting depth of notification cycles.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Number of notification cycles cut off by the depth limit.
    pub fn dropped_notifications(&self) -> u64 {
        self.dropped.get()
    }

    /// Allocate the identity of a new observable.
    pub fn next_id() -> ObservableId {
        NEXT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            ObservableId(id)
        })
    }

    /// Enter one notification cycle for `source`.
    ///
    /// Returns `None` (and logs) when the nesting limit is reached; the
    /// caller must then skip its fan-out.
    pub(crate) fn enter_notification(self: &Rc<Self>, source: ObservableId) -> Option<DepthGuard> {
        let depth = self.depth.get();
        if depth >= self.config.max_notification_depth {
            self.dropped.set(self.dropped.get() + 1);
            tracing::error!(
                %source,
                depth,
                "notification depth limit reached, dropping fan-out (binding cycle?)"
            );
            return None;
        }
        self.depth.set(depth + 1);
        Some(DepthGuard {
            runtime: Rc::clone(self),
        })
    }
}

/// Leaves a notification cycle on drop.
pub(crate) struct DepthGuard {
    runtime: Rc<ReactiveRuntime>,
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        let depth = self.runtime.depth.get();
        self.runtime.depth.set(depth.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_across_scopes() {
        let outer = ReactiveRuntime::next_id();
        let inner = ReactiveRuntime::scope(ReactiveRuntime::next_id);
        assert_ne!(outer, inner);
    }

    #[test]
    fn scope_pops_on_return() {
        let config = RuntimeConfig::default().with_max_notification_depth(3);
        ReactiveRuntime::with_config(config, || {
            assert_eq!(ReactiveRuntime::current().config().max_notification_depth, 3);
        });
        assert_ne!(ReactiveRuntime::current().config().max_notification_depth, 3);
    }

    #[test]
    fn depth_guard_limits_nesting() {
        let config = RuntimeConfig::default().with_max_notification_depth(2);
        ReactiveRuntime::with_config(config, || {
            let rt = ReactiveRuntime::current();
            let id = ReactiveRuntime::next_id();
            let g1 = rt.enter_notification(id);
            let g2 = rt.enter_notification(id);
            assert!(g1.is_some() && g2.is_some());
            assert!(rt.enter_notification(id).is_none());
            assert_eq!(rt.dropped_notifications(), 1);
            drop(g2);
            assert_eq!(rt.depth(), 1);
            assert!(rt.enter_notification(id).is_some());
        });
    }

    #[test]
    fn zero_depth_is_clamped() {
        let config = RuntimeConfig::default().with_max_notification_depth(0);
        assert_eq!(config.max_notification_depth, 1);
    }
}
