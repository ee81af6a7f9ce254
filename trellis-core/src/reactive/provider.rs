//! Context Values
//!
//! A [`Context`] hands a value down the ownership tree without threading it
//! through every render function. Values live on [`Scope`]s: a lookup starts
//! at the current scope (or, inside an effect run, at the scope owning the
//! effect) and walks up until a scope holding a value is found. With no
//! provider in reach the context's default is used.
//!
//! Because lookups follow ownership rather than call order, content that a
//! region or router renders again later still sees the value that was
//! provided around it.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::runtime::{Runtime, WeakRuntime};
use super::scope::Scope;

/// A typed key for values provided to a subtree. Created by
/// [`Runtime::context`].
pub struct Context<T> {
    id: u64,
    runtime: WeakRuntime,
    default: Rc<T>,
}

impl Runtime {
    /// Create a context whose value is `default` wherever nothing was
    /// provided.
    ///
    /// ```rust
    /// use trellis_core::Runtime;
    ///
    /// let rt = Runtime::new();
    /// let theme = rt.context("light");
    ///
    /// assert_eq!(theme.get(), "light");
    /// let inside = theme.provide("dark", || theme.get());
    /// assert_eq!(inside, "dark");
    /// ```
    pub fn context<T: 'static>(&self, default: T) -> Context<T> {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Context {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            runtime: self.downgrade(),
            default: Rc::new(default),
        }
    }
}

impl<T: 'static> Context<T> {
    /// Run `children` in a new scope that holds `value` for this context.
    ///
    /// The scope is owned by the current scope, if any, and effects created
    /// by `children` keep it reachable for later lookups.
    pub fn provide<R>(&self, value: T, children: impl FnOnce() -> R) -> R {
        let Some(runtime) = self.runtime.upgrade() else {
            return children();
        };
        let scope = runtime.scope();
        scope.provide(self, value);
        scope.run(children)
    }

    /// Borrow the nearest provided value, or the default.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self.lookup() {
            Some(value) => f(&value),
            None => f(&self.default),
        }
    }

    /// The nearest provided value, or the default.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Whether a provider is in reach.
    pub fn is_provided(&self) -> bool {
        self.lookup().is_some()
    }

    fn lookup(&self) -> Option<Rc<T>> {
        let runtime = self.runtime.upgrade()?;
        let value = runtime.context_scope()?.find_context(self.id)?;
        let value = value.downcast::<T>().ok();
        if value.is_none() {
            trace!(context = self.id, "context value has an unexpected type");
        }
        value
    }
}

impl Scope {
    /// Store `value` for `context` on this scope.
    pub fn provide<T: 'static>(&self, context: &Context<T>, value: T) {
        self.insert_context(context.id, Rc::new(value));
    }
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            runtime: self.runtime.clone(),
            default: Rc::clone(&self.default),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("default", &self.default)
            .finish()
    }
}
