//! Ownership scopes.
//!
//! A [`Scope`] owns the effects created while it is the current scope, any
//! child scopes, and cleanup callbacks registered with
//! [`Runtime::on_cleanup`]. Disposing a scope tears all of them down. The view
//! layer gives every piece of replaceable content its own scope, so the
//! effects bound to nodes that leave the tree stop running with them.
//!
//! Effect runs start with no current scope; only an explicit
//! [`Scope::run`] makes newly created effects owned. A scope created during
//! an effect run is not owned by anything, but it still inherits the
//! context values visible to the scope that owns the running effect.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::trace;

use super::effect::Cleanup;
use super::runtime::{Runtime, WeakRuntime};
use super::subscriber::SubscriberId;

struct ScopeInner {
    runtime: WeakRuntime,
    parent: RefCell<Weak<ScopeInner>>,
    /// Where context lookups continue when there is no parent.
    inherits: RefCell<Weak<ScopeInner>>,
    contexts: RefCell<IndexMap<u64, Rc<dyn Any>>>,
    effects: RefCell<Vec<SubscriberId>>,
    children: RefCell<Vec<Scope>>,
    cleanups: RefCell<Vec<Cleanup>>,
    disposed: Cell<bool>,
}

/// Owner of effects, child scopes and cleanups.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Scope {
    fn detached(runtime: WeakRuntime) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                runtime,
                parent: RefCell::new(Weak::new()),
                inherits: RefCell::new(Weak::new()),
                contexts: RefCell::new(IndexMap::new()),
                effects: RefCell::new(Vec::new()),
                children: RefCell::new(Vec::new()),
                cleanups: RefCell::new(Vec::new()),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Run `f` with this scope as the current owner.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        match self.inner.runtime.upgrade() {
            Some(runtime) => {
                let _guard = ScopeGuard::enter(&runtime, Some(self.clone()));
                f()
            }
            None => f(),
        }
    }

    /// Create a scope disposed together with this one.
    pub fn child(&self) -> Scope {
        let child = Scope::detached(self.inner.runtime.clone());
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        self.inner.children.borrow_mut().push(child.clone());
        child
    }

    /// Register a callback to run when this scope is disposed.
    pub fn on_cleanup(&self, f: impl FnOnce() + 'static) {
        if self.inner.disposed.get() {
            f();
            return;
        }
        self.inner.cleanups.borrow_mut().push(Cleanup::new(f));
    }

    /// Dispose child scopes, then owned effects, then run cleanups in
    /// reverse registration order.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }

        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in children {
            child.dispose();
        }

        let effects = std::mem::take(&mut *self.inner.effects.borrow_mut());
        if let Some(runtime) = self.inner.runtime.upgrade() {
            trace!(effects = effects.len(), "disposing scope");
            for id in effects {
                runtime.dispose_effect(id);
            }
        }

        let cleanups = std::mem::take(&mut *self.inner.cleanups.borrow_mut());
        for cleanup in cleanups.into_iter().rev() {
            cleanup.run();
        }
        self.inner.contexts.borrow_mut().clear();

        let parent = self.inner.parent.borrow().upgrade();
        if let Some(parent) = parent {
            parent
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(&child.inner, &self.inner));
        }
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of effects this scope owns directly.
    pub fn effect_count(&self) -> usize {
        self.inner.effects.borrow().len()
    }

    /// Number of live child scopes.
    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    pub(crate) fn insert_context(&self, id: u64, value: Rc<dyn Any>) {
        self.inner.contexts.borrow_mut().insert(id, value);
    }

    /// The nearest value stored under `id`, searching this scope and then
    /// the scopes it descends from.
    pub(crate) fn find_context(&self, id: u64) -> Option<Rc<dyn Any>> {
        let mut current = Some(Rc::clone(&self.inner));
        while let Some(scope) = current {
            if let Some(value) = scope.contexts.borrow().get(&id) {
                return Some(Rc::clone(value));
            }
            let parent = scope.parent.borrow().upgrade();
            current = parent.or_else(|| scope.inherits.borrow().upgrade());
        }
        None
    }

    fn adopt(&self, effect: SubscriberId) {
        if !self.inner.disposed.get() {
            self.inner.effects.borrow_mut().push(effect);
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("effects", &self.effect_count())
            .field("children", &self.child_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Pushes a scope (or a "no owner" barrier) for as long as it lives.
pub(crate) struct ScopeGuard<'a> {
    runtime: &'a Runtime,
}

impl<'a> ScopeGuard<'a> {
    pub(crate) fn enter(runtime: &'a Runtime, scope: Option<Scope>) -> Self {
        runtime.inner.scopes.borrow_mut().push(scope);
        Self { runtime }
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.runtime.inner.scopes.borrow_mut().pop();
    }
}

impl Runtime {
    /// Create a scope, owned by the current scope if there is one.
    pub fn scope(&self) -> Scope {
        match self.current_scope() {
            Some(parent) => parent.child(),
            None => {
                let scope = Scope::detached(self.downgrade());
                if let Some(owner) = self.active_effect().and_then(|id| self.effect_owner(id)) {
                    *scope.inner.inherits.borrow_mut() = Rc::downgrade(&owner.inner);
                }
                scope
            }
        }
    }

    /// The scope context lookups start from: the current scope, or inside
    /// an effect run, the scope that owns the running effect.
    pub(crate) fn context_scope(&self) -> Option<Scope> {
        self.current_scope()
            .or_else(|| self.active_effect().and_then(|id| self.effect_owner(id)))
    }

    /// The scope that newly created effects are attached to.
    pub fn current_scope(&self) -> Option<Scope> {
        self.inner.scopes.borrow().last().cloned().flatten()
    }

    /// Register `f` to run when the current scope is disposed.
    ///
    /// Returns `false` (and drops `f`) when there is no current scope.
    pub fn on_cleanup(&self, f: impl FnOnce() + 'static) -> bool {
        match self.current_scope() {
            Some(scope) => {
                scope.on_cleanup(f);
                true
            }
            None => {
                trace!("cleanup registered outside any scope was dropped");
                false
            }
        }
    }

    /// Attach `effect` to the current scope and return that scope.
    pub(crate) fn adopt_effect(&self, effect: SubscriberId) -> Option<Scope> {
        let scope = self.current_scope()?;
        scope.adopt(effect);
        Some(scope)
    }
}
