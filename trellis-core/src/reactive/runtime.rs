//! Reactive Runtime
//!
//! The runtime is the context object that connects cells, memos, effects and
//! the document they render into. It owns every piece of state that a
//! classic signal library keeps in globals:
//!
//! - the active-effect stack ([`ContextStack`]),
//! - the registry of live effects,
//! - the batch depth and its queue of pending notifications,
//! - the stack of current [`Scope`]s,
//! - the error handlers and queued mount callbacks,
//! - the [`Document`].
//!
//! A [`Runtime`] is a cheap, clonable handle. Independent runtimes can live
//! side by side in one process (every test builds its own). Cells, effects
//! and scopes only keep a [`WeakRuntime`] back to their runtime.
//!
//! # Teardown
//!
//! The effect registry owns every effect body. A body (or a render function,
//! or an event listener) that captures a strong [`Runtime`] clone therefore
//! keeps the runtime alive for as long as the effect lives. Closures that
//! must outlive the code building them should capture
//! [`Runtime::downgrade`] and upgrade on use; otherwise call
//! [`Runtime::dispose`] when the application shuts down, which disposes
//! every mounted scope and effect and so drops the closures holding clones.
//!
//! # Threading
//!
//! The runtime is single-threaded and cooperative. All handles are `!Send`;
//! interior mutability is plain `RefCell`, with every borrow released before
//! user code runs.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, error};

use super::batch::BatchQueue;
use super::context::{ContextStack, ReactiveContext};
use super::effect::EffectInner;
use super::scope::Scope;
use super::subscriber::SubscriberId;
use crate::config::RuntimeConfig;
use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};

/// Callback receiving every reported error, with the failing component's
/// name when there is one.
pub type ErrorHandler = Rc<dyn Fn(&Error, Option<&str>)>;

pub(crate) struct RuntimeInner {
    pub(crate) config: RuntimeConfig,
    pub(crate) context: ContextStack,
    pub(crate) effects: RefCell<IndexMap<SubscriberId, Rc<EffectInner>>>,
    pub(crate) batch: BatchQueue,
    pub(crate) scopes: RefCell<Vec<Option<Scope>>>,
    pub(crate) error_handlers: RefCell<Vec<ErrorHandler>>,
    pub(crate) mount_callbacks: RefCell<Vec<Box<dyn FnOnce()>>>,
    pub(crate) mounted: RefCell<IndexMap<NodeId, Scope>>,
    pub(crate) component_counter: Cell<u64>,
    pub(crate) document: Document,
}

/// Handle to a reactive runtime.
#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Rc<RuntimeInner>,
}

/// Non-owning runtime handle, for closures the runtime itself stores.
#[derive(Clone, Default)]
pub struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    /// The runtime, unless every strong handle is gone.
    pub fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }

    /// Like [`upgrade`](Self::upgrade), for closures that return a
    /// [`Result`].
    pub fn try_upgrade(&self) -> Result<Runtime> {
        self.upgrade().ok_or(Error::RuntimeDropped)
    }
}

impl fmt::Debug for WeakRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakRuntime")
            .field(&(self.0.strong_count() > 0))
            .finish()
    }
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                context: ContextStack::default(),
                effects: RefCell::new(IndexMap::new()),
                batch: BatchQueue::default(),
                scopes: RefCell::new(Vec::new()),
                error_handlers: RefCell::new(Vec::new()),
                mount_callbacks: RefCell::new(Vec::new()),
                mounted: RefCell::new(IndexMap::new()),
                component_counter: Cell::new(0),
                document: Document::new(),
            }),
        }
    }

    /// A handle that does not keep the runtime alive.
    pub fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    /// The runtime's configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// The document this runtime renders into.
    pub fn document(&self) -> Document {
        self.inner.document.clone()
    }

    /// Number of live (not yet disposed) effects.
    pub fn effect_count(&self) -> usize {
        self.inner.effects.borrow().len()
    }

    /// Whether a cell read right now would register a dependency.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.current_subscriber().is_some()
    }

    /// The effect whose body is currently executing, if any.
    pub fn active_effect(&self) -> Option<SubscriberId> {
        self.inner.context.current_subscriber()
    }

    /// Run `f` without registering any dependency on the cells it reads.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = ReactiveContext::enter(&self.inner.context, None);
        f()
    }

    /// Register a handler for errors caught anywhere in the runtime.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&Error, Option<&str>) + 'static,
    {
        self.inner.error_handlers.borrow_mut().push(Rc::new(handler));
    }

    /// Log `error` and hand it to every registered error handler.
    pub fn report_error(&self, error: &Error, component: Option<&str>) {
        match component {
            Some(name) => error!(component = name, %error, "component failed"),
            None => error!(%error, "reactive computation failed"),
        }

        let handlers = self.inner.error_handlers.borrow().clone();
        for handler in handlers {
            handler(error, component);
        }
    }

    /// Dispose the effect with the given ID, if it is still live.
    pub fn dispose_effect(&self, id: SubscriberId) {
        let effect = self.inner.effects.borrow().get(&id).cloned();
        if let Some(effect) = effect {
            effect.dispose();
        }
    }

    /// Dispose every mounted application scope and every remaining effect,
    /// and forget the error handlers and pending mount callbacks.
    ///
    /// Cells stay readable and writable but nothing reacts to them anymore.
    /// Event listeners stay attached to their nodes until the nodes are
    /// released.
    pub fn dispose(&self) {
        let mounted: Vec<Scope> = self.inner.mounted.borrow_mut().drain(..).map(|(_, scope)| scope).collect();
        for scope in mounted {
            scope.dispose();
        }

        let effects: Vec<SubscriberId> = self.inner.effects.borrow().keys().copied().collect();
        debug!(effects = effects.len(), "disposing runtime");
        for id in effects {
            self.dispose_effect(id);
        }

        self.inner.error_handlers.borrow_mut().clear();
        self.inner.mount_callbacks.borrow_mut().clear();
    }

    /// The scope that owned the given effect when it was created.
    pub(crate) fn effect_owner(&self, id: SubscriberId) -> Option<Scope> {
        let effect = self.inner.effects.borrow().get(&id).cloned()?;
        effect.owner()
    }

    pub(crate) fn next_component_id(&self) -> u64 {
        let id = self.inner.component_counter.get();
        self.inner.component_counter.set(id + 1);
        id
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("effects", &self.effect_count())
            .field("batching", &self.inner.batch.is_batching())
            .field("nodes", &self.inner.document.len())
            .finish()
    }
}
