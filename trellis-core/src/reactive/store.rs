//! Stores
//!
//! A [`Store`] is a signal with a reducer in front of it. State changes go
//! through [`Store::dispatch`], which hands the current state and an action
//! to the reducer and writes back whatever it returns. Reads are tracked like
//! any other cell read, and plain listeners attached with
//! [`Store::subscribe`] receive the new state after every change.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::Runtime;
//!
//! enum Counter {
//!     Add(i32),
//!     Reset,
//! }
//!
//! let rt = Runtime::new();
//! let store = rt.store(0, |count: &i32, action: Counter| match action {
//!     Counter::Add(n) => count + n,
//!     Counter::Reset => 0,
//! });
//!
//! store.dispatch(Counter::Add(2));
//! store.dispatch(Counter::Add(3));
//! assert_eq!(store.get(), 5);
//!
//! store.dispatch(Counter::Reset);
//! assert_eq!(store.get(), 0);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::trace;

use super::runtime::Runtime;
use super::signal::{ReadSignal, Unsubscribe, WriteSignal};
use super::subscriber::{Source, SubscriberId};

type Listener<S> = Rc<dyn Fn(&S)>;

struct Listeners<S> {
    callbacks: RefCell<IndexMap<SubscriberId, Listener<S>>>,
}

impl<S> Source for Listeners<S> {
    fn unsubscribe(&self, subscriber: SubscriberId) {
        self.callbacks.borrow_mut().shift_remove(&subscriber);
    }
}

/// Reactive state changed through a reducer. Created by [`Runtime::store`].
pub struct Store<S, A> {
    state: ReadSignal<S>,
    write: WriteSignal<S>,
    reducer: Rc<dyn Fn(&S, A) -> S>,
    listeners: Rc<Listeners<S>>,
}

impl Runtime {
    /// Create a store holding `initial`, changed by dispatching actions to
    /// `reducer`.
    pub fn store<S, A, R>(&self, initial: S, reducer: R) -> Store<S, A>
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
        R: Fn(&S, A) -> S + 'static,
    {
        let (state, write) = self.signal(initial);
        Store {
            state,
            write,
            reducer: Rc::new(reducer),
            listeners: Rc::new(Listeners {
                callbacks: RefCell::new(IndexMap::new()),
            }),
        }
    }
}

impl<S, A> Store<S, A>
where
    S: Clone + PartialEq + 'static,
    A: 'static,
{
    /// Read the state, subscribing the running effect (if any).
    pub fn get(&self) -> S {
        self.state.get()
    }

    /// Borrow the state, subscribing the running effect (if any).
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.state.with(f)
    }

    /// Read the state without registering a dependency.
    pub fn peek(&self) -> S {
        self.state.peek()
    }

    /// The underlying read half, for views that take a cell.
    pub fn state(&self) -> ReadSignal<S> {
        self.state.clone()
    }

    /// Run the reducer on the current state and `action`.
    pub fn dispatch(&self, action: A) {
        let next = (self.reducer)(&self.write.peek(), action);
        self.set(next);
    }

    /// Replace the state outright, bypassing the reducer.
    ///
    /// Writing a value equal to the current state notifies nobody.
    pub fn set(&self, value: S) {
        if self.write.peek() == value {
            return;
        }
        self.write.set(value);

        let snapshot: Vec<Listener<S>> = self.listeners.callbacks.borrow().values().cloned().collect();
        if snapshot.is_empty() {
            return;
        }
        trace!(listeners = snapshot.len(), "store changed");
        let state = self.write.peek();
        for listener in snapshot {
            listener(&state);
        }
    }

    /// Compute the next state from the current one, then [`set`](Self::set) it.
    pub fn update(&self, f: impl FnOnce(&S) -> S) {
        let next = f(&self.write.peek());
        self.set(next);
    }

    /// Call `f` with the new state after every change.
    pub fn subscribe<F>(&self, f: F) -> Unsubscribe
    where
        F: Fn(&S) + 'static,
    {
        let id = SubscriberId::new();
        self.listeners.callbacks.borrow_mut().insert(id, Rc::new(f));

        let source: Weak<dyn Source> = Rc::downgrade(&self.listeners) as Weak<dyn Source>;
        Unsubscribe::new(id, source)
    }

    /// Number of listeners attached with [`subscribe`](Self::subscribe).
    pub fn listener_count(&self) -> usize {
        self.listeners.callbacks.borrow().len()
    }
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            write: self.write.clone(),
            reducer: Rc::clone(&self.reducer),
            listeners: Rc::clone(&self.listeners),
        }
    }
}

impl<S: fmt::Debug, A> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("listeners", &self.listeners.callbacks.borrow().len())
            .finish()
    }
}
