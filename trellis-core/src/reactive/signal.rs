//! Signal Implementation
//!
//! A signal is the fundamental reactive cell. It holds a value and the set of
//! subscribers that read it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while an effect is running, the signal adds that
//!    effect to its subscriber set and the runtime records the read.
//!
//! 2. When a write produces a value different from the current one, every
//!    subscriber is notified, in subscription order, before the setter
//!    returns. Inside a batch the notification is queued instead.
//!
//! 3. A write equal to the current value is dropped without notifying.
//!
//! Signals are created split: a [`ReadSignal`] that can be handed to views
//! and a [`WriteSignal`] that stays with whoever owns the state.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::batch::Notification;
use super::runtime::{Runtime, WeakRuntime};
use super::subscriber::{Source, SourceId, Subscriber, SubscriberId};

struct SignalInner<T> {
    id: SourceId,
    value: RefCell<T>,
    subscribers: RefCell<IndexMap<SubscriberId, Subscriber>>,
    runtime: WeakRuntime,
}

impl<T> Source for SignalInner<T> {
    fn unsubscribe(&self, subscriber: SubscriberId) {
        self.subscribers.borrow_mut().shift_remove(&subscriber);
    }
}

impl<T: 'static> SignalInner<T> {
    fn track(self: &Rc<Self>) {
        let Some(runtime) = self.runtime.upgrade() else {
            return;
        };
        let weak: Weak<dyn Source> = Rc::downgrade(self) as Weak<dyn Source>;
        if let Some(subscriber) = runtime.inner.context.observe(self.id, weak) {
            self.subscribers
                .borrow_mut()
                .entry(subscriber.id())
                .or_insert(subscriber);
        }
    }

    fn notify(&self) {
        let snapshot: Vec<Subscriber> = self.subscribers.borrow().values().cloned().collect();
        if snapshot.is_empty() {
            return;
        }

        match self.runtime.upgrade() {
            Some(runtime) if runtime.is_batching() => {
                runtime.inner.batch.enqueue(Notification {
                    source: self.id,
                    subscribers: snapshot,
                });
            }
            _ => {
                for subscriber in snapshot {
                    subscriber.notify();
                }
            }
        }
    }
}

/// Read half of a signal.
pub struct ReadSignal<T> {
    inner: Rc<SignalInner<T>>,
}

/// Write half of a signal.
pub struct WriteSignal<T> {
    inner: Rc<SignalInner<T>>,
}

/// Handle returned by [`ReadSignal::subscribe`].
#[derive(Debug, Clone)]
pub struct Unsubscribe {
    id: SubscriberId,
    source: Weak<dyn Source>,
}

impl Unsubscribe {
    pub(crate) fn new(id: SubscriberId, source: Weak<dyn Source>) -> Self {
        Self { id, source }
    }

    /// Detach the callback. Calling it twice is harmless.
    pub fn unsubscribe(&self) {
        if let Some(source) = self.source.upgrade() {
            source.unsubscribe(self.id);
        }
    }
}

impl Runtime {
    /// Create a reactive cell holding `value`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use trellis_core::Runtime;
    ///
    /// let rt = Runtime::new();
    /// let (count, set_count) = rt.signal(0);
    ///
    /// set_count.set(5);
    /// set_count.update(|n| n + 1);
    /// assert_eq!(count.get(), 6);
    /// ```
    pub fn signal<T: 'static>(&self, value: T) -> (ReadSignal<T>, WriteSignal<T>) {
        let inner = Rc::new(SignalInner {
            id: SourceId::new(),
            value: RefCell::new(value),
            subscribers: RefCell::new(IndexMap::new()),
            runtime: self.downgrade(),
        });

        (
            ReadSignal {
                inner: Rc::clone(&inner),
            },
            WriteSignal { inner },
        )
    }
}

impl<T: 'static> ReadSignal<T> {
    /// The signal's identity token.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Read the value, subscribing the running effect (if any).
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.track();
        self.inner.value.borrow().clone()
    }

    /// Borrow the value, subscribing the running effect (if any).
    ///
    /// Writing to the same signal from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.track();
        f(&self.inner.value.borrow())
    }

    /// Read the value without registering a dependency.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Attach a plain callback that runs after every change.
    pub fn subscribe<F>(&self, f: F) -> Unsubscribe
    where
        F: Fn() + 'static,
    {
        let id = SubscriberId::new();
        self.inner
            .subscribers
            .borrow_mut()
            .insert(id, Subscriber::new(id, f));

        let source: Weak<dyn Source> = Rc::downgrade(&self.inner) as Weak<dyn Source>;
        Unsubscribe::new(id, source)
    }

    /// Number of subscribers currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }
}

impl<T: PartialEq + 'static> WriteSignal<T> {
    /// Replace the value and notify subscribers, unless it is unchanged.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.inner.notify();
    }

    /// Compute the next value from the current one, then [`set`](Self::set) it.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.value.borrow());
        self.set(next);
    }

    /// Read the value without registering a dependency.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSignal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("subscriber_count", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

impl<T> fmt::Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSignal")
            .field("id", &self.inner.id)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
