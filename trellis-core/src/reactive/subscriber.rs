//! Subscriber types for the reactive system.
//!
//! A Subscriber is the notification target a cell calls when its value
//! changes. Effects register one for themselves; plain callbacks attached with
//! [`ReadSignal::subscribe`](super::ReadSignal::subscribe) get one as well.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// Each subscriber (effect, memo or plain callback) gets a unique ID when
/// created. Cells key their subscriber sets by it, so subscribing the same
/// computation twice is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity token of a reactive cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// A notification target.
///
/// Cloning is cheap and preserves identity: two clones share the same ID and
/// callback, which is what batch deduplication keys on.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    notify: Rc<dyn Fn()>,
}

impl Subscriber {
    /// Create a subscriber with the given ID and notification callback.
    pub fn new<F>(id: SubscriberId, notify: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            id,
            notify: Rc::new(notify),
        }
    }

    /// The subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Notify the subscriber that one of its dependencies changed.
    pub fn notify(&self) {
        (self.notify)();
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}

/// Type-erased view of a cell, used to unsubscribe from cells an effect
/// stopped reading.
pub(crate) trait Source {
    fn unsubscribe(&self, subscriber: SubscriberId);
}
