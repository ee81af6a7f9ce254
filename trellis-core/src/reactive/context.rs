//! Reactive Context
//!
//! The reactive context tracks which effect is currently running. When a cell
//! is read, the cell asks the context for the active subscriber and the
//! context records the cell as a dependency of that run.
//!
//! # Implementation
//!
//! Each [`Runtime`](crate::Runtime) owns a stack of entries. Running an
//! effect pushes an entry, and the guard returned by
//! [`ReactiveContext::enter`] pops it again, restoring whatever effect was
//! active before. Untracked sections push an entry without a subscriber.

use std::cell::RefCell;
use std::rc::Weak;

use indexmap::IndexMap;

use super::subscriber::{Source, SourceId, Subscriber, SubscriberId};

/// Cells read during one run, in first-read order.
pub(crate) type ReadSet = IndexMap<SourceId, Weak<dyn Source>>;

struct ContextEntry {
    subscriber: Option<Subscriber>,
    reads: ReadSet,
}

/// The per-runtime stack of running computations.
#[derive(Default)]
pub(crate) struct ContextStack {
    entries: RefCell<Vec<ContextEntry>>,
}

impl ContextStack {
    /// The active subscriber, if the top of the stack is tracking.
    pub(crate) fn current_subscriber(&self) -> Option<SubscriberId> {
        self.entries
            .borrow()
            .last()
            .and_then(|entry| entry.subscriber.as_ref().map(Subscriber::id))
    }

    /// Record a read of `source` and return the subscriber that should be
    /// attached to it.
    pub(crate) fn observe(&self, id: SourceId, source: Weak<dyn Source>) -> Option<Subscriber> {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.last_mut()?;
        let subscriber = entry.subscriber.clone()?;
        entry.reads.entry(id).or_insert(source);
        Some(subscriber)
    }

    pub(crate) fn depth(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// Guard that pops its context entry when dropped.
///
/// This keeps the stack balanced even when the computation exits early.
pub(crate) struct ReactiveContext<'a> {
    stack: &'a ContextStack,
    subscriber: Option<SubscriberId>,
    depth: usize,
    finished: bool,
}

impl<'a> ReactiveContext<'a> {
    /// Make `subscriber` the active computation until the guard is dropped.
    /// `None` suspends tracking.
    pub(crate) fn enter(stack: &'a ContextStack, subscriber: Option<Subscriber>) -> Self {
        let id = subscriber.as_ref().map(Subscriber::id);
        let mut entries = stack.entries.borrow_mut();
        entries.push(ContextEntry {
            subscriber,
            reads: ReadSet::new(),
        });
        let depth = entries.len();

        Self {
            stack,
            subscriber: id,
            depth,
            finished: false,
        }
    }

    /// Leave the context and return the cells read while it was active.
    pub(crate) fn finish(mut self) -> ReadSet {
        self.finished = true;
        self.pop().map(|entry| entry.reads).unwrap_or_default()
    }

    fn pop(&self) -> Option<ContextEntry> {
        let popped = self.stack.entries.borrow_mut().pop();
        debug_assert_eq!(
            popped.as_ref().map(|entry| entry.subscriber.as_ref().map(Subscriber::id)),
            Some(self.subscriber),
            "ReactiveContext mismatch at depth {}",
            self.depth
        );
        popped
    }
}

impl Drop for ReactiveContext<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.pop();
        }
    }
}
