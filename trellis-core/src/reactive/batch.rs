//! Update batching.
//!
//! While a batch is open, cell writes do not notify. Each write enqueues a
//! [`Notification`] holding the subscribers the cell had at write time. When
//! the outermost batch closes, the queue is flushed: subscribers are
//! deduplicated by identity and notified once each, in the order they were
//! first enqueued.

use std::cell::{Cell, RefCell};

use indexmap::IndexMap;
use tracing::trace;

use super::runtime::Runtime;
use super::subscriber::{SourceId, Subscriber, SubscriberId};

/// A deferred notification: the subscriber snapshot of one cell write.
#[derive(Debug)]
pub(crate) struct Notification {
    pub(crate) source: SourceId,
    pub(crate) subscribers: Vec<Subscriber>,
}

#[derive(Debug, Default)]
pub(crate) struct BatchQueue {
    depth: Cell<usize>,
    pending: RefCell<Vec<Notification>>,
}

impl BatchQueue {
    pub(crate) fn is_batching(&self) -> bool {
        self.depth.get() > 0
    }

    pub(crate) fn enqueue(&self, notification: Notification) {
        self.pending.borrow_mut().push(notification);
    }

    fn enter(&self) -> BatchGuard<'_> {
        self.depth.set(self.depth.get() + 1);
        BatchGuard { queue: self }
    }

    /// Drain the queue into one subscriber list, first occurrence wins.
    fn drain(&self) -> Vec<Subscriber> {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        let mut unique: IndexMap<SubscriberId, Subscriber> = IndexMap::new();
        for notification in pending {
            trace!(
                source = %notification.source,
                subscribers = notification.subscribers.len(),
                "flushing batched write"
            );
            for subscriber in notification.subscribers {
                unique.entry(subscriber.id()).or_insert(subscriber);
            }
        }
        unique.into_values().collect()
    }
}

/// Closes one batch level when dropped, even if the batch body unwinds.
struct BatchGuard<'a> {
    queue: &'a BatchQueue,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.queue.depth.set(self.queue.depth.get().saturating_sub(1));
    }
}

impl Runtime {
    /// Run `f` with notifications deferred until it returns.
    ///
    /// Nested batches are absorbed by the outermost one. Every effect
    /// notified during the batch runs exactly once afterwards, no matter how
    /// many of its cells were written.
    ///
    /// ```rust
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    /// use trellis_core::Runtime;
    ///
    /// let rt = Runtime::new();
    /// let (first, set_first) = rt.signal("Ada".to_string());
    /// let (last, set_last) = rt.signal("Lovelace".to_string());
    /// let runs = Rc::new(Cell::new(0));
    ///
    /// let counter = runs.clone();
    /// let _effect = rt.effect(move || {
    ///     let _ = (first.get(), last.get());
    ///     counter.set(counter.get() + 1);
    /// });
    ///
    /// rt.batch(|| {
    ///     set_first.set("Grace".into());
    ///     set_last.set("Hopper".into());
    /// });
    /// assert_eq!(runs.get(), 2);
    /// ```
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let result = {
            let _guard = self.inner.batch.enter();
            f()
        };

        if !self.inner.batch.is_batching() {
            let subscribers = self.inner.batch.drain();
            for subscriber in subscribers {
                subscriber.notify();
            }
        }

        result
    }

    /// Whether a batch is currently open.
    pub fn is_batching(&self) -> bool {
        self.inner.batch.is_batching()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn counting_effect(rt: &Runtime, reads: impl Fn() + 'static) -> Rc<Cell<usize>> {
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let _effect = rt.effect(move || {
            reads();
            counter.set(counter.get() + 1);
        });
        runs
    }

    #[test]
    fn writes_are_deferred_until_batch_exit() {
        let rt = Runtime::new();
        let (count, set_count) = rt.signal(0);
        let runs = counting_effect(&rt, move || {
            count.get();
        });

        rt.batch(|| {
            set_count.set(1);
            set_count.set(2);
            assert_eq!(runs.get(), 1);
        });

        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn nested_batches_flush_once() {
        let rt = Runtime::new();
        let (count, set_count) = rt.signal(0);
        let runs = counting_effect(&rt, move || {
            count.get();
        });

        rt.batch(|| {
            set_count.set(1);
            rt.batch(|| set_count.set(2));
            assert_eq!(runs.get(), 1, "inner batch must not flush");
        });

        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn flush_order_follows_first_enqueue() {
        let rt = Runtime::new();
        let (a, set_a) = rt.signal(0);
        let (b, set_b) = rt.signal(0);
        let order = Rc::new(RefCell::new(Vec::new()));

        let log = order.clone();
        let _on_b = rt.effect(move || {
            b.get();
            log.borrow_mut().push("b");
        });
        let log = order.clone();
        let _on_a = rt.effect(move || {
            a.get();
            log.borrow_mut().push("a");
        });
        order.borrow_mut().clear();

        rt.batch(|| {
            set_a.set(1);
            set_b.set(1);
        });

        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn batch_returns_value() {
        let rt = Runtime::new();
        assert_eq!(rt.batch(|| 7), 7);
        assert!(!rt.is_batching());
    }
}
