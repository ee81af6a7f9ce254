//! Memo Implementation
//!
//! A Memo is a derived value: a signal kept current by an effect the memo
//! owns. The effect evaluates the memo's function, tracking the cells it
//! reads, and writes the result into the inner signal. Because the write goes
//! through the signal's setter, an evaluation that produces an equal value
//! does not notify the memo's readers.
//!
//! Only the read half is exposed, so a derived value cannot be set directly.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use super::effect::Dispose;
use super::runtime::Runtime;
use super::signal::{ReadSignal, WriteSignal};
use super::subscriber::SourceId;

/// A derived, read-only reactive value.
pub struct Memo<T> {
    value: ReadSignal<T>,
    effect: Dispose,
}

impl Runtime {
    /// Create a derived value from `f`.
    ///
    /// `f` runs once immediately and again whenever a cell it read changes.
    ///
    /// ```rust
    /// use trellis_core::Runtime;
    ///
    /// let rt = Runtime::new();
    /// let (count, set_count) = rt.signal(2);
    /// let doubled = rt.memo(move || count.get() * 2);
    ///
    /// set_count.set(5);
    /// assert_eq!(doubled.get(), 10);
    /// ```
    pub fn memo<T, F>(&self, f: F) -> Memo<T>
    where
        T: PartialEq + 'static,
        F: Fn() -> T + 'static,
    {
        let slot: Rc<OnceCell<(ReadSignal<T>, WriteSignal<T>)>> = Rc::default();

        let runtime = self.downgrade();
        let writer = Rc::clone(&slot);
        let effect = self.effect(move || {
            let value = f();
            match writer.get() {
                Some((_, set)) => set.set(value),
                None => {
                    if let Some(runtime) = runtime.upgrade() {
                        let _ = writer.set(runtime.signal(value));
                    }
                }
            }
        });

        let (value, _) = slot
            .get()
            .cloned()
            .expect("memo is evaluated when it is created");

        Memo { value, effect }
    }
}

impl<T: 'static> Memo<T> {
    /// Identity of the inner cell.
    pub fn id(&self) -> SourceId {
        self.value.id()
    }

    /// Read the value, subscribing the running effect (if any).
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.get()
    }

    /// Borrow the value, subscribing the running effect (if any).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.value.with(f)
    }

    /// Read the value without registering a dependency.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.value.peek()
    }

    /// Stop recomputing. The last value stays readable.
    pub fn dispose(&self) {
        self.effect.dispose();
    }

    /// The read half of the inner cell.
    pub fn signal(&self) -> ReadSignal<T> {
        self.value.clone()
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            effect: self.effect.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("value", &self.value)
            .field("effect", &self.effect.id())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn memo_tracks_signal_dependency() {
        let rt = Runtime::new();
        let (value, set_value) = rt.signal(10);
        let doubled = rt.memo(move || value.get() * 2);

        assert_eq!(doubled.get(), 20);
        set_value.set(5);
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn memo_evaluates_once_per_change() {
        let rt = Runtime::new();
        let (value, set_value) = rt.signal(1);
        let evaluations = Rc::new(Cell::new(0));

        let counter = evaluations.clone();
        let squared = rt.memo(move || {
            counter.set(counter.get() + 1);
            value.get() * value.get()
        });

        assert_eq!(squared.get(), 1);
        assert_eq!(squared.get(), 1);
        assert_eq!(evaluations.get(), 1);

        set_value.set(3);
        assert_eq!(squared.get(), 9);
        assert_eq!(evaluations.get(), 2);
    }

    #[test]
    fn memo_depends_on_memo() {
        let rt = Runtime::new();
        let (base, set_base) = rt.signal(5);
        let doubled = rt.memo(move || base.get() * 2);
        let doubled_reader = doubled.clone();
        let plus_ten = rt.memo(move || doubled_reader.get() + 10);

        assert_eq!(plus_ten.get(), 20);
        set_base.set(10);
        assert_eq!(doubled.get(), 20);
        assert_eq!(plus_ten.get(), 30);
    }

    #[test]
    fn unchanged_result_does_not_notify_readers() {
        let rt = Runtime::new();
        let (value, set_value) = rt.signal(4);
        let parity = rt.memo(move || value.get() % 2);
        let runs = Rc::new(Cell::new(0));

        let counter = runs.clone();
        let reader = parity.clone();
        let _effect = rt.effect(move || {
            reader.get();
            counter.set(counter.get() + 1);
        });

        set_value.set(6);
        set_value.set(8);
        assert_eq!(runs.get(), 1);

        set_value.set(9);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn disposed_memo_keeps_last_value() {
        let rt = Runtime::new();
        let (value, set_value) = rt.signal(1);
        let memo = rt.memo(move || value.get() + 1);

        memo.dispose();
        set_value.set(10);

        assert_eq!(memo.peek(), 2);
    }
}
