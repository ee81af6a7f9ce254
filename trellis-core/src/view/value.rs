//! Static-or-reactive values.

use std::fmt;
use std::rc::Rc;

use crate::dom::Style;
use crate::reactive::{Memo, ReadSignal};

/// A value that is either fixed or recomputed from reactive reads.
///
/// Dynamic values are evaluated inside an effect, so every cell they read
/// becomes a dependency of the binding that uses them.
pub enum Value<T> {
    Static(T),
    Dynamic(Rc<dyn Fn() -> T>),
}

impl<T: 'static> Value<T> {
    /// A value recomputed by `f`.
    pub fn dynamic(f: impl Fn() -> T + 'static) -> Self {
        Self::Dynamic(Rc::new(f))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }

    /// Resolve the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        match self {
            Self::Static(value) => value.clone(),
            Self::Dynamic(f) => f(),
        }
    }

    /// Map the resolved value, keeping it reactive if it was.
    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Value<U>
    where
        T: Clone,
    {
        match self {
            Self::Static(value) => Value::Static(f(value)),
            Self::Dynamic(g) => Value::Dynamic(Rc::new(move || f(g()))),
        }
    }
}

impl<T: Clone> Clone for Value<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(value) => Self::Static(value.clone()),
            Self::Dynamic(f) => Self::Dynamic(Rc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}

impl From<String> for Value<String> {
    fn from(value: String) -> Self {
        Self::Static(value)
    }
}

impl From<&str> for Value<String> {
    fn from(value: &str) -> Self {
        Self::Static(value.to_owned())
    }
}

impl From<bool> for Value<bool> {
    fn from(value: bool) -> Self {
        Self::Static(value)
    }
}

impl From<Style> for Value<Style> {
    fn from(value: Style) -> Self {
        Self::Static(value)
    }
}

impl<T> From<Vec<T>> for Value<Vec<T>> {
    fn from(value: Vec<T>) -> Self {
        Self::Static(value)
    }
}

impl<T: Clone + 'static> From<ReadSignal<T>> for Value<T> {
    fn from(signal: ReadSignal<T>) -> Self {
        Self::Dynamic(Rc::new(move || signal.get()))
    }
}

impl<T: Clone + 'static> From<Memo<T>> for Value<T> {
    fn from(memo: Memo<T>) -> Self {
        Self::Dynamic(Rc::new(move || memo.get()))
    }
}
