//! Conditional rendering.
//!
//! These helpers only select which producer runs. Used as a reactive child,
//! the region that hosts them tracks the condition, so the selected branch
//! is re-evaluated whenever the condition changes.

use std::hash::Hash;

use indexmap::IndexMap;

use super::child::{Content, Producer};
use super::value::Value;

/// Produce `then` while `condition` holds, `otherwise` (if any) when not.
pub fn when(condition: impl Into<Value<bool>>, then: Producer, otherwise: Option<Producer>) -> Producer {
    let condition = condition.into();
    Producer::new(move || {
        if condition.get() {
            then.call()
        } else {
            otherwise.as_ref().map_or(Ok(Content::Empty), Producer::call)
        }
    })
}

/// Produce `content` while `condition` holds, nothing otherwise.
pub fn show(condition: impl Into<Value<bool>>, content: impl Into<Producer>) -> Producer {
    when(condition, content.into(), None)
}

/// Branches of a [`switch`], keyed by value.
pub struct Cases<V> {
    cases: IndexMap<V, Producer>,
    default: Option<Producer>,
}

impl<V: Hash + Eq> Cases<V> {
    pub fn new() -> Self {
        Self {
            cases: IndexMap::new(),
            default: None,
        }
    }

    /// Add a branch. A later branch for the same value replaces the earlier.
    pub fn case(mut self, value: V, content: impl Into<Producer>) -> Self {
        self.cases.insert(value, content.into());
        self
    }

    /// Branch used when no case matches.
    pub fn default_case(mut self, content: impl Into<Producer>) -> Self {
        self.default = Some(content.into());
        self
    }

    fn select(&self, value: &V) -> Option<&Producer> {
        self.cases.get(value).or(self.default.as_ref())
    }
}

impl<V: Hash + Eq> Default for Cases<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Produce the branch matching `value`, falling back to the default case,
/// or nothing.
pub fn switch<V>(value: impl Into<Value<V>>, cases: Cases<V>) -> Producer
where
    V: Hash + Eq + Clone + 'static,
{
    let value = value.into();
    Producer::new(move || {
        let current = value.get();
        cases
            .select(&current)
            .map_or(Ok(Content::Empty), Producer::call)
    })
}
