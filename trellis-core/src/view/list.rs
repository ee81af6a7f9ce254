//! Keyed List Reconciliation
//!
//! [`Runtime::list`] keeps the children of a container in sync with a
//! reactive sequence. Every item is identified by a key; a node rendered for
//! a key is reused for as long as the key stays in the sequence.
//!
//! # Algorithm
//!
//! Each run of the list's effect:
//!
//! 1. resolves the source and computes the new key sequence,
//! 2. removes the rows whose key is gone,
//! 3. renders a row for every new key,
//! 4. walks the key sequence once, left to right, and moves a node only if
//!    it is not already directly after its predecessor.
//!
//! Step 4 is a positional correction, not a minimal-move diff: a reversal
//! moves every node but one.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use tracing::{trace, warn};

use super::child::IntoNode;
use super::value::Value;
use crate::dom::NodeId;
use crate::error::{Error, Result};
use crate::reactive::{Runtime, Scope};

struct Row {
    node: NodeId,
    scope: Scope,
    /// Whether the render function created the node, so it can be released.
    owned: bool,
}

impl Runtime {
    /// Render `source` into `container`, one child per key.
    ///
    /// `render` runs untracked, inside a scope owned by its row; the row's
    /// scope is disposed when its key leaves the sequence. Keys must be
    /// unique: for a duplicated key only the first item is rendered.
    ///
    /// The returned scope owns the list. Disposing it stops reconciliation
    /// and disposes every row scope.
    ///
    /// ```rust
    /// use trellis_core::Runtime;
    ///
    /// let rt = Runtime::new();
    /// let doc = rt.document();
    /// let ul = doc.create_element("ul");
    /// let (items, set_items) = rt.signal(vec!["a", "b"]);
    ///
    /// // The row renderer lives as long as the list, so it holds a weak handle
    /// let runtime = rt.downgrade();
    /// rt.list(ul, items, |item| *item, move |item, _| {
    ///     Ok::<_, trellis_core::Error>(runtime.try_upgrade()?.el("li").child(*item).build())
    /// });
    ///
    /// set_items.set(vec!["b", "c"]);
    /// assert_eq!(doc.text_content(ul), "bc");
    /// ```
    pub fn list<T, K, KF, RF, R>(
        &self,
        container: NodeId,
        source: impl Into<Value<Vec<T>>>,
        key_fn: KF,
        render: RF,
    ) -> Scope
    where
        T: Clone + 'static,
        K: Hash + Eq + Clone + fmt::Display + 'static,
        KF: Fn(&T) -> K + 'static,
        RF: Fn(&T, usize) -> R + 'static,
        R: IntoNode,
    {
        let owner = self.scope();
        let source = source.into();
        let key_attribute = self.config().key_attribute.clone();
        let runtime = self.downgrade();
        let rows_owner = owner.clone();
        let mut rows: IndexMap<K, Row> = IndexMap::new();

        owner.run(|| {
            self.effect(move || -> Result<()> {
                let Some(runtime) = runtime.upgrade() else {
                    return Ok(());
                };
                let document = runtime.document();
                let items = source.get();

                let mut order: IndexMap<K, usize> = IndexMap::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let key = key_fn(item);
                    if order.contains_key(&key) {
                        warn!(%key, index, "duplicate list key, keeping the first item");
                        continue;
                    }
                    order.insert(key, index);
                }

                let before = rows.len();
                rows.retain(|key, row| {
                    if order.contains_key(key) {
                        return true;
                    }
                    row.scope.dispose();
                    if row.owned {
                        document.release(row.node);
                    } else {
                        let _ = document.remove(row.node);
                    }
                    false
                });
                let removed = before - rows.len();

                let mut created = 0;
                for (key, &index) in &order {
                    if rows.contains_key(key) {
                        continue;
                    }
                    let item = &items[index];
                    let scope = rows_owner.child();
                    let mark = document.mark();
                    let mut node = scope
                        .run(|| runtime.untrack(|| render(item, index).into_node()))
                        .unwrap_or_else(|error| runtime.error_node(&error, None));
                    if let Err(error) = document.set_attribute(node, &key_attribute, key.to_string()) {
                        node = error_row(&runtime, &error, &key_attribute, key);
                    }

                    let owned = document.created_after(node, mark);
                    rows.insert(key.clone(), Row { node, scope, owned });
                    created += 1;
                }

                // A row that cannot be placed is swapped for an error node so
                // the pass still leaves the children in key order.
                let mut moved = 0;
                let mut previous: Option<NodeId> = None;
                for key in order.keys() {
                    let Some(row) = rows.get_mut(key) else {
                        continue;
                    };
                    let expected = match previous {
                        Some(previous) => document.next_sibling(previous),
                        None => document.first_child(container),
                    };
                    if expected != Some(row.node) {
                        if let Err(error) = document.insert_before(container, row.node, expected) {
                            if row.owned {
                                document.release(row.node);
                            }
                            row.node = error_row(&runtime, &error, &key_attribute, key);
                            row.owned = true;
                            document.insert_before(container, row.node, expected)?;
                        }
                        moved += 1;
                    }
                    previous = Some(row.node);
                }

                trace!(rows = rows.len(), created, removed, moved, "list reconciled");
                Ok(())
            })
        });

        owner
    }
}

/// Report `error` and build the node standing in for a row that failed.
fn error_row<K: fmt::Display>(runtime: &Runtime, error: &Error, key_attribute: &str, key: &K) -> NodeId {
    let node = runtime.error_node(error, None);
    let _ = runtime.document().set_attribute(node, key_attribute, key.to_string());
    node
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
