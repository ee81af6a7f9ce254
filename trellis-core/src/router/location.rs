//! Hash-fragment location.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

type ChangeListener = Rc<dyn Fn(&str)>;

#[derive(Default)]
struct LocationInner {
    hash: RefCell<String>,
    listeners: RefCell<IndexMap<u64, ChangeListener>>,
    next_listener: Cell<u64>,
}

/// The hash part of the current URL, and the source of change events.
///
/// The stored hash never includes the leading `#`. Clones share state.
#[derive(Clone, Default)]
pub struct Location {
    inner: Rc<LocationInner>,
}

/// Identifies a listener registered with [`Location::on_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl Location {
    pub fn new() -> Self {
        Self::default()
    }

    /// A location whose hash is already `hash`.
    pub fn with_hash(hash: &str) -> Self {
        let location = Self::new();
        *location.inner.hash.borrow_mut() = strip(hash).to_owned();
        location
    }

    pub fn hash(&self) -> String {
        self.inner.hash.borrow().clone()
    }

    /// The routed path: the hash with a leading `/`, so `#about` and
    /// `#/about` route alike and an empty hash is `/`.
    pub fn path(&self) -> String {
        let hash = self.inner.hash.borrow();
        if hash.starts_with('/') {
            hash.clone()
        } else {
            format!("/{hash}")
        }
    }

    /// Change the hash and notify listeners with the new path.
    ///
    /// Setting the current hash again is not a change.
    pub fn set_hash(&self, hash: &str) {
        let hash = strip(hash);
        {
            let mut current = self.inner.hash.borrow_mut();
            if *current == hash {
                return;
            }
            *current = hash.to_owned();
        }
        debug!(hash, "location changed");

        let path = self.path();
        let listeners: Vec<ChangeListener> = self.inner.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(&path);
        }
    }

    /// Register a hash-change listener. It receives the new path.
    pub fn on_change(&self, listener: impl Fn(&str) + 'static) -> ListenerId {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner.listeners.borrow_mut().insert(id, Rc::new(listener));
        ListenerId(id)
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.inner.listeners.borrow_mut().shift_remove(&id.0);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

fn strip(hash: &str) -> &str {
    hash.strip_prefix('#').unwrap_or(hash)
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Location")
            .field("hash", &*self.inner.hash.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
