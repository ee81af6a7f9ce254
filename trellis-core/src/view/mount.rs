//! Mounting an application into the document.
//!
//! Each mount renders the application inside its own [`Scope`], remembered
//! per target node. Unmounting (or mounting again over the same target)
//! disposes that scope, so every effect the application created stops and
//! every [`Runtime::on_unmount`] callback runs.
//!
//! [`Scope`]: crate::Scope

use tracing::debug;

use super::child::IntoNode;
use crate::dom::NodeId;
use crate::error::Result;
use crate::reactive::Runtime;

impl Runtime {
    /// Replace the children of `target` with the node built by `app`.
    ///
    /// An application already mounted on `target` is unmounted first.
    /// Callbacks queued with [`Runtime::on_mount`] run once the node is in
    /// place, and the queue is emptied. A failing `app` mounts the error
    /// node instead.
    pub fn mount<R: IntoNode>(&self, target: NodeId, app: impl FnOnce() -> R) -> Result<NodeId> {
        self.unmount(target)?;
        let document = self.document();
        for child in document.clear_children(target)? {
            document.release(child);
        }

        let scope = self.scope();
        let node = scope
            .run(|| app().into_node())
            .unwrap_or_else(|error| self.error_node(&error, None));
        document.append_child(target, node)?;
        self.inner.mounted.borrow_mut().insert(target, scope);

        let callbacks = std::mem::take(&mut *self.inner.mount_callbacks.borrow_mut());
        debug!(%target, callbacks = callbacks.len(), "application mounted");
        for callback in callbacks {
            callback();
        }
        Ok(node)
    }

    /// Tear down the application mounted on `target` and empty it.
    ///
    /// Returns `false` when nothing is mounted there.
    pub fn unmount(&self, target: NodeId) -> Result<bool> {
        let Some(scope) = self.inner.mounted.borrow_mut().shift_remove(&target) else {
            return Ok(false);
        };
        scope.dispose();

        let document = self.document();
        for child in document.clear_children(target)? {
            document.release(child);
        }
        debug!(%target, "application unmounted");
        Ok(true)
    }

    /// Queue `f` to run after the next [`Runtime::mount`].
    pub fn on_mount(&self, f: impl FnOnce() + 'static) {
        self.inner.mount_callbacks.borrow_mut().push(Box::new(f));
    }

    /// Run `f` when the content being rendered right now goes away.
    ///
    /// `f` is tied to the current scope: it runs when the application is
    /// unmounted, or earlier if the region, row or route that rendered it is
    /// replaced. Returns `false` (and drops `f`) outside any scope.
    pub fn on_unmount(&self, f: impl FnOnce() + 'static) -> bool {
        self.on_cleanup(f)
    }

    /// Whether an application is mounted on `target`.
    pub fn is_mounted(&self, target: NodeId) -> bool {
        self.inner.mounted.borrow().contains_key(&target)
    }
}
