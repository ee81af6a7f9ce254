//! Async Content
//!
//! [`Runtime::suspense`] shows a fallback until a future resolves, then
//! swaps in the content it produced (or the error node if it failed).
//! [`Runtime::lazy`] builds on it to load a component on first use.
//!
//! The runtime has no executor. Both return a [`Suspense`] whose task the
//! caller drives, typically with `tokio::task::spawn_local` inside a
//! `LocalSet`. The document is only mutated when the task completes.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures_util::future::{self, FutureExt, LocalBoxFuture};
use tracing::debug;

use super::child::{Child, IntoContent};
use crate::dom::NodeId;
use crate::error::{Error, Result};
use crate::reactive::Runtime;

const SPINNER_CLASS: &str = "nv-flex nv-justify-center nv-p-8";
const SPINNER_HTML: &str = r#"<div class="nv-spinner"></div>"#;

/// A placeholder node plus the task that fills it.
#[must_use = "the content is only loaded when the task is driven"]
pub struct Suspense {
    node: NodeId,
    task: LocalBoxFuture<'static, ()>,
}

impl Suspense {
    /// The container holding the fallback, and later the content.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Separate the container from the task that fills it.
    pub fn split(self) -> (NodeId, LocalBoxFuture<'static, ()>) {
        (self.node, self.task)
    }
}

impl fmt::Debug for Suspense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspense").field("node", &self.node).finish()
    }
}

/// A loaded component function.
pub type ComponentFn<P> = Rc<dyn Fn(P) -> Result<NodeId>>;

type Loader<P> = Rc<dyn Fn() -> LocalBoxFuture<'static, Result<ComponentFn<P>>>>;

/// A component loaded on first render. Created by [`Runtime::lazy`].
pub struct Lazy<P> {
    runtime: Runtime,
    loader: Loader<P>,
    loaded: Rc<RefCell<Option<ComponentFn<P>>>>,
}

impl Runtime {
    /// Render `fallback` into a container until `loader` resolves.
    ///
    /// Effects created by the fallback are disposed when it is replaced.
    pub fn suspense<Fut>(&self, loader: Fut, fallback: impl Into<Child>) -> Suspense
    where
        Fut: Future + 'static,
        Fut::Output: IntoContent,
    {
        let document = self.document();
        let container = document.create_element("div");
        let _ = document.set_attribute(container, "data-suspense", "true");

        let fallback_scope = self.scope();
        let fallback = fallback.into();
        if let Err(error) = fallback_scope.run(|| self.append_children(container, [fallback])) {
            let node = self.error_node(&error, None);
            let _ = document.append_child(container, node);
        }

        let runtime = self.downgrade();
        let task = async move {
            let outcome = loader.await.into_content();
            fallback_scope.dispose();

            let Some(runtime) = runtime.upgrade() else {
                return;
            };
            let document = runtime.document();
            let Ok(previous) = document.clear_children(container) else {
                debug!(%container, "suspense container released before loading finished");
                return;
            };
            for node in previous {
                document.release(node);
            }

            let nodes = match outcome {
                Ok(content) => runtime.materialize(content),
                Err(error) => vec![runtime.error_node(&error, None)],
            };
            for node in nodes {
                if let Err(error) = document.append_child(container, node) {
                    runtime.report_error(&error, None);
                }
            }
            debug!(%container, "suspense resolved");
        }
        .boxed_local();

        Suspense {
            node: container,
            task,
        }
    }

    /// Wrap an async component loader.
    ///
    /// The first render shows a spinner until `loader` resolves; the
    /// loaded component is cached and later renders call it directly.
    pub fn lazy<P, F, Fut>(&self, loader: F) -> Lazy<P>
    where
        P: 'static,
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<ComponentFn<P>>> + 'static,
    {
        Lazy {
            runtime: self.clone(),
            loader: Rc::new(move || loader().boxed_local()),
            loaded: Rc::new(RefCell::new(None)),
        }
    }
}

impl<P: 'static> Lazy<P> {
    pub fn is_loaded(&self) -> bool {
        self.loaded.borrow().is_some()
    }

    /// Render one instance.
    pub fn render(&self, props: P) -> Suspense {
        let loaded = self.loaded.borrow().clone();
        if let Some(component) = loaded {
            let node = component(props).unwrap_or_else(|error| self.runtime.error_node(&error, None));
            return Suspense {
                node,
                task: future::ready(()).boxed_local(),
            };
        }

        let loader = Rc::clone(&self.loader);
        let cache = Rc::clone(&self.loaded);
        let content = async move {
            let component = loader().await.map_err(|error| match error {
                Error::Loader(_) => error,
                other => Error::Loader(other.to_string()),
            })?;
            *cache.borrow_mut() = Some(Rc::clone(&component));
            component(props)
        };

        let document = self.runtime.document();
        let spinner = document.create_element("div");
        let _ = document.set_attribute(spinner, "class", SPINNER_CLASS);
        let _ = document.set_inner_html(spinner, SPINNER_HTML);

        self.runtime.suspense(content, spinner)
    }
}

impl<P> Clone for Lazy<P> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            loader: Rc::clone(&self.loader),
            loaded: Rc::clone(&self.loaded),
        }
    }
}

impl<P> fmt::Debug for Lazy<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("loaded", &self.loaded.borrow().is_some())
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
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn fallback_is_replaced_by_content() {
        let rt = Runtime::new();
        let doc = rt.document();
        let (tx, rx) = oneshot::channel::<String>();

        let (node, task) = rt
            .suspense(async move { rx.await.map_err(|e| Error::msg(e.to_string())) }, "loading")
            .split();
        assert_eq!(doc.text_content(node), "loading");

        tx.send("loaded".into()).unwrap();
        task.await;
        assert_eq!(
            doc.to_html(node).unwrap(),
            r#"<div data-suspense="true">loaded</div>"#
        );
    }

    #[tokio::test]
    async fn rejection_renders_error_node() {
        let rt = Runtime::new();
        let doc = rt.document();
        let reported = Rc::new(Cell::new(0));
        let counter = reported.clone();
        rt.on_error(move |_, _| counter.set(counter.get() + 1));

        let (node, task) = rt
            .suspense(async { Err::<String, _>("offline") }, "loading")
            .split();
        task.await;

        assert_eq!(doc.text_content(node), "Error: offline");
        assert_eq!(reported.get(), 1);
    }

    #[tokio::test]
    async fn tasks_run_on_a_local_set() {
        let rt = Runtime::new();
        let doc = rt.document();
        let (tx, rx) = oneshot::channel::<&'static str>();
        let (node, task) = rt.suspense(async move { rx.await.unwrap_or("cancelled") }, "…").split();

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async move {
                let handle = tokio::task::spawn_local(task);
                tx.send("ready").unwrap();
                handle.await.unwrap();
            })
            .await;

        assert_eq!(doc.text_content(node), "ready");
    }

    #[tokio::test]
    async fn lazy_loads_once() {
        let rt = Runtime::new();
        let doc = rt.document();
        let loads = Rc::new(Cell::new(0));

        let counter = loads.clone();
        let runtime = rt.clone();
        let greeting = rt.lazy(move || {
            counter.set(counter.get() + 1);
            let runtime = runtime.clone();
            async move {
                let component: ComponentFn<&'static str> =
                    Rc::new(move |name: &'static str| -> Result<NodeId> {
                        Ok(runtime.el("p").child(format!("hi {name}")).build())
                    });
                Ok(component)
            }
        });

        let (first, task) = greeting.render("ada").split();
        assert!(doc.inner_html(first).unwrap().contains("nv-spinner"));
        task.await;
        assert_eq!(doc.text_content(first), "hi ada");
        assert!(greeting.is_loaded());

        let (second, task) = greeting.render("grace").split();
        task.await;
        assert_eq!(doc.to_html(second).unwrap(), "<p>hi grace</p>");
        assert_eq!(loads.get(), 1);
    }

    #[tokio::test]
    async fn lazy_loader_failure_is_reported() {
        let rt = Runtime::new();
        let doc = rt.document();
        let broken = rt.lazy(|| async { Err::<ComponentFn<()>, _>(Error::msg("404")) });

        let (node, task) = broken.render(()).split();
        task.await;

        assert_eq!(doc.text_content(node), "Error: failed to load: 404");
        assert!(!broken.is_loaded());
    }
}
