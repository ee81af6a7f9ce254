//! Failure containment and out-of-place rendering.
//!
//! Nothing in the view layer unwinds: a failing render is reported through
//! [`Runtime::report_error`] and replaced by an inline error node, or by the
//! fallback of the nearest [`Runtime::error_boundary`].

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::child::{Child, IntoNode};
use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::reactive::{Runtime, Scope};

impl Runtime {
    /// Report `error` and build the inline node that replaces failed content.
    ///
    /// The node reads `Error in <name>: message` for component failures and
    /// `Error: message` otherwise.
    pub fn error_node(&self, error: &Error, component: Option<&str>) -> NodeId {
        self.report_error(error, component);

        let text = match (error, component) {
            (Error::Component { name, source }, _) => format!("Error in <{name}>: {source}"),
            (_, Some(name)) => format!("Error in <{name}>: {error}"),
            (_, None) => format!("Error: {error}"),
        };
        self.document()
            .create_message("div", &self.config().error_class, text)
    }

    /// Wrap `render` as a named component.
    ///
    /// Every rendered element is tagged with the component's name and a
    /// unique instance id. A failing render yields the error node.
    pub fn component<P, F, R>(&self, name: &str, render: F) -> Component<P>
    where
        F: Fn(P) -> R + 'static,
        R: IntoNode,
    {
        Component {
            runtime: self.clone(),
            name: Rc::from(name),
            render: Rc::new(move |props| render(props).into_node()),
        }
    }

    /// Render `render` inside a container; on failure render
    /// `fallback(error)` there instead.
    pub fn error_boundary<R>(
        &self,
        render: impl FnOnce() -> R,
        fallback: impl FnOnce(&Error) -> NodeId,
    ) -> NodeId
    where
        R: IntoNode,
    {
        let document = self.document();
        let container = document.create_element("div");
        let _ = document.set_attribute(container, "data-error-boundary", "true");

        let content = match render().into_node() {
            Ok(node) => node,
            Err(error) => {
                debug!(%error, "error boundary caught a failure");
                fallback(&error)
            }
        };
        if let Err(error) = document.append_child(container, content) {
            let node = self.error_node(&error, None);
            let _ = document.append_child(container, node);
        }
        container
    }

    /// Render `content` into a wrapper appended to `target`, which may live
    /// anywhere in the document.
    ///
    /// Effects created for the content are owned by the portal and stop
    /// when it is removed.
    pub fn portal(&self, target: NodeId, content: impl Into<Child>) -> Result<Portal> {
        let document = self.document();
        document.kind(target)?;

        let wrapper = document.create_element("div");
        document.set_attribute(wrapper, "data-portal", "true")?;

        let scope = self.scope();
        let content = content.into();
        scope.run(|| self.append_children(wrapper, [content]))?;
        document.append_child(target, wrapper)?;

        Ok(Portal {
            document,
            wrapper,
            scope,
        })
    }
}

/// A named render function created by [`Runtime::component`].
pub struct Component<P> {
    runtime: Runtime,
    name: Rc<str>,
    render: Rc<dyn Fn(P) -> Result<NodeId>>,
}

impl<P> Component<P> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render one instance.
    pub fn render(&self, props: P) -> NodeId {
        let instance = self.runtime.next_component_id();
        let id = format!("nv-{}-{instance}", self.name);

        match (self.render)(props) {
            Ok(node) => {
                let document = self.runtime.document();
                if document.tag(node).is_some() {
                    let attribute = &self.runtime.config().component_attribute;
                    let _ = document.set_attribute(node, attribute, self.name.as_ref());
                    let _ = document.set_attribute(node, &format!("{attribute}-id"), id);
                }
                node
            }
            Err(error) => {
                let error = error.in_component(self.name.as_ref());
                self.runtime.error_node(&error, Some(&self.name))
            }
        }
    }
}

impl<P> Clone for Component<P> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            name: Rc::clone(&self.name),
            render: Rc::clone(&self.render),
        }
    }
}

impl<P> fmt::Debug for Component<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

/// Handle to content rendered by [`Runtime::portal`].
#[derive(Debug)]
pub struct Portal {
    document: Document,
    wrapper: NodeId,
    scope: Scope,
}

impl Portal {
    /// The wrapper element holding the content.
    pub fn node(&self) -> NodeId {
        self.wrapper
    }

    /// Dispose the content's effects and release the wrapper.
    pub fn remove(self) {
        self.scope.dispose();
        self.document.release(self.wrapper);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn components_tag_their_root() {
        let rt = Runtime::new();
        let card = rt.component("Card", {
            let rt = rt.clone();
            move |title: &str| rt.el("section").child(title).build()
        });

        let first = card.render("one");
        let second = card.render("two");
        let doc = rt.document();

        assert_eq!(doc.attribute(first, "data-component").as_deref(), Some("Card"));
        assert_eq!(doc.attribute(first, "data-component-id").as_deref(), Some("nv-Card-0"));
        assert_eq!(doc.attribute(second, "data-component-id").as_deref(), Some("nv-Card-1"));
    }

    #[test]
    fn failing_component_renders_error_node_and_reports() {
        let rt = Runtime::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        rt.on_error(move |error, component| {
            sink.borrow_mut()
                .push((component.map(str::to_owned), error.to_string()));
        });

        let broken = rt.component("Broken", |_: ()| Err::<NodeId, _>("no data"));
        let node = broken.render(());

        assert_eq!(rt.document().text_content(node), "Error in <Broken>: no data");
        assert_eq!(
            *seen.borrow(),
            [(Some("Broken".to_string()), "Broken: no data".to_string())]
        );
    }

    #[test]
    fn error_boundary_uses_fallback() {
        let rt = Runtime::new();
        let doc = rt.document();

        let ok = rt.error_boundary(|| doc.create_text("fine"), |_| unreachable!());
        assert_eq!(
            doc.to_html(ok).unwrap(),
            r#"<div data-error-boundary="true">fine</div>"#
        );

        let failed = rt.error_boundary(
            || Err::<NodeId, _>("boom"),
            |error| doc.create_text(format!("fallback: {error}")),
        );
        assert_eq!(doc.text_content(failed), "fallback: boom");
    }

    #[test]
    fn portal_renders_elsewhere_and_can_be_removed() {
        let rt = Runtime::new();
        let doc = rt.document();
        let body = doc.create_element("body");
        let (label, set_label) = rt.signal("hello".to_string());

        let portal = rt.portal(body, label).unwrap();
        assert_eq!(
            doc.inner_html(body).unwrap(),
            r#"<div data-portal="true"><!--reactive-->hello</div>"#
        );

        set_label.set("bye".into());
        assert_eq!(doc.text_content(body), "bye");

        let effects = rt.effect_count();
        portal.remove();
        assert!(doc.children(body).is_empty());
        assert_eq!(rt.effect_count(), effects - 1);
    }

    #[test]
    fn portal_into_stale_target_fails() {
        let rt = Runtime::new();
        let doc = rt.document();
        let target = doc.create_element("div");
        doc.release(target);

        assert!(matches!(rt.portal(target, "x"), Err(Error::StaleNode(_))));
    }
}
