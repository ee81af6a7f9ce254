//! Node Construction
//!
//! [`Runtime::element`] builds an element from a tag, a list of
//! [`Attribute`]s and a list of [`Child`]ren, wiring every dynamic value to
//! the node through an effect.
//!
//! # Reactive Regions
//!
//! A [`Child::Reactive`] producer is anchored by a comment placeholder that
//! is inserted once. The region's effect then, on every run:
//!
//! 1. produces the new content inside a fresh [`Scope`](crate::Scope),
//! 2. removes the nodes inserted by the previous run,
//! 3. inserts the new nodes right after the placeholder.
//!
//! The scope of a run is disposed before the next run starts, so effects
//! created while producing content stop when that content is replaced.
//! Nodes the region created itself are released when they are removed;
//! nodes that existed before the run are only detached.

use std::rc::Rc;

use tracing::trace;

use super::attribute::{Attribute, NodeRef};
use super::child::{Child, Content, Producer};
use super::value::Value;
use crate::dom::{Document, Event, NodeId, Style};
use crate::error::Result;
use crate::reactive::{Cleanup, ReadSignal, Runtime, WriteSignal};

impl Runtime {
    /// Build an element.
    ///
    /// Construction failures (such as appending a released node) are
    /// reported and yield the inline error node instead.
    ///
    /// ```rust
    /// use trellis_core::{Attribute, Child, Runtime};
    ///
    /// let rt = Runtime::new();
    /// let node = rt.element("p", [Attribute::class("note")], [Child::from("hello")]);
    ///
    /// assert_eq!(rt.document().to_html(node).unwrap(), r#"<p class="note">hello</p>"#);
    /// ```
    pub fn element(
        &self,
        tag: &str,
        attributes: impl IntoIterator<Item = Attribute>,
        children: impl IntoIterator<Item = Child>,
    ) -> NodeId {
        match self.try_element(tag, attributes, children) {
            Ok(node) => node,
            Err(error) => self.error_node(&error, None),
        }
    }

    /// Like [`Runtime::element`], but returns construction failures.
    pub fn try_element(
        &self,
        tag: &str,
        attributes: impl IntoIterator<Item = Attribute>,
        children: impl IntoIterator<Item = Child>,
    ) -> Result<NodeId> {
        let node = self.document().create_element(tag);
        for attribute in attributes {
            self.apply_attribute(node, attribute)?;
        }
        self.append_children(node, children)?;
        Ok(node)
    }

    /// Start an [`Element`] builder.
    pub fn el(&self, tag: &str) -> Element {
        Element {
            runtime: self.clone(),
            tag: tag.to_owned(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// A detached text node.
    pub fn text(&self, text: impl Into<String>) -> NodeId {
        self.document().create_text(text)
    }

    /// Apply one attribute to an existing node.
    pub fn apply_attribute(&self, node: NodeId, attribute: Attribute) -> Result<()> {
        let document = self.document();
        match attribute {
            Attribute::Ref(node_ref) => bind_ref(&document, node, &node_ref),
            Attribute::Class(value) => self.bind_value(node, value, |document, node, class| {
                document.set_attribute(node, "class", class)
            }),
            Attribute::Style(value) => self.bind_value(node, value, |document, node, style| {
                document.set_styles(node, &style)
            }),
            Attribute::On(event, listener) => document.add_event_listener(node, &event, listener),
            Attribute::Html(value) => self.bind_value(node, value, |document, node, html| {
                document.set_inner_html(node, html)
            }),
            Attribute::Show(value) => self.bind_value(node, value, |document, node, visible| {
                document.set_style(node, "display", if visible { "" } else { "none" })
            }),
            Attribute::Bind(value, set_value) => self.bind_input(node, value, set_value),
            Attribute::Generic(name, value) => self.bind_value(node, value, move |document, node, text| {
                document.set_attribute(node, &name, text)
            }),
        }
    }

    /// Append children to `parent`, flattening nested lists.
    pub fn append_children(&self, parent: NodeId, children: impl IntoIterator<Item = Child>) -> Result<()> {
        let document = self.document();
        for child in children {
            match child {
                Child::Empty => {}
                Child::Node(node) => document.append_child(parent, node)?,
                Child::Text(text) => document.append_child(parent, document.create_text(text))?,
                Child::Many(children) => self.append_children(parent, children)?,
                Child::Reactive(producer) => {
                    self.region(parent, producer)?;
                }
            }
        }
        Ok(())
    }

    /// Assign `value` once, or through an effect if it is dynamic.
    fn bind_value<T, F>(&self, node: NodeId, value: Value<T>, assign: F) -> Result<()>
    where
        T: Clone + 'static,
        F: Fn(&Document, NodeId, T) -> Result<()> + 'static,
    {
        match value {
            Value::Static(value) => assign(&self.document(), node, value),
            Value::Dynamic(f) => {
                self.node_effect(node, move |document| assign(document, node, f()));
                Ok(())
            }
        }
    }

    fn bind_input(&self, node: NodeId, value: ReadSignal<String>, set_value: WriteSignal<String>) -> Result<()> {
        let document = self.document();
        document.set_value(node, value.peek())?;

        self.node_effect(node, move |document| {
            let next = value.get();
            if document.value(node)? != next {
                document.set_value(node, next)?;
            }
            Ok(())
        });

        document.add_event_listener(
            node,
            "input",
            Rc::new(move |event: &Event| {
                if let Some(value) = &event.value {
                    set_value.set(value.clone());
                }
            }),
        )
    }

    /// An effect that updates `node`, and disposes itself once the node
    /// has been released.
    fn node_effect<F>(&self, node: NodeId, update: F)
    where
        F: Fn(&Document) -> Result<()> + 'static,
    {
        let runtime = self.downgrade();
        self.effect(move || {
            let Some(runtime) = runtime.upgrade() else {
                return Ok(());
            };
            let document = runtime.document();
            if !document.contains(node) {
                runtime.dispose_active_effect();
                return Ok(());
            }
            update(&document)
        });
    }

    pub(crate) fn dispose_active_effect(&self) {
        if let Some(effect) = self.active_effect() {
            self.dispose_effect(effect);
        }
    }

    /// Insert a reactive region at the end of `parent`. Returns its
    /// placeholder.
    pub fn region(&self, parent: NodeId, producer: Producer) -> Result<NodeId> {
        let document = self.document();
        let placeholder = document.create_comment(self.config().placeholder_text.clone());
        document.append_child(parent, placeholder)?;

        let runtime = self.downgrade();
        let mut current: Vec<(NodeId, bool)> = Vec::new();
        self.effect(move || {
            let runtime = runtime.upgrade()?;
            let document = runtime.document();
            if !document.contains(placeholder) {
                runtime.dispose_active_effect();
                return None;
            }

            let scope = runtime.scope();
            let mark = document.mark();
            let nodes = match scope.run(|| producer.call()) {
                Ok(content) => runtime.materialize(content),
                Err(error) => vec![runtime.error_node(&error, None)],
            };

            for (node, owned) in current.drain(..) {
                if nodes.contains(&node) {
                    let _ = document.remove(node);
                } else if owned {
                    document.release(node);
                } else {
                    let _ = document.remove(node);
                }
            }

            if let Some(parent) = document.parent(placeholder) {
                let reference = document.next_sibling(placeholder);
                for node in &nodes {
                    if let Err(error) = document.insert_before(parent, *node, reference) {
                        runtime.report_error(&error, None);
                    }
                }
            }
            trace!(%placeholder, nodes = nodes.len(), "region updated");

            current = nodes
                .into_iter()
                .map(|node| (node, document.created_after(node, mark)))
                .collect();
            Some(Cleanup::new(move || scope.dispose()))
        });

        Ok(placeholder)
    }

    /// Turn content into nodes, creating text nodes as needed.
    pub(crate) fn materialize(&self, content: Content) -> Vec<NodeId> {
        fn walk(document: &Document, content: Content, out: &mut Vec<NodeId>) {
            match content {
                Content::Empty => {}
                Content::Node(node) => out.push(node),
                Content::Text(text) => out.push(document.create_text(text)),
                Content::Many(items) => {
                    for item in items {
                        walk(document, item, out);
                    }
                }
            }
        }

        let mut nodes = Vec::new();
        walk(&self.document(), content, &mut nodes);
        nodes
    }
}

fn bind_ref(document: &Document, node: NodeId, node_ref: &NodeRef) -> Result<()> {
    document.kind(node)?;
    node_ref.set(node);
    Ok(())
}

/// Builder for [`Runtime::element`].
///
/// ```rust
/// use trellis_core::Runtime;
///
/// let rt = Runtime::new();
/// let (name, _) = rt.signal("Ada".to_string());
/// let node = rt.el("h1").class("title").child("Hi ").child(name).build();
///
/// assert_eq!(rt.document().text_content(node), "Hi Ada");
/// ```
#[must_use = "an element is only created by `build`"]
pub struct Element {
    runtime: Runtime,
    tag: String,
    attributes: Vec<Attribute>,
    children: Vec<Child>,
}

impl Element {
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attr(self, name: impl Into<String>, value: impl Into<Value<String>>) -> Self {
        self.attribute(Attribute::generic(name, value))
    }

    pub fn class(self, value: impl Into<Value<String>>) -> Self {
        self.attribute(Attribute::class(value))
    }

    pub fn style(self, value: impl Into<Value<Style>>) -> Self {
        self.attribute(Attribute::style(value))
    }

    pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.attribute(Attribute::on(event, handler))
    }

    pub fn html(self, value: impl Into<Value<String>>) -> Self {
        self.attribute(Attribute::html(value))
    }

    pub fn show(self, value: impl Into<Value<bool>>) -> Self {
        self.attribute(Attribute::show(value))
    }

    pub fn bind(self, signal: (ReadSignal<String>, WriteSignal<String>)) -> Self {
        self.attribute(Attribute::bind(signal))
    }

    pub fn node_ref(self, node_ref: &NodeRef) -> Self {
        self.attribute(Attribute::Ref(node_ref.clone()))
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<C: Into<Child>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Create the element.
    pub fn build(self) -> NodeId {
        self.runtime.element(&self.tag, self.attributes, self.children)
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
    fn static_attributes_are_assigned_once() {
        let rt = Runtime::new();
        let node = rt
            .el("a")
            .attr("href", "#/home")
            .class("link")
            .style(Style::new().with("color", "red"))
            .child("home")
            .build();

        assert_eq!(
            rt.document().to_html(node).unwrap(),
            r##"<a href="#/home" class="link" style="color: red;">home</a>"##
        );
        assert_eq!(rt.effect_count(), 0);
    }

    #[test]
    fn dynamic_class_follows_signal() {
        let rt = Runtime::new();
        let (active, set_active) = rt.signal(false);
        let node = rt
            .el("li")
            .class(Value::dynamic(move || {
                let class = if active.get() { "active" } else { "" };
                class.to_string()
            }))
            .build();
        let doc = rt.document();

        assert_eq!(doc.attribute(node, "class").as_deref(), Some(""));
        set_active.set(true);
        assert_eq!(doc.attribute(node, "class").as_deref(), Some("active"));
    }

    #[test]
    fn show_toggles_display() {
        let rt = Runtime::new();
        let (visible, set_visible) = rt.signal(true);
        let node = rt.el("div").show(visible).build();
        let doc = rt.document();

        assert_eq!(doc.style(node, "display"), None);
        set_visible.set(false);
        assert_eq!(doc.style(node, "display").as_deref(), Some("none"));
        set_visible.set(true);
        assert_eq!(doc.style(node, "display"), None);
    }

    #[test]
    fn html_is_assigned_unescaped() {
        let rt = Runtime::new();
        let node = rt.el("div").html("<em>hi</em>").build();
        assert_eq!(rt.document().to_html(node).unwrap(), "<div><em>hi</em></div>");
    }

    #[test]
    fn listeners_receive_events() {
        let rt = Runtime::new();
        let clicks = Rc::new(Cell::new(0));
        let counter = clicks.clone();
        let node = rt
            .el("button")
            .on("Click", move |_| counter.set(counter.get() + 1))
            .build();

        rt.document().click(node).unwrap();
        rt.document().click(node).unwrap();
        assert_eq!(clicks.get(), 2);
    }

    #[test]
    fn bind_is_two_way() {
        let rt = Runtime::new();
        let (text, set_text) = rt.signal("a".to_string());
        let node = rt.el("input").bind((text.clone(), set_text.clone())).build();
        let doc = rt.document();

        assert_eq!(doc.value(node).unwrap(), "a");

        set_text.set("b".into());
        assert_eq!(doc.value(node).unwrap(), "b");

        doc.input(node, "typed").unwrap();
        assert_eq!(text.peek(), "typed");
    }

    #[test]
    fn node_ref_receives_the_element() {
        let rt = Runtime::new();
        let node_ref = NodeRef::new();
        let node = rt.el("canvas").node_ref(&node_ref).build();
        assert_eq!(node_ref.get(), Some(node));
    }

    #[test]
    fn nested_children_are_flattened() {
        let rt = Runtime::new();
        let node = rt.element(
            "ul",
            [],
            [Child::Many(vec![
                Child::from(rt.el("li").child("a")),
                Child::Empty,
                Child::Many(vec![Child::from(rt.el("li").child("b"))]),
            ])],
        );
        assert_eq!(
            rt.document().to_html(node).unwrap(),
            "<ul><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn appending_a_stale_node_yields_the_error_node() {
        let rt = Runtime::new();
        let doc = rt.document();
        let stale = doc.create_element("span");
        doc.release(stale);

        let node = rt.element("div", [], [Child::Node(stale)]);
        assert_eq!(
            doc.attribute(node, "class").as_deref(),
            Some(rt.config().error_class.as_str())
        );
    }

    #[test]
    fn region_replaces_its_content() {
        let rt = Runtime::new();
        let (count, set_count) = rt.signal(1);
        let node = rt
            .el("div")
            .child("before")
            .child(Producer::new(move || {
                (0..count.get()).map(|i| format!("[{i}]")).collect::<Vec<_>>()
            }))
            .child("after")
            .build();
        let doc = rt.document();

        assert_eq!(doc.inner_html(node).unwrap(), "before<!--reactive-->[0]after");

        set_count.set(3);
        assert_eq!(doc.inner_html(node).unwrap(), "before<!--reactive-->[0][1][2]after");

        set_count.set(0);
        assert_eq!(doc.inner_html(node).unwrap(), "before<!--reactive-->after");
    }

    #[test]
    fn region_releases_only_nodes_it_created() {
        let rt = Runtime::new();
        let doc = rt.document();
        let shared = doc.create_element("hr");
        let (use_shared, set_use_shared) = rt.signal(true);

        let runtime = rt.clone();
        let node = rt
            .el("div")
            .child(Producer::new(move || {
                if use_shared.get() {
                    shared
                } else {
                    runtime.text("own")
                }
            }))
            .build();

        set_use_shared.set(false);
        assert!(doc.contains(shared));
        assert_eq!(doc.parent(shared), None);

        let own = doc.children(node)[1];
        set_use_shared.set(true);
        assert!(!doc.contains(own));
        assert_eq!(doc.parent(shared), Some(node));
    }

    #[test]
    fn region_disposes_effects_of_replaced_content() {
        let rt = Runtime::new();
        let (page, set_page) = rt.signal(0);
        let (tick, set_tick) = rt.signal(0);
        let runs = Rc::new(Cell::new(0));

        let runtime = rt.clone();
        let counter = runs.clone();
        let _node = rt
            .el("main")
            .child(Producer::new(move || {
                let page = page.get();
                let counter = counter.clone();
                let tick = tick.clone();
                runtime.effect(move || {
                    tick.get();
                    counter.set(counter.get() + 1);
                });
                format!("page {page}")
            }))
            .build();

        assert_eq!(runs.get(), 1);
        set_page.set(1);
        assert_eq!(runs.get(), 2);

        // Only the effect created for page 1 is still alive.
        set_tick.set(1);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn failing_producer_renders_error_node() {
        let rt = Runtime::new();
        let errors = Rc::new(Cell::new(0));
        let counter = errors.clone();
        rt.on_error(move |_, _| counter.set(counter.get() + 1));

        let node = rt
            .el("div")
            .child(Producer::new(|| Err::<String, _>("broken")))
            .build();

        assert_eq!(errors.get(), 1);
        assert_eq!(rt.document().text_content(node), "Error: broken");
    }

    #[test]
    fn released_nodes_stop_their_bindings() {
        let rt = Runtime::new();
        let (label, set_label) = rt.signal("a".to_string());
        let node = rt.el("div").attr("title", label).build();
        assert_eq!(rt.effect_count(), 1);

        rt.document().release(node);
        set_label.set("b".into());
        assert_eq!(rt.effect_count(), 0);
    }
}
