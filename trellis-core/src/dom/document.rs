//! The node arena.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::event::{Event, Listener};
use super::node::{NodeData, NodeId, NodeKind, Style};
use crate::error::{Error, Result};

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &["area", "br", "col", "hr", "img", "input", "link", "meta"];

struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

#[derive(Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    next_serial: u64,
    live: usize,
}

impl Arena {
    fn get(&self, id: NodeId) -> Result<&NodeData> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
            .ok_or(Error::StaleNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_mut())
            .ok_or(Error::StaleNode(id))
    }

    fn allocate(&mut self, kind: NodeKind) -> NodeId {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.live += 1;

        let data = Some(NodeData::new(kind, serial));
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.data = data;
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    data,
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    fn detach(&mut self, node: NodeId) -> Result<()> {
        let Some(parent) = self.get_mut(node)?.parent.take() else {
            return Ok(());
        };
        if let Ok(parent) = self.get_mut(parent) {
            parent.children.retain(|child| *child != node);
        }
        Ok(())
    }

    /// Free `node` and its whole subtree.
    fn free(&mut self, node: NodeId) {
        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            let slot = &mut self.slots[id.index as usize];
            if slot.generation != id.generation {
                continue;
            }
            if let Some(data) = slot.data.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                self.live -= 1;
                pending.extend(data.children);
            }
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.get(node).ok().and_then(|data| data.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn write_html(&self, id: NodeId, out: &mut String) -> Result<()> {
        let data = self.get(id)?;
        match &data.kind {
            NodeKind::Text(text) => {
                html_escape::encode_text_to_string(text, out);
            }
            NodeKind::Raw(html) => out.push_str(html),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &data.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    html_escape::encode_double_quoted_attribute_to_string(value, out);
                    out.push('"');
                }
                if !data.style.is_empty() {
                    out.push_str(" style=\"");
                    html_escape::encode_double_quoted_attribute_to_string(data.style.to_string(), out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return Ok(());
                }
                for child in &data.children {
                    self.write_html(*child, out)?;
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
        Ok(())
    }

    fn write_text(&self, id: NodeId, out: &mut String) {
        let Ok(data) = self.get(id) else {
            return;
        };
        match &data.kind {
            NodeKind::Text(text) | NodeKind::Raw(text) => out.push_str(text),
            NodeKind::Comment(_) => {}
            NodeKind::Element(_) => {
                for child in &data.children {
                    self.write_text(*child, out);
                }
            }
        }
    }
}

/// An in-memory tree of renderable nodes.
///
/// `Document` is a shared handle: clones refer to the same arena. Nodes form
/// a strict tree. Every mutation that would give a node a second parent, or
/// make a node its own ancestor, is rejected with [`Error::Hierarchy`], and
/// every access through a released handle fails with [`Error::StaleNode`].
///
/// Listeners are never invoked while the arena is borrowed, so they may
/// freely mutate the document.
#[derive(Clone, Default)]
pub struct Document {
    arena: Rc<RefCell<Arena>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.arena.borrow().live
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.borrow().get(id).is_ok()
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    pub fn create_element(&self, tag: impl Into<String>) -> NodeId {
        self.arena.borrow_mut().allocate(NodeKind::Element(tag.into()))
    }

    pub fn create_text(&self, text: impl Into<String>) -> NodeId {
        self.arena.borrow_mut().allocate(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&self, text: impl Into<String>) -> NodeId {
        self.arena.borrow_mut().allocate(NodeKind::Comment(text.into()))
    }

    /// An element with a class and a single text child, used for inline
    /// error and not-found messages.
    pub fn create_message(&self, tag: &str, class: &str, text: impl Into<String>) -> NodeId {
        let mut arena = self.arena.borrow_mut();
        let element = arena.allocate(NodeKind::Element(tag.to_owned()));
        let text = arena.allocate(NodeKind::Text(text.into()));

        if let Ok(data) = arena.get_mut(text) {
            data.parent = Some(element);
        }
        if let Ok(data) = arena.get_mut(element) {
            if !class.is_empty() {
                data.attributes.insert("class".to_owned(), class.to_owned());
            }
            data.children.push(text);
        }
        element
    }

    /// Serial number the next created node will get.
    ///
    /// Paired with [`Document::created_after`] to find out whether a node
    /// was created after some point in time.
    pub fn mark(&self) -> u64 {
        self.arena.borrow().next_serial
    }

    /// Whether `id` is live and was created at or after `mark`.
    pub fn created_after(&self, id: NodeId, mark: u64) -> bool {
        self.arena
            .borrow()
            .get(id)
            .is_ok_and(|data| data.serial >= mark)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        Ok(self.arena.borrow().get(id)?.kind.clone())
    }

    pub fn tag(&self, id: NodeId) -> Option<String> {
        let arena = self.arena.borrow();
        arena.get(id).ok()?.kind.tag().map(str::to_owned)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.borrow().get(id).ok()?.parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.arena
            .borrow()
            .get(id)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena.borrow().get(id).ok()?.children.first().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let arena = self.arena.borrow();
        let parent = arena.get(id).ok()?.parent?;
        let siblings = &arena.get(parent).ok()?.children;
        let position = siblings.iter().position(|sibling| *sibling == id)?;
        siblings.get(position + 1).copied()
    }

    // ------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Move `node` into `parent`, right before `reference` (or at the end).
    ///
    /// A node that already has a parent is detached from it first.
    pub fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>) -> Result<()> {
        let mut arena = self.arena.borrow_mut();

        if !arena.get(parent)?.kind.accepts_children() {
            return Err(Error::Hierarchy(format!("node {parent} cannot have children")));
        }
        arena.get(node)?;
        if arena.is_ancestor(node, parent) {
            return Err(Error::Hierarchy(format!(
                "node {node} cannot be inserted into its own subtree"
            )));
        }
        if let Some(reference) = reference {
            if arena.get(reference)?.parent != Some(parent) {
                return Err(Error::Hierarchy(format!(
                    "node {reference} is not a child of {parent}"
                )));
            }
            if reference == node {
                return Ok(());
            }
        }

        arena.detach(node)?;
        let data = arena.get_mut(parent)?;
        let position = reference
            .and_then(|reference| data.children.iter().position(|child| *child == reference))
            .unwrap_or(data.children.len());
        data.children.insert(position, node);
        arena.get_mut(node)?.parent = Some(parent);
        Ok(())
    }

    /// Detach `node` from its parent. The node stays alive.
    pub fn remove(&self, node: NodeId) -> Result<()> {
        self.arena.borrow_mut().detach(node)
    }

    /// Detach `node` and free it with its whole subtree.
    ///
    /// Returns `false` if the handle was already stale.
    pub fn release(&self, node: NodeId) -> bool {
        let mut arena = self.arena.borrow_mut();
        if arena.detach(node).is_err() {
            return false;
        }
        arena.free(node);
        true
    }

    /// Detach every child of `parent` and return them in order.
    pub fn clear_children(&self, parent: NodeId) -> Result<Vec<NodeId>> {
        let mut arena = self.arena.borrow_mut();
        let children = std::mem::take(&mut arena.get_mut(parent)?.children);
        for child in &children {
            if let Ok(data) = arena.get_mut(*child) {
                data.parent = None;
            }
        }
        Ok(children)
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    pub fn set_attribute(&self, id: NodeId, name: &str, value: impl Into<String>) -> Result<()> {
        let mut arena = self.arena.borrow_mut();
        arena
            .get_mut(id)?
            .attributes
            .insert(name.to_owned(), value.into());
        Ok(())
    }

    pub fn remove_attribute(&self, id: NodeId, name: &str) -> Result<()> {
        self.arena.borrow_mut().get_mut(id)?.attributes.shift_remove(name);
        Ok(())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.arena.borrow().get(id).ok()?.attributes.get(name).cloned()
    }

    /// Set one inline style property. An empty value removes it.
    pub fn set_style(&self, id: NodeId, property: &str, value: &str) -> Result<()> {
        self.arena.borrow_mut().get_mut(id)?.style.set(property, value);
        Ok(())
    }

    /// Merge `style` into the node's inline style.
    pub fn set_styles(&self, id: NodeId, style: &Style) -> Result<()> {
        self.arena.borrow_mut().get_mut(id)?.style.merge(style);
        Ok(())
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<String> {
        let arena = self.arena.borrow();
        arena.get(id).ok()?.style.get(property).map(str::to_owned)
    }

    /// Replace the children of `id` with unescaped markup.
    pub fn set_inner_html(&self, id: NodeId, html: impl Into<String>) -> Result<()> {
        let mut arena = self.arena.borrow_mut();
        let children = std::mem::take(&mut arena.get_mut(id)?.children);
        for child in children {
            arena.free(child);
        }

        let raw = arena.allocate(NodeKind::Raw(html.into()));
        arena.get_mut(raw)?.parent = Some(id);
        arena.get_mut(id)?.children.push(raw);
        Ok(())
    }

    /// Replace the text of a text node.
    pub fn set_text(&self, id: NodeId, text: impl Into<String>) -> Result<()> {
        let mut arena = self.arena.borrow_mut();
        match &mut arena.get_mut(id)?.kind {
            NodeKind::Text(current) => {
                *current = text.into();
                Ok(())
            }
            _ => Err(Error::Hierarchy(format!("node {id} is not a text node"))),
        }
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.arena.borrow().write_text(id, &mut out);
        out
    }

    /// Current form value.
    pub fn value(&self, id: NodeId) -> Result<String> {
        Ok(self.arena.borrow().get(id)?.value.clone())
    }

    pub fn set_value(&self, id: NodeId, value: impl Into<String>) -> Result<()> {
        self.arena.borrow_mut().get_mut(id)?.value = value.into();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(&self, id: NodeId, name: &str, listener: Listener) -> Result<()> {
        let mut arena = self.arena.borrow_mut();
        arena
            .get_mut(id)?
            .listeners
            .push((name.to_ascii_lowercase(), listener));
        Ok(())
    }

    /// Invoke every listener registered for `event` on its target.
    ///
    /// Returns how many listeners ran.
    pub fn dispatch_event(&self, event: &Event) -> Result<usize> {
        let listeners: Vec<Listener> = {
            let arena = self.arena.borrow();
            arena
                .get(event.target)?
                .listeners
                .iter()
                .filter(|(name, _)| *name == event.name)
                .map(|(_, listener)| Rc::clone(listener))
                .collect()
        };

        for listener in &listeners {
            listener(event);
        }
        Ok(listeners.len())
    }

    /// Simulate user input: set the value, then dispatch `input`.
    pub fn input(&self, id: NodeId, value: impl Into<String>) -> Result<usize> {
        let value = value.into();
        self.set_value(id, value.clone())?;
        self.dispatch_event(&Event::new("input", id).with_value(value))
    }

    /// Dispatch `click` on `id`.
    pub fn click(&self, id: NodeId) -> Result<usize> {
        self.dispatch_event(&Event::new("click", id))
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize the node and its subtree as HTML.
    pub fn to_html(&self, id: NodeId) -> Result<String> {
        let mut out = String::new();
        self.arena.borrow().write_html(id, &mut out)?;
        Ok(out)
    }

    /// Serialize only the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> Result<String> {
        let arena = self.arena.borrow();
        let mut out = String::new();
        for child in &arena.get(id)?.children {
            arena.write_html(*child, &mut out)?;
        }
        Ok(out)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document").field("nodes", &self.len()).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
