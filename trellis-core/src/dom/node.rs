//! Document Nodes
//!
//! This module defines the node types stored in a [`Document`] arena.
//!
//! [`Document`]: super::Document

use std::fmt;

use indexmap::IndexMap;

use super::event::Listener;

/// Handle to a node in a [`Document`](super::Document).
///
/// A handle is an arena slot plus the generation the slot had when the node
/// was created. Once the node is released, the slot's generation moves on
/// and every old handle to it is detected as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Arena slot of the node.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// The kind of node in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with a tag name, attributes and children.
    Element(String),

    /// A text node.
    Text(String),

    /// A comment, used as an invisible position marker.
    Comment(String),

    /// Markup assigned through inner HTML. Serialized without escaping.
    Raw(String),
}

impl NodeKind {
    /// Tag name for elements.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element(tag) => Some(tag),
            _ => None,
        }
    }

    pub(crate) fn accepts_children(&self) -> bool {
        matches!(self, Self::Element(_))
    }
}

/// Inline style of an element, as ordered property/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style(IndexMap<String, String>);

impl Style {
    /// An empty style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Style::set`].
    pub fn with(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(property, value);
        self
    }

    /// Set a property. An empty value removes it.
    pub fn set(&mut self, property: impl Into<String>, value: impl Into<String>) {
        let property = property.into();
        let value = value.into();
        if value.is_empty() {
            self.0.shift_remove(&property);
        } else {
            self.0.insert(property, value);
        }
    }

    /// Value of a property.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    /// Copy every property of `other` into `self`.
    pub fn merge(&mut self, other: &Style) {
        for (property, value) in other.iter() {
            self.set(property, value);
        }
    }

    /// Properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (property, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{property}: {value};")?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Style {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut style = Style::new();
        for (property, value) in iter {
            style.set(property, value);
        }
        style
    }
}

/// Everything the arena stores for one live node.
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    /// Creation order, used to tell which nodes a region created itself.
    pub(crate) serial: u64,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) attributes: IndexMap<String, String>,
    pub(crate) style: Style,
    pub(crate) value: String,
    pub(crate) listeners: Vec<(String, Listener)>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind, serial: u64) -> Self {
        Self {
            kind,
            serial,
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
            style: Style::new(),
            value: String::new(),
            listeners: Vec::new(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_keeps_insertion_order() {
        let style = Style::new().with("color", "red").with("display", "none");
        assert_eq!(style.to_string(), "color: red; display: none;");
    }

    #[test]
    fn empty_value_removes_property() {
        let mut style = Style::new().with("display", "none");
        style.set("display", "");
        assert!(style.is_empty());
        assert_eq!(style.get("display"), None);
    }

    #[test]
    fn merge_overrides_existing_properties() {
        let mut style: Style = [("color", "red"), ("margin", "0")].into_iter().collect();
        style.merge(&Style::new().with("color", "blue"));
        assert_eq!(style.get("color"), Some("blue"));
        assert_eq!(style.get("margin"), Some("0"));
    }

    #[test]
    fn only_elements_have_tags() {
        assert_eq!(NodeKind::Element("div".into()).tag(), Some("div"));
        assert_eq!(NodeKind::Text("hi".into()).tag(), None);
    }
}
