//! Children of an element and the content reactive regions produce.

use std::fmt;
use std::rc::Rc;

use super::element::Element;
use crate::dom::NodeId;
use crate::error::{Error, Result};
use crate::reactive::{Memo, ReadSignal};

/// Content produced for a reactive region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Content {
    /// Nothing is rendered.
    #[default]
    Empty,
    /// An existing node.
    Node(NodeId),
    /// Text, rendered as a new text node.
    Text(String),
    /// A sequence, flattened in order.
    Many(Vec<Content>),
}

/// Conversion into region content.
///
/// Implemented for nodes, strings, `()`, `Option`s, `Vec`s and `Result`s
/// of those, so producers can return whatever is convenient and use `?`.
pub trait IntoContent {
    fn into_content(self) -> Result<Content>;
}

impl IntoContent for Content {
    fn into_content(self) -> Result<Content> {
        Ok(self)
    }
}

impl IntoContent for NodeId {
    fn into_content(self) -> Result<Content> {
        Ok(Content::Node(self))
    }
}

impl IntoContent for String {
    fn into_content(self) -> Result<Content> {
        Ok(Content::Text(self))
    }
}

impl IntoContent for &str {
    fn into_content(self) -> Result<Content> {
        Ok(Content::Text(self.to_owned()))
    }
}

impl IntoContent for () {
    fn into_content(self) -> Result<Content> {
        Ok(Content::Empty)
    }
}

impl IntoContent for Element {
    fn into_content(self) -> Result<Content> {
        Ok(Content::Node(self.build()))
    }
}

impl<T: IntoContent> IntoContent for Option<T> {
    fn into_content(self) -> Result<Content> {
        self.map_or(Ok(Content::Empty), IntoContent::into_content)
    }
}

impl<T: IntoContent> IntoContent for Vec<T> {
    fn into_content(self) -> Result<Content> {
        self.into_iter()
            .map(IntoContent::into_content)
            .collect::<Result<Vec<_>>>()
            .map(Content::Many)
    }
}

impl<T, E> IntoContent for std::result::Result<T, E>
where
    T: IntoContent,
    E: Into<Error>,
{
    fn into_content(self) -> Result<Content> {
        self.map_err(Into::into).and_then(IntoContent::into_content)
    }
}

/// Conversion into a single node, for render functions.
pub trait IntoNode {
    fn into_node(self) -> Result<NodeId>;
}

impl IntoNode for NodeId {
    fn into_node(self) -> Result<NodeId> {
        Ok(self)
    }
}

impl IntoNode for Element {
    fn into_node(self) -> Result<NodeId> {
        Ok(self.build())
    }
}

impl<T, E> IntoNode for std::result::Result<T, E>
where
    T: IntoNode,
    E: Into<Error>,
{
    fn into_node(self) -> Result<NodeId> {
        self.map_err(Into::into).and_then(IntoNode::into_node)
    }
}

/// A zero-argument content function, usable as a reactive child.
#[derive(Clone)]
pub struct Producer(Rc<dyn Fn() -> Result<Content>>);

impl Producer {
    pub fn new<F, C>(f: F) -> Self
    where
        F: Fn() -> C + 'static,
        C: IntoContent,
    {
        Self(Rc::new(move || f().into_content()))
    }

    /// A producer that always yields `content`.
    pub fn constant(content: Content) -> Self {
        Self(Rc::new(move || Ok(content.clone())))
    }

    /// A producer that yields nothing.
    pub fn empty() -> Self {
        Self::constant(Content::Empty)
    }

    /// Evaluate the producer.
    pub fn call(&self) -> Result<Content> {
        (self.0)()
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Producer")
    }
}

impl From<Content> for Producer {
    fn from(content: Content) -> Self {
        Self::constant(content)
    }
}

impl From<NodeId> for Producer {
    fn from(node: NodeId) -> Self {
        Self::constant(Content::Node(node))
    }
}

impl From<String> for Producer {
    fn from(text: String) -> Self {
        Self::constant(Content::Text(text))
    }
}

impl From<&str> for Producer {
    fn from(text: &str) -> Self {
        Self::constant(Content::Text(text.to_owned()))
    }
}

/// One child passed to the node construction layer.
#[derive(Debug, Clone)]
pub enum Child {
    /// Nothing.
    Empty,
    /// An existing node, appended as is.
    Node(NodeId),
    /// Static text.
    Text(String),
    /// Nested children, flattened in order.
    Many(Vec<Child>),
    /// A reactive region kept current by an effect.
    Reactive(Producer),
}

impl From<NodeId> for Child {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Self::Node(element.build())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Producer> for Child {
    fn from(producer: Producer) -> Self {
        Self::Reactive(producer)
    }
}

impl From<Vec<Child>> for Child {
    fn from(children: Vec<Child>) -> Self {
        Self::Many(children)
    }
}

impl<C: Into<Child>> From<Option<C>> for Child {
    fn from(child: Option<C>) -> Self {
        child.map_or(Self::Empty, Into::into)
    }
}

impl<T: fmt::Display + 'static> From<ReadSignal<T>> for Child {
    fn from(signal: ReadSignal<T>) -> Self {
        Self::Reactive(Producer::new(move || signal.with(ToString::to_string)))
    }
}

impl<T: fmt::Display + 'static> From<Memo<T>> for Child {
    fn from(memo: Memo<T>) -> Self {
        Self::Reactive(Producer::new(move || memo.with(ToString::to_string)))
    }
}
