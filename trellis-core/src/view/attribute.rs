//! Attribute categories understood by the node construction layer.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::value::Value;
use crate::config::RuntimeConfig;
use crate::dom::{Event, Listener, NodeId, Style};
use crate::reactive::{ReadSignal, WriteSignal};

/// Caller-held slot that receives the node an element was built into.
#[derive(Clone, Default)]
pub struct NodeRef(Rc<Cell<Option<NodeId>>>);

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// The node, once the element has been built.
    pub fn get(&self) -> Option<NodeId> {
        self.0.get()
    }

    pub(crate) fn set(&self, node: NodeId) {
        self.0.set(Some(node));
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&self.get()).finish()
    }
}

/// One attribute of an element under construction.
///
/// Static values are assigned once. Dynamic values are bound through an
/// effect and re-assigned whenever a cell they read changes.
pub enum Attribute {
    /// Store the element into a [`NodeRef`].
    Ref(NodeRef),
    /// The `class` attribute.
    Class(Value<String>),
    /// Inline style properties, merged into the current style.
    Style(Value<Style>),
    /// Event listener; the name is the lower-case event name.
    On(String, Listener),
    /// Raw inner HTML. Not escaped.
    Html(Value<String>),
    /// Visibility, toggling `display: none`.
    Show(Value<bool>),
    /// Two-way binding between the form value and a string cell.
    Bind(ReadSignal<String>, WriteSignal<String>),
    /// Any other attribute.
    Generic(String, Value<String>),
}

/// Untyped attribute value, for building attributes from plain names.
pub enum AttributeValue {
    Text(Value<String>),
    Handler(Listener),
}

impl Attribute {
    pub fn class(value: impl Into<Value<String>>) -> Self {
        Self::Class(value.into())
    }

    pub fn style(value: impl Into<Value<Style>>) -> Self {
        Self::Style(value.into())
    }

    pub fn on(event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        Self::On(event.to_ascii_lowercase(), Rc::new(handler))
    }

    pub fn html(value: impl Into<Value<String>>) -> Self {
        Self::Html(value.into())
    }

    pub fn show(value: impl Into<Value<bool>>) -> Self {
        Self::Show(value.into())
    }

    pub fn bind((value, set_value): (ReadSignal<String>, WriteSignal<String>)) -> Self {
        Self::Bind(value, set_value)
    }

    pub fn generic(name: impl Into<String>, value: impl Into<Value<String>>) -> Self {
        Self::Generic(name.into(), value.into())
    }

    /// Classify an attribute given by name.
    ///
    /// Handlers become listeners; a name starting with the configured event
    /// prefix has the prefix stripped and the rest lower-cased, so `onClick`
    /// listens for `click`. Text values named `class`/`className`, `html` or
    /// `show` get their dedicated category; anything else is generic.
    pub fn parse(name: &str, value: AttributeValue, config: &RuntimeConfig) -> Self {
        match value {
            AttributeValue::Handler(listener) => {
                let event = name.strip_prefix(config.event_prefix.as_str()).unwrap_or(name);
                Self::On(event.to_ascii_lowercase(), listener)
            }
            AttributeValue::Text(value) => match name {
                "class" | "className" => Self::Class(value),
                "html" => Self::Html(value),
                "show" => Self::Show(value.map(|text| !text.is_empty() && text != "false")),
                _ => Self::Generic(name.to_owned(), value),
            },
        }
    }

    /// Category name, for diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Ref(_) => "ref",
            Self::Class(_) => "class",
            Self::Style(_) => "style",
            Self::On(..) => "on",
            Self::Html(_) => "html",
            Self::Show(_) => "show",
            Self::Bind(..) => "bind",
            Self::Generic(..) => "generic",
        }
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On(event, _) => f.debug_tuple("On").field(event).finish(),
            Self::Generic(name, value) => f.debug_tuple("Generic").field(name).field(value).finish(),
            Self::Class(value) => f.debug_tuple("Class").field(value).finish(),
            other => f.write_str(other.category()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value.into())
    }
}

impl From<Value<String>> for AttributeValue {
    fn from(value: Value<String>) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> AttributeValue {
        AttributeValue::Handler(Rc::new(|_: &Event| {}))
    }

    #[test]
    fn prefixed_handlers_are_lower_cased() {
        let config = RuntimeConfig::default();
        match Attribute::parse("onClick", handler(), &config) {
            Attribute::On(event, _) => assert_eq!(event, "click"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn custom_prefix_is_honoured() {
        let config = RuntimeConfig {
            event_prefix: "on:".into(),
            ..RuntimeConfig::default()
        };
        match Attribute::parse("on:KeyDown", handler(), &config) {
            Attribute::On(event, _) => assert_eq!(event, "keydown"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn text_attributes_are_classified_by_name() {
        let config = RuntimeConfig::default();
        assert_eq!(Attribute::parse("className", "a".into(), &config).category(), "class");
        assert_eq!(Attribute::parse("html", "<b/>".into(), &config).category(), "html");
        assert_eq!(Attribute::parse("href", "#/".into(), &config).category(), "generic");

        match Attribute::parse("show", "false".into(), &config) {
            Attribute::Show(visible) => assert!(!visible.get()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn node_ref_starts_empty() {
        let node_ref = NodeRef::new();
        assert_eq!(node_ref.get(), None);
    }
}
