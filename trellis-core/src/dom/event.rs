//! Events dispatched to document nodes.

use std::rc::Rc;

use super::node::NodeId;

/// An event delivered to listeners on its target node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Lower-case event name, e.g. `click` or `input`.
    pub name: String,
    /// The node the event was dispatched on.
    pub target: NodeId,
    /// The target's form value at dispatch time, for `input`/`change`.
    pub value: Option<String>,
}

impl Event {
    /// An event without a value.
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            value: None,
        }
    }

    /// Attach a form value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Event listener callback.
pub type Listener = Rc<dyn Fn(&Event)>;
