//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration:
//!
//! ```rust
//! use trellis_core::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_json(r#"{ "event_prefix": "on:" }"#).unwrap();
//! assert_eq!(config.event_prefix, "on:");
//! assert_eq!(config.key_attribute, "data-key");
//! ```

use serde::Deserialize;

use crate::error::Result;

/// Tunables for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Attribute-name prefix that marks an event listener (`onclick`).
    pub event_prefix: String,

    /// Attribute written on every node produced by the list reconciler.
    pub key_attribute: String,

    /// Text of the comment node that anchors a reactive region.
    pub placeholder_text: String,

    /// Attribute carrying a component's name.
    pub component_attribute: String,

    /// Class of the inline node shown in place of failed content.
    pub error_class: String,

    /// Class of the router's not-found message.
    pub not_found_class: String,

    /// Text of the router's not-found message.
    pub not_found_message: String,

    /// How many times an effect may be re-queued by notifications that
    /// arrive while it is running before it is stopped.
    pub max_effect_reruns: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_prefix: "on".into(),
            key_attribute: "data-key".into(),
            placeholder_text: "reactive".into(),
            component_attribute: "data-component".into(),
            error_class: "nv-alert nv-alert-danger".into(),
            not_found_class: "nv-alert nv-alert-warning".into(),
            not_found_message: "404: Route not found".into(),
            max_effect_reruns: 100,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
