//! Error types shared by the runtime, the document and the router.

use thiserror::Error;

use crate::dom::NodeId;
use crate::reactive::SubscriberId;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong inside the runtime.
///
/// Errors never unwind out of the reactive core: effect bodies, render
/// functions and loaders hand them to [`Runtime::report_error`], which logs
/// them and forwards them to the registered error handlers.
///
/// [`Runtime::report_error`]: crate::Runtime::report_error
#[derive(Debug, Error)]
pub enum Error {
    /// A user computation failed with a plain message.
    #[error("{0}")]
    Message(String),

    /// A named component failed while rendering.
    #[error("{name}: {source}")]
    Component {
        /// Display name of the component.
        name: String,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// An async loader rejected.
    #[error("failed to load: {0}")]
    Loader(String),

    /// The node was released from its document.
    #[error("node {0} no longer exists")]
    StaleNode(NodeId),

    /// A tree mutation would break the single-parent hierarchy.
    #[error("invalid hierarchy: {0}")]
    Hierarchy(String),

    /// A route pattern could not be parsed.
    #[error("route pattern `{pattern}` is invalid: {reason}")]
    InvalidRoute {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An effect kept invalidating itself.
    #[error("effect {effect} did not settle after {reruns} re-runs")]
    Unsettled {
        /// The effect that was stopped.
        effect: SubscriberId,
        /// The configured re-run cap.
        reruns: usize,
    },

    /// Every strong handle to the runtime was dropped.
    #[error("the runtime has been dropped")]
    RuntimeDropped,

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::Message`].
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl Error {
    /// Wrap `self` as the failure of the component `name`.
    pub fn in_component(self, name: impl Into<String>) -> Self {
        Self::Component {
            name: name.into(),
            source: Box::new(self),
        }
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::Message(message.to_owned())
    }
}
