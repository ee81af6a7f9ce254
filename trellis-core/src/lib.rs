//! Trellis Core
//!
//! This crate provides the core runtime for the Trellis reactive UI framework.
//! It implements:
//!
//! - Reactive primitives (signals, memos, effects, batches, scopes)
//! - Shared state through reducer stores and scoped context values
//! - An in-memory document the view layer renders into
//! - Element construction with reactive attributes and children
//! - Keyed list reconciliation and conditional rendering
//! - Hash-based client-side routing
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `dom`: Node arena, attributes, events and HTML serialization
//! - `view`: Elements, reactive regions, lists, control flow, components
//! - `router`: Route patterns, the hash location and the router itself
//!
//! # Example
//!
//! ```rust
//! use trellis_core::Runtime;
//!
//! let rt = Runtime::new();
//! let (count, set_count) = rt.signal(0);
//!
//! let label = count.clone();
//! let button = rt
//!     .el("button")
//!     .on("click", move |_| set_count.update(|n| n + 1))
//!     .child(rt.memo(move || format!("Clicked {} times", label.get())))
//!     .build();
//!
//! let doc = rt.document();
//! doc.click(button).unwrap();
//! assert_eq!(doc.text_content(button), "Clicked 1 times");
//! assert_eq!(count.get(), 1);
//! ```

mod config;
mod error;

pub mod dom;
pub mod reactive;
pub mod router;
pub mod view;

pub use config::RuntimeConfig;
pub use error::{Error, Result};

pub use dom::{Document, Event, Listener, NodeId, NodeKind, Style};
pub use reactive::{
    Cleanup, Context, Dispose, EffectOutput, ErrorHandler, Memo, ReadSignal, Runtime, Scope,
    SourceId, Store, Subscriber, SubscriberId, Unsubscribe, WeakRuntime, WriteSignal,
};
pub use router::{
    match_route, ListenerId, Location, Params, Route, RouteContext, RoutePattern, Router, Segment,
    WILDCARD,
};
pub use view::{
    show, switch, when, Attribute, AttributeValue, Cases, Child, Component, ComponentFn, Content,
    Element, IntoContent, IntoNode, Lazy, NodeRef, Portal, Producer, Suspense, Value,
};
