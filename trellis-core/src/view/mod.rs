//! Declarative Rendering
//!
//! The view layer turns reactive values into direct mutations of the
//! runtime's [`Document`](crate::Document). There is no virtual tree and no
//! diffing pass: every dynamic attribute and every reactive region owns an
//! effect that updates exactly the nodes it is bound to.
//!
//! # Overview
//!
//! - [`Runtime::element`] and the [`Element`] builder create nodes from
//!   [`Attribute`]s and [`Child`]ren.
//! - A [`Producer`] used as a child becomes a reactive region anchored by a
//!   comment placeholder.
//! - [`Runtime::list`] reconciles keyed rows.
//! - [`when`], [`show`] and [`switch`] select between producers.
//! - [`Runtime::component`], [`Runtime::error_boundary`],
//!   [`Runtime::portal`], [`Runtime::suspense`] and [`Runtime::lazy`] wrap
//!   rendering with naming, failure containment, relocation and async
//!   loading.
//! - [`Runtime::mount`] attaches an application to a root node.
//!
//! [`Runtime::element`]: crate::Runtime::element
//! [`Runtime::list`]: crate::Runtime::list
//! [`Runtime::component`]: crate::Runtime::component
//! [`Runtime::error_boundary`]: crate::Runtime::error_boundary
//! [`Runtime::portal`]: crate::Runtime::portal
//! [`Runtime::suspense`]: crate::Runtime::suspense
//! [`Runtime::lazy`]: crate::Runtime::lazy
//! [`Runtime::mount`]: crate::Runtime::mount

mod attribute;
mod boundary;
mod child;
mod control_flow;
mod element;
mod list;
mod mount;
mod suspense;
mod value;

pub use attribute::{Attribute, AttributeValue, NodeRef};
pub use boundary::{Component, Portal};
pub use child::{Child, Content, IntoContent, IntoNode, Producer};
pub use control_flow::{show, switch, when, Cases};
pub use element::Element;
pub use suspense::{ComponentFn, Lazy, Suspense};
pub use value::Value;
