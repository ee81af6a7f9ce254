//! In-Memory Document
//!
//! The live tree the view layer renders into. It mirrors the subset of the
//! browser DOM the runtime relies on: element, text and comment nodes,
//! attributes, inline style, raw inner HTML, a form value and event
//! listeners, plus append/insert-before/remove and sibling navigation.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an arena indexed by [`NodeId`], a slot index plus a
//!    generation. Released slots are reused; stale handles are detected
//!    instead of aliasing the new occupant.
//!
//! 2. The tree is strict. A node has at most one parent, and inserting a
//!    node that already has one moves it.
//!
//! 3. The document can be serialized to HTML for inspection and tests.

mod document;
mod event;
mod node;

pub use document::Document;
pub use event::{Event, Listener};
pub use node::{NodeId, NodeKind, Style};
