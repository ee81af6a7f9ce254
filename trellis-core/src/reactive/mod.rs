//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, effects,
//! batches, and ownership scopes. These primitives form the foundation of
//! Trellis's fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A signal is a container for mutable state, split into a read half and a
//! write half. When the read half is read inside a running effect, the signal
//! registers that effect as a dependent. Writing a value equal to the current
//! one is a no-op; any other write notifies every dependent.
//!
//! ## Effects
//!
//! An effect is a side-effecting computation that runs immediately and again
//! whenever a cell it read during its last run changes. Dependencies are
//! re-discovered on every run, so a branch that stops reading a cell also
//! stops reacting to it.
//!
//! ## Memos
//!
//! A memo is a derived value backed by a signal and kept current by an effect.
//!
//! ## Batches
//!
//! Inside [`Runtime::batch`], notifications are queued and each affected
//! effect runs at most once when the outermost batch exits.
//!
//! ## Scopes
//!
//! A [`Scope`] owns the effects created while it is current, any child
//! scopes, and cleanup callbacks. Disposing a scope tears all of them down.
//! Scopes also carry [`Context`] values for the content rendered inside them.
//!
//! ## Stores
//!
//! A [`Store`] wraps a signal behind a reducer: state changes are expressed
//! as actions, and plain listeners can follow every change.
//!
//! # Implementation Notes
//!
//! All state hangs off a [`Runtime`] handle rather than thread-local globals,
//! so independent runtimes never observe each other. The runtime is
//! single-threaded: cells hold `Rc`/`RefCell` state and are not `Send`.

mod batch;
mod context;
mod effect;
mod memo;
mod provider;
mod runtime;
mod scope;
mod signal;
mod store;
mod subscriber;

pub use effect::{Cleanup, Dispose, EffectOutput};
pub use memo::Memo;
pub use provider::Context;
pub use runtime::{ErrorHandler, Runtime, WeakRuntime};
pub use scope::Scope;
pub use signal::{ReadSignal, Unsubscribe, WriteSignal};
pub use store::Store;
pub use subscriber::{SourceId, Subscriber, SubscriberId};
