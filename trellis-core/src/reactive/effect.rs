//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever a cell it
//! read on its last run changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs immediately to discover its dependencies.
//!
//! 2. Every run happens inside a fresh reactive context. The cells read
//!    during the run become its dependency set; cells read on the previous
//!    run but not on this one are unsubscribed, so conditional reads narrow
//!    and widen the set naturally.
//!
//! 3. Before re-running, and when disposed, the cleanup returned by the last
//!    run is invoked.
//!
//! 4. A notification that arrives while the effect is already running marks
//!    it dirty; it runs again as soon as the current run finishes.
//!
//! # Failure
//!
//! Bodies may return a `Result`. An `Err` is handed to the runtime's error
//! channel; the effect stays subscribed and other effects are unaffected.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use super::context::{ReactiveContext, ReadSet};
use super::runtime::{Runtime, WeakRuntime};
use super::scope::{Scope, ScopeGuard};
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::{Error, Result};

/// Teardown returned by an effect run.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    /// Wrap a teardown closure.
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Invoke the teardown.
    pub fn run(self) {
        (self.0)();
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

/// What an effect body may return.
///
/// Implemented for `()`, [`Cleanup`], `Option<Cleanup>` and `Result`s of
/// those, so bodies can use `?`.
pub trait EffectOutput {
    /// Split the body's return value into its cleanup or its error.
    fn into_cleanup(self) -> Result<Option<Cleanup>>;
}

impl EffectOutput for () {
    fn into_cleanup(self) -> Result<Option<Cleanup>> {
        Ok(None)
    }
}

impl EffectOutput for Cleanup {
    fn into_cleanup(self) -> Result<Option<Cleanup>> {
        Ok(Some(self))
    }
}

impl EffectOutput for Option<Cleanup> {
    fn into_cleanup(self) -> Result<Option<Cleanup>> {
        Ok(self)
    }
}

impl<T, E> EffectOutput for std::result::Result<T, E>
where
    T: EffectOutput,
    E: Into<Error>,
{
    fn into_cleanup(self) -> Result<Option<Cleanup>> {
        self.map_err(Into::into).and_then(EffectOutput::into_cleanup)
    }
}

type Body = Box<dyn FnMut() -> Result<Option<Cleanup>>>;
type Gate = Box<dyn FnMut() -> bool>;

pub(crate) struct EffectInner {
    id: SubscriberId,
    subscriber: Subscriber,
    runtime: WeakRuntime,
    body: RefCell<Body>,
    /// Explicit dependency check; `false` skips the run.
    gate: Option<RefCell<Gate>>,
    cleanup: RefCell<Option<Cleanup>>,
    /// Scope current at creation; context lookups continue from it.
    owner: RefCell<Option<Scope>>,
    sources: RefCell<ReadSet>,
    running: Cell<bool>,
    dirty: Cell<bool>,
    disposed: Cell<bool>,
    run_count: Cell<usize>,
}

impl EffectInner {
    pub(crate) fn owner(&self) -> Option<Scope> {
        self.owner.borrow().clone()
    }

    /// Run now, or mark dirty if a run is already in progress.
    pub(crate) fn schedule(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        if self.running.get() {
            self.dirty.set(true);
            return;
        }
        let Some(runtime) = self.runtime.upgrade() else {
            return;
        };

        let limit = runtime.config().max_effect_reruns;
        let mut reruns = 0;
        loop {
            self.dirty.set(false);
            self.run_once(&runtime);
            if !self.dirty.get() || self.disposed.get() {
                break;
            }
            if reruns == limit {
                self.dirty.set(false);
                warn!(effect = %self.id, limit, "effect keeps invalidating itself");
                runtime.report_error(
                    &Error::Unsettled {
                        effect: self.id,
                        reruns: limit,
                    },
                    None,
                );
                break;
            }
            reruns += 1;
        }
    }

    fn run_once(self: &Rc<Self>, runtime: &Runtime) {
        self.running.set(true);

        let outcome = {
            let _scope = ScopeGuard::enter(runtime, None);
            let ctx = ReactiveContext::enter(&runtime.inner.context, Some(self.subscriber.clone()));

            let proceed = self.gate.as_ref().map_or(true, |gate| (gate.borrow_mut())());
            let outcome = if proceed {
                let previous = self.cleanup.borrow_mut().take();
                if let Some(cleanup) = previous {
                    runtime.untrack(|| cleanup.run());
                }
                self.run_count.set(self.run_count.get() + 1);
                trace!(effect = %self.id, run = self.run_count.get(), "running effect");
                Some((self.body.borrow_mut())())
            } else {
                trace!(effect = %self.id, "dependencies unchanged, run skipped");
                None
            };

            self.update_sources(ctx.finish(), proceed);
            outcome
        };

        self.running.set(false);

        match outcome {
            Some(Ok(cleanup)) => *self.cleanup.borrow_mut() = cleanup,
            Some(Err(error)) => runtime.report_error(&error, None),
            None => {}
        }

        if self.disposed.get() {
            self.release(Some(runtime));
        }
    }

    /// Swap in the cells read by the last run and unsubscribe from the ones
    /// it no longer reads. Skipped runs only add.
    fn update_sources(&self, reads: ReadSet, replace: bool) {
        let stale: Vec<_> = {
            let mut sources = self.sources.borrow_mut();
            if replace {
                let previous = std::mem::replace(&mut *sources, reads);
                previous
                    .into_iter()
                    .filter(|(id, _)| !sources.contains_key(id))
                    .map(|(_, source)| source)
                    .collect()
            } else {
                sources.extend(reads);
                Vec::new()
            }
        };

        for source in stale {
            if let Some(source) = source.upgrade() {
                source.unsubscribe(self.id);
            }
        }
    }

    fn release(&self, runtime: Option<&Runtime>) {
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            match runtime {
                Some(runtime) => runtime.untrack(|| cleanup.run()),
                None => cleanup.run(),
            }
        }

        let sources = std::mem::take(&mut *self.sources.borrow_mut());
        for (_, source) in sources {
            if let Some(source) = source.upgrade() {
                source.unsubscribe(self.id);
            }
        }
    }

    /// Run the last cleanup, drop every subscription, then leave the registry.
    pub(crate) fn dispose(self: &Rc<Self>) {
        if self.disposed.replace(true) {
            return;
        }

        let runtime = self.runtime.upgrade();
        if !self.running.get() {
            self.release(runtime.as_ref());
        }
        debug!(effect = %self.id, runs = self.run_count.get(), "effect disposed");
        let owner = self.owner.borrow_mut().take();
        drop(owner);

        if let Some(runtime) = runtime {
            let removed = runtime.inner.effects.borrow_mut().shift_remove(&self.id);
            drop(removed);
        }
    }
}

/// Handle that disposes an effect.
///
/// Dropping the handle does not dispose the effect; it stays alive for as
/// long as its runtime does, like any subscription in the graph.
#[derive(Debug, Clone)]
pub struct Dispose {
    runtime: WeakRuntime,
    id: SubscriberId,
}

impl Dispose {
    /// The disposed effect's ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Run the effect's last cleanup and remove it from the registry.
    pub fn dispose(&self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.dispose_effect(self.id);
        }
    }

    /// Whether the effect is still registered.
    pub fn is_live(&self) -> bool {
        self.runtime
            .upgrade()
            .is_some_and(|runtime| runtime.inner.effects.borrow().contains_key(&self.id))
    }
}

impl Runtime {
    /// Create an effect and run it once.
    ///
    /// ```rust
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use trellis_core::Runtime;
    ///
    /// let rt = Runtime::new();
    /// let (name, set_name) = rt.signal("world".to_string());
    /// let log = Rc::new(RefCell::new(Vec::new()));
    ///
    /// let sink = log.clone();
    /// let effect = rt.effect(move || sink.borrow_mut().push(format!("hello {}", name.get())));
    ///
    /// set_name.set("trellis".into());
    /// effect.dispose();
    /// set_name.set("nobody".into());
    ///
    /// assert_eq!(*log.borrow(), ["hello world", "hello trellis"]);
    /// ```
    pub fn effect<F, R>(&self, mut f: F) -> Dispose
    where
        F: FnMut() -> R + 'static,
        R: EffectOutput,
    {
        self.spawn_effect(None, Box::new(move || f().into_cleanup()))
    }

    /// Create an effect that only re-runs when `deps` returns a value
    /// different from the previous run's.
    ///
    /// `deps` runs on every notification and its reads are tracked, so it is
    /// usually a tuple of signal reads. The first run always executes.
    pub fn effect_with_deps<D, DF, F, R>(&self, mut deps: DF, mut f: F) -> Dispose
    where
        D: PartialEq + 'static,
        DF: FnMut() -> D + 'static,
        F: FnMut() -> R + 'static,
        R: EffectOutput,
    {
        let mut previous: Option<D> = None;
        let gate = move || {
            let next = deps();
            if previous.as_ref() == Some(&next) {
                return false;
            }
            previous = Some(next);
            true
        };

        self.spawn_effect(
            Some(Box::new(gate)),
            Box::new(move || f().into_cleanup()),
        )
    }

    fn spawn_effect(&self, gate: Option<Gate>, body: Body) -> Dispose {
        let runtime = self.downgrade();
        let effect = Rc::new_cyclic(|weak: &Weak<EffectInner>| {
            let id = SubscriberId::new();
            let weak = weak.clone();
            EffectInner {
                id,
                subscriber: Subscriber::new(id, move || {
                    if let Some(effect) = weak.upgrade() {
                        effect.schedule();
                    }
                }),
                runtime,
                body: RefCell::new(body),
                gate: gate.map(RefCell::new),
                cleanup: RefCell::new(None),
                owner: RefCell::new(None),
                sources: RefCell::new(ReadSet::new()),
                running: Cell::new(false),
                dirty: Cell::new(false),
                disposed: Cell::new(false),
                run_count: Cell::new(0),
            }
        });

        let id = effect.id;
        self.inner.effects.borrow_mut().insert(id, Rc::clone(&effect));
        *effect.owner.borrow_mut() = self.adopt_effect(id);
        effect.schedule();

        Dispose {
            runtime: self.downgrade(),
            id,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<usize>>, impl Fn()) {
        let count = Rc::new(Cell::new(0));
        let clone = count.clone();
        (count, move || clone.set(clone.get() + 1))
    }

    #[test]
    fn effect_runs_on_creation() {
        let rt = Runtime::new();
        let (runs, bump) = counter();

        let _effect = rt.effect(move || bump());

        assert_eq!(runs.get(), 1);
        assert_eq!(rt.effect_count(), 1);
    }

    #[test]
    fn effect_reruns_when_dependency_changes() {
        let rt = Runtime::new();
        let (value, set_value) = rt.signal(1);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        let _effect = rt.effect(move || sink.borrow_mut().push(value.get()));
        set_value.set(2);
        set_value.set(2);
        set_value.set(3);

        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn cleanup_runs_before_each_rerun() {
        let rt = Runtime::new();
        let (value, set_value) = rt.signal(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let sink = log.clone();
        let _effect = rt.effect(move || {
            let v = value.get();
            sink.borrow_mut().push(format!("run {v}"));
            let sink = sink.clone();
            Cleanup::new(move || sink.borrow_mut().push(format!("cleanup {v}")))
        });
        set_value.set(1);

        assert_eq!(*log.borrow(), vec!["run 0", "cleanup 0", "run 1"]);
    }

    #[test]
    fn dispose_runs_cleanup_once_before_leaving_registry() {
        let rt = Runtime::new();
        let (value, set_value) = rt.signal(0);
        let registered_during_cleanup = Rc::new(Cell::new(None));
        let (cleanups, bump) = counter();
        let bump = Rc::new(bump);

        let rt_clone = rt.downgrade();
        let seen = registered_during_cleanup.clone();
        let effect = rt.effect(move || {
            value.get();
            let bump = bump.clone();
            let rt_clone = rt_clone.clone();
            let seen = seen.clone();
            Cleanup::new(move || {
                bump();
                seen.set(rt_clone.upgrade().map(|rt| rt.effect_count()));
            })
        });

        // The second dispose and the later write must both be ignored
        effect.dispose();
        effect.dispose();
        set_value.set(1);

        assert_eq!(cleanups.get(), 1);
        assert_eq!(registered_during_cleanup.get(), Some(1));
        assert_eq!(rt.effect_count(), 0);
        assert!(!effect.is_live());
    }

    #[test]
    fn explicit_deps_skip_unchanged_runs() {
        let rt = Runtime::new();
        let (page, set_page) = rt.signal(1);
        let (noise, set_noise) = rt.signal(0);
        let (runs, bump) = counter();

        let _effect = rt.effect_with_deps(
            move || (page.get(), noise.get() / 10),
            move || bump(),
        );

        // 3 and 7 both map to bucket 0, so the deps tuple is unchanged
        set_noise.set(3);
        set_noise.set(7);
        assert_eq!(runs.get(), 1);

        set_noise.set(12);
        assert_eq!(runs.get(), 2);

        set_page.set(2);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn errors_are_reported_and_effect_survives() {
        let rt = Runtime::new();
        let (value, set_value) = rt.signal(0);
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        rt.on_error(move |err, _| sink.borrow_mut().push(err.to_string()));

        let (runs, bump) = counter();
        let reader = value.clone();
        let _failing = rt.effect(move || -> Result<()> {
            let v = reader.get();
            if v % 2 == 1 {
                return Err(Error::msg(format!("odd value {v}")));
            }
            Ok(())
        });
        let _sibling = rt.effect(move || {
            value.get();
            bump();
        });

        // Odd writes fail the first effect but it stays subscribed
        set_value.set(1);
        set_value.set(2);
        set_value.set(3);

        assert_eq!(*errors.borrow(), vec!["odd value 1", "odd value 3"]);
        assert_eq!(runs.get(), 4);
    }

    #[test]
    fn conditional_reads_are_rediscovered() {
        let rt = Runtime::new();
        let (guard, set_guard) = rt.signal(true);
        let (detail, set_detail) = rt.signal(0);
        let (runs, bump) = counter();

        let detail_reader = detail.clone();
        let _effect = rt.effect(move || {
            if guard.get() {
                detail_reader.get();
            }
            bump();
        });
        assert_eq!(detail.subscriber_count(), 1);

        // The re-run skips the branch, dropping the dependency on `detail`
        set_guard.set(false);
        assert_eq!(runs.get(), 2);
        assert_eq!(detail.subscriber_count(), 0);

        set_detail.set(5);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn self_invalidation_reruns_until_settled() {
        let rt = Runtime::new();
        let (value, set_value) = rt.signal(0);

        let reader = value.clone();
        let _effect = rt.effect(move || {
            let v = reader.get();
            if v < 5 {
                set_value.set(v + 1);
            }
        });

        assert_eq!(value.get(), 5);
    }

    #[test]
    fn runaway_effect_is_stopped_and_reported() {
        let rt = Runtime::with_config(crate::RuntimeConfig {
            max_effect_reruns: 3,
            ..Default::default()
        });
        let (value, set_value) = rt.signal(0u32);
        let errors = Rc::new(Cell::new(0));
        let sink = errors.clone();
        rt.on_error(move |err, _| {
            assert!(matches!(err, Error::Unsettled { reruns: 3, .. }));
            sink.set(sink.get() + 1);
        });

        // Every run writes the cell it reads, so it never settles
        let reader = value.clone();
        let _effect = rt.effect(move || set_value.set(reader.get() + 1));

        assert_eq!(errors.get(), 1);
        assert_eq!(value.get(), 4);
    }

    #[test]
    fn nested_effect_restores_outer_context() {
        let rt = Runtime::new();
        let (outer, set_outer) = rt.signal(0);
        let (inner, _) = rt.signal(0);
        let (runs, bump) = counter();

        let rt_inner = rt.downgrade();
        let _effect = rt.effect(move || {
            if let Some(rt) = rt_inner.upgrade() {
                let inner = inner.clone();
                let _nested = rt.effect(move || {
                    inner.get();
                });
            }
            outer.get();
            bump();
        });

        set_outer.set(1);
        assert_eq!(runs.get(), 2);
    }
}
