//! Client-Side Routing
//!
//! A [`Router`] renders one of an ordered table of [`Route`]s into a
//! container, selected by the current path of a hash [`Location`].
//!
//! # How Routing Works
//!
//! 1. The current path lives in a signal fed by the location's change
//!    listener.
//!
//! 2. One effect reads that signal. On every change it disposes the scope of
//!    the previously rendered route, clears the container and looks for the
//!    first route whose pattern matches.
//!
//! 3. A matched route whose guard fails is redirected when it names a
//!    redirect target. Otherwise the route renders inside a fresh scope.
//!    Cells the render function reads directly belong to the router effect,
//!    so a change to any of them renders the route again.
//!
//! 4. With no match, the wildcard route renders if there is one, else a
//!    static not-found message.

mod location;
mod pattern;

pub use location::{ListenerId, Location};
pub use pattern::{Params, RoutePattern, Segment, WILDCARD};

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::dom::NodeId;
use crate::error::Result;
use crate::reactive::{Dispose, ReadSignal, Runtime, Scope};
use crate::view::IntoNode;

type RenderRoute = Rc<dyn Fn(&RouteContext) -> Result<NodeId>>;
type Guard = Rc<dyn Fn() -> bool>;

/// One entry of the routing table.
pub struct Route {
    pattern: RoutePattern,
    render: RenderRoute,
    guard: Option<Guard>,
    redirect: Option<String>,
}

impl Route {
    /// A route rendering `render` for paths matching `pattern`.
    pub fn new<F, R>(pattern: &str, render: F) -> Result<Self>
    where
        F: Fn(&RouteContext) -> R + 'static,
        R: IntoNode,
    {
        Ok(Self::with_pattern(RoutePattern::parse(pattern)?, render))
    }

    /// The fallback route, rendered when no other route matches.
    pub fn wildcard<F, R>(render: F) -> Self
    where
        F: Fn(&RouteContext) -> R + 'static,
        R: IntoNode,
    {
        Self::with_pattern(RoutePattern::wildcard(), render)
    }

    fn with_pattern<F, R>(pattern: RoutePattern, render: F) -> Self
    where
        F: Fn(&RouteContext) -> R + 'static,
        R: IntoNode,
    {
        Self {
            pattern,
            render: Rc::new(move |context| render(context).into_node()),
            guard: None,
            redirect: None,
        }
    }

    /// Only render while `guard` returns `true`. Cells read by the guard are
    /// tracked, so the route is re-evaluated when they change.
    pub fn guard(mut self, guard: impl Fn() -> bool + 'static) -> Self {
        self.guard = Some(Rc::new(guard));
        self
    }

    /// Where to navigate when the guard fails.
    pub fn redirect(mut self, path: impl Into<String>) -> Self {
        self.redirect = Some(path.into());
        self
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("guarded", &self.guard.is_some())
            .field("redirect", &self.redirect)
            .finish()
    }
}

/// What a route's render function receives.
#[derive(Debug, Clone)]
pub struct RouteContext {
    /// Parameters bound by the route's pattern.
    pub params: Params,
    /// The matched path.
    pub path: String,
    location: Location,
}

impl RouteContext {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Navigate to `path`.
    pub fn navigate(&self, path: &str) {
        self.location.set_hash(path);
    }
}

/// The first non-wildcard route matching `path`, with its parameters.
pub fn match_route<'a>(routes: &'a [Route], path: &str) -> Option<(&'a Route, Params)> {
    routes
        .iter()
        .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
}

/// Renders the route matching the current location into a container.
pub struct Router {
    location: Location,
    path: ReadSignal<String>,
    listener: ListenerId,
    effect: Dispose,
    current: Rc<RefCell<Option<Scope>>>,
}

impl Router {
    /// Start routing `location` into `container`.
    ///
    /// The route table is fixed for the router's lifetime. Everything the
    /// router renders into `container` is owned by it and released on the
    /// next navigation.
    pub fn new(runtime: &Runtime, routes: Vec<Route>, container: NodeId, location: Location) -> Self {
        let (path, set_path) = runtime.signal(location.path());
        let listener = location.on_change(move |path| set_path.set(path.to_owned()));

        let routes: Rc<[Route]> = routes.into();
        let current: Rc<RefCell<Option<Scope>>> = Rc::default();

        let effect = {
            let runtime = runtime.downgrade();
            let path = path.clone();
            let location = location.clone();
            let current = Rc::clone(&current);
            move || -> Result<()> {
                let Some(runtime) = runtime.upgrade() else {
                    return Ok(());
                };
                let path = path.get();

                let previous = current.borrow_mut().take();
                if let Some(previous) = previous {
                    previous.dispose();
                }
                let document = runtime.document();
                for child in document.clear_children(container)? {
                    document.release(child);
                }

                let (route, params) = match match_route(&routes, &path) {
                    Some((route, params)) => {
                        let allowed = route.guard.as_ref().map_or(true, |guard| guard());
                        if let (false, Some(target)) = (allowed, &route.redirect) {
                            debug!(%path, %target, "route guard redirected");
                            location.set_hash(target);
                            return Ok(());
                        }
                        (Some(route), params)
                    }
                    None => (
                        routes.iter().find(|route| route.pattern.is_wildcard()),
                        Params::default(),
                    ),
                };

                let Some(route) = route else {
                    debug!(%path, "no route matched");
                    let config = runtime.config();
                    let node = document.create_message(
                        "div",
                        &config.not_found_class,
                        config.not_found_message.clone(),
                    );
                    return document.append_child(container, node);
                };

                debug!(%path, route = %route.pattern, "rendering route");
                let context = RouteContext {
                    params,
                    path: path.clone(),
                    location: location.clone(),
                };
                let scope = runtime.scope();
                let node = scope
                    .run(|| (route.render)(&context))
                    .unwrap_or_else(|error| runtime.error_node(&error, None));
                *current.borrow_mut() = Some(scope);
                document.append_child(container, node)
            }
        };

        Self {
            location,
            path,
            listener,
            effect: runtime.effect(effect),
            current,
        }
    }

    /// Navigate to `path` by updating the location's hash.
    pub fn navigate(&self, path: &str) {
        self.location.set_hash(path);
    }

    /// The current path, as a signal.
    pub fn current_path(&self) -> ReadSignal<String> {
        self.path.clone()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Stop routing and dispose the rendered route's scope. The container
    /// keeps its last content.
    pub fn dispose(&self) {
        self.effect.dispose();
        self.location.remove_listener(self.listener);
        let current = self.current.borrow_mut().take();
        if let Some(scope) = current {
            scope.dispose();
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("path", &self.path.peek())
            .field("location", &self.location)
            .finish()
    }
}

impl Runtime {
    /// An anchor pointing at the hash path `path`.
    pub fn link(&self, text: &str, path: &str, class: &str) -> NodeId {
        let document = self.document();
        let anchor = document.create_element("a");
        let _ = document.set_attribute(anchor, "href", format!("#{path}"));
        if !class.is_empty() {
            let _ = document.set_attribute(anchor, "class", class);
        }
        let _ = document.append_child(anchor, document.create_text(text));
        anchor
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
