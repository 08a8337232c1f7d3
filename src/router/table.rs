//! Route storage, the static-route cache and the one-time prioritization pass.

use std::collections::HashMap;
use std::fmt;

use super::Handler;
use super::pattern::Pattern;
use crate::Method;

/// One registered endpoint: a method, a compiled pattern and its handler.
#[derive(Clone)]
pub struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

impl Route {
    pub(crate) fn new(method: Method, pattern: Pattern, handler: Handler) -> Self {
        Self {
            method,
            pattern,
            handler,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn is_static(&self) -> bool {
        self.pattern.is_static()
    }

    /// The normalized path this route was registered under, e.g. `/users/[id]`.
    pub fn path(&self) -> String {
        self.pattern.normalized()
    }

    pub(crate) fn set_handler(&mut self, handler: Handler) {
        self.handler = handler;
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("static", &self.is_static())
            .finish_non_exhaustive()
    }
}

/// Ordered routes plus an index of static routes by method and literal path.
///
/// The index stores positions into `routes`, so it is rebuilt whenever the order
/// changes. A later static registration for the same method and literal path takes
/// over the index entry.
#[derive(Debug, Default)]
pub(crate) struct RouteTable {
    routes: Vec<Route>,
    static_index: HashMap<Method, HashMap<String, usize>>,
}

impl RouteTable {
    pub(crate) fn register(&mut self, route: Route) {
        let position = self.routes.len();
        if route.is_static() {
            index_static(&mut self.static_index, &route, position);
        }
        self.routes.push(route);
    }

    /// Orders routes so the most specific ones are tried first.
    ///
    /// Static routes come before parameterized ones; within each group fewer segments
    /// come first. `sort_by` is stable, so routes that tie keep their registration order.
    pub(crate) fn prioritize(&mut self) {
        self.routes.sort_by(|a, b| {
            b.is_static()
                .cmp(&a.is_static())
                .then_with(|| {
                    a.pattern
                        .segments()
                        .len()
                        .cmp(&b.pattern.segments().len())
                })
        });

        let Self {
            routes,
            static_index,
        } = self;
        static_index.clear();
        for (position, route) in routes.iter().enumerate() {
            if route.is_static() {
                index_static(static_index, route, position);
            }
        }
    }

    /// O(1) lookup of a static route by its literal registered path.
    pub(crate) fn lookup_static(&self, method: &Method, path: &str) -> Option<&Route> {
        let position = *self.static_index.get(method)?.get(path)?;
        self.routes.get(position)
    }

    pub(crate) fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Mutable access for handler replacement. Order and patterns must not change.
    pub(crate) fn routes_mut(&mut self) -> &mut [Route] {
        &mut self.routes
    }

    pub(crate) fn static_count(&self) -> usize {
        self.static_index.values().map(HashMap::len).sum()
    }

    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }

    pub(crate) fn clear(&mut self) {
        self.routes.clear();
        self.static_index.clear();
    }
}

fn index_static(
    index: &mut HashMap<Method, HashMap<String, usize>>,
    route: &Route,
    position: usize,
) {
    index
        .entry(route.method.clone())
        .or_default()
        .insert(route.pattern.as_str().to_owned(), position);
}
