//! Resolving a `(method, path)` pair to a route and its captured params.
//!
//! Lookup runs in two steps. The static index is consulted first with the raw request
//! path, which answers the common case without tokenizing. On a miss the path is
//! tokenized and routes are scanned in prioritized order; the first full match wins.
//! A miss costs O(R·S) for R routes of S segments.

use super::Handler;
use super::pattern::{Pattern, Segment, tokenize};
use super::table::{Route, RouteTable};
use crate::Method;
use crate::context::Params;

/// A successful match: the route plus the params captured from the path.
#[derive(Debug)]
pub struct RouteMatch<'r> {
    route: &'r Route,
    params: Params,
}

impl<'r> RouteMatch<'r> {
    pub fn route(&self) -> &'r Route {
        self.route
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn handler(&self) -> &'r Handler {
        self.route.handler()
    }

    pub fn into_parts(self) -> (&'r Route, Params) {
        (self.route, self.params)
    }
}

pub(crate) fn find<'r>(
    table: &'r RouteTable,
    method: &Method,
    path: &str,
) -> Option<RouteMatch<'r>> {
    if let Some(route) = table.lookup_static(method, path) {
        return Some(RouteMatch {
            route,
            params: Params::new(),
        });
    }

    let url: Vec<&str> = tokenize(path).collect();

    table
        .routes()
        .iter()
        .filter(|route| route.method() == method)
        .find_map(|route| {
            match_segments(route.pattern(), &url).map(|params| RouteMatch { route, params })
        })
}

/// Walks `pattern` against the tokenized request path.
///
/// Without a catch-all the segment counts must be equal. Literals compare
/// byte-for-byte, `[name]` captures one segment, and `[...name]` captures everything
/// from its position onward (possibly nothing) and ends the walk.
///
/// ```
/// use rttp_router::router::{Pattern, match_segments};
///
/// let pattern = Pattern::parse("/files/[...path]").unwrap();
/// let params = match_segments(&pattern, &["files", "a", "b"]).unwrap();
/// assert_eq!(params.get_all("path").unwrap(), ["a", "b"]);
///
/// let params = match_segments(&pattern, &["files"]).unwrap();
/// assert!(params.get_all("path").unwrap().is_empty());
/// ```
pub fn match_segments(pattern: &Pattern, url: &[&str]) -> Option<Params> {
    let segments = pattern.segments();
    if !pattern.has_catch_all() && segments.len() != url.len() {
        return None;
    }

    let mut params = Params::new();
    for (i, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Literal(literal) => {
                if url.get(i).copied() != Some(literal.as_str()) {
                    return None;
                }
            }
            Segment::Param(name) => {
                let value = url.get(i)?;
                params.insert_single(name.as_str(), *value);
            }
            Segment::CatchAll(name) => {
                let rest = url.get(i..)?;
                let rest = rest.iter().map(|s| (*s).to_owned()).collect();
                params.insert_catch_all(name.as_str(), rest);
                return Some(params);
            }
        }
    }

    Some(params)
}
