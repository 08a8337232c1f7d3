//! Reusable route bundles mounted under a base path.

use super::{Route, RouterBuilder};
use crate::error::Result;

/// A set of routes registered once and mounted with
/// [`RouterBuilder::inject_wrapper`].
///
/// Routes are collected through an ordinary [`RouterBuilder`], so bundles may also apply
/// middleware to their own routes; that middleware travels with the routes when they
/// are injected. The route list itself is only readable from inside the crate.
///
/// # Examples
///
/// ```rust
/// use rttp_router::router::RoutesWrapper;
/// use rttp_router::{Context, Method, Response, Result, Router, StatusCode};
///
/// async fn pong(_ctx: Context) -> Result<Response> {
///     Ok(Response::new(StatusCode::Ok))
/// }
///
/// let health = RoutesWrapper::new()
///     .inject(|r| {
///         r.get("/ping", pong)?;
///         Ok(())
///     })
///     .unwrap();
///
/// let mut builder = Router::builder();
/// builder.inject_wrapper("/api", &health).unwrap();
/// let router = builder.finalize();
/// assert!(router.match_route(&Method::Get, "/api/ping").is_some());
/// ```
#[derive(Debug, Default)]
pub struct RoutesWrapper {
    router: RouterBuilder,
}

impl RoutesWrapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds routes through `setup`.
    ///
    /// # Errors
    ///
    /// Any registration error raised inside `setup`.
    pub fn inject<F>(mut self, setup: F) -> Result<Self>
    where
        F: FnOnce(&mut RouterBuilder) -> Result<()>,
    {
        self.router.register(setup)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.router.len()
    }

    pub fn is_empty(&self) -> bool {
        self.router.is_empty()
    }

    pub(crate) fn routes(&self) -> &[Route] {
        self.router.routes()
    }
}
