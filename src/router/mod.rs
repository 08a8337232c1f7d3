//! Request routing — map URL patterns and HTTP methods to handler functions.
//!
//! Routing happens in two phases. A [`RouterBuilder`] collects routes, WebSocket markers
//! and middleware while the application is being set up; [`RouterBuilder::finalize`]
//! consumes it, orders the routes once, and yields a read-only [`Router`] that is shared
//! by every connection.
//!
//! | Pattern              | Example match              | Captured params                 |
//! |----------------------|----------------------------|---------------------------------|
//! | `/users`             | `/users`                   | *(none)*                        |
//! | `/users/[id]`        | `/users/42`                | `id → "42"`                     |
//! | `/files/[...path]`   | `/files/docs/readme.txt`   | `path → ["docs", "readme.txt"]` |
//!
//! Empty path components are ignored on both patterns and request paths, so `/a//b/`
//! matches `/a/b`. Static routes are served from a hash index keyed by the literal path
//! as registered; everything else is matched by scanning routes in priority order
//! (static before dynamic, then fewer segments first, then registration order).

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::request::split_target;
use crate::middleware::{Middleware, MiddlewareHandler, compose, from_middleware};
use crate::{Method, Request, Response, StatusCode};

mod matcher;
mod pattern;
mod table;
mod wrapper;

pub use matcher::{RouteMatch, match_segments};
pub use pattern::{Pattern, Segment, tokenize};
pub use table::Route;
pub use wrapper::RoutesWrapper;

use table::RouteTable;

/// A boxed, `Send` future as returned by handlers and middleware.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Type-erased, heap-allocated async handler that processes a [`Context`] and returns a
/// [`Response`].
///
/// Handlers are stored behind `Arc<dyn Fn(…)>` so they can be cloned and shared across
/// threads without copying the underlying closure. In practice you never construct this
/// type directly — use [`RouterBuilder::get`], [`RouterBuilder::post`], and the other
/// method-specific helpers instead.
pub type Handler = Arc<dyn Fn(Context) -> BoxFuture<Result<Response>> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = Result<Response>> + Send` that is also
/// `Send + Sync + 'static` implements this trait automatically via the blanket impl
/// below. Registration methods accept `impl IntoHandler` so the two-type-parameter
/// where-bound does not need to be repeated at every call site.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> BoxFuture<Result<Response>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Result<Response>> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture<Result<Response>> {
        Box::pin((self)(ctx))
    }
}

/// Erases the concrete handler type into a [`Handler`].
pub fn into_handler(handler: impl IntoHandler) -> Handler {
    Arc::new(move |ctx: Context| handler.call(ctx))
}

/// The registration phase of a router.
///
/// Every mutating call validates its input immediately and returns
/// `Result<&mut Self>`, so setup code fails fast and chains with `?`.
///
/// # Examples
///
/// ```rust
/// use rttp_router::{Context, Response, Result, RouterBuilder, StatusCode};
///
/// async fn show_user(ctx: Context) -> Result<Response> {
///     let id = ctx.params().get("id").unwrap_or_default().to_owned();
///     Ok(Response::new(StatusCode::Ok).body(id))
/// }
///
/// # fn main() -> Result<()> {
/// let mut builder = RouterBuilder::new();
/// builder.get("/users/[id]", show_user)?.switch_to_ws("/chat")?;
///
/// let router = builder.finalize();
/// assert_eq!(router.len(), 1);
/// assert!(router.is_websocket_route("/chat"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct RouterBuilder {
    table: RouteTable,
    ws_routes: HashSet<String>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` requests matching `pattern`.
    ///
    /// # Errors
    ///
    /// - [`Error::TypeMismatch`] if `method` is not one of GET, POST, PUT, DELETE,
    ///   PATCH, OPTIONS.
    /// - [`Error::InvalidPattern`] if `pattern` does not compile.
    pub fn add_handler(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl IntoHandler,
    ) -> Result<&mut Self> {
        self.add_route(method, pattern, into_handler(handler))
    }

    pub fn get(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<&mut Self> {
        self.add_handler(Method::Get, pattern, handler)
    }

    pub fn post(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<&mut Self> {
        self.add_handler(Method::Post, pattern, handler)
    }

    pub fn put(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<&mut Self> {
        self.add_handler(Method::Put, pattern, handler)
    }

    pub fn delete(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<&mut Self> {
        self.add_handler(Method::Delete, pattern, handler)
    }

    pub fn patch(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<&mut Self> {
        self.add_handler(Method::Patch, pattern, handler)
    }

    pub fn options(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<&mut Self> {
        self.add_handler(Method::Options, pattern, handler)
    }

    fn add_route(&mut self, method: Method, pattern: &str, handler: Handler) -> Result<&mut Self> {
        if !method.is_routable() {
            return Err(Error::TypeMismatch {
                operation: "add_handler",
                reason: format!("method {method} cannot be routed"),
            });
        }
        let pattern = Pattern::parse(pattern)?;
        debug!(%method, pattern = pattern.as_str(), "route registered");
        self.table.register(Route::new(method, pattern, handler));
        Ok(self)
    }

    /// Marks `path` as a WebSocket endpoint. The transport checks this before HTTP
    /// matching; the path is compared verbatim.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPattern`] if `path` does not start with `/`.
    pub fn switch_to_ws(&mut self, path: &str) -> Result<&mut Self> {
        if !path.starts_with('/') {
            return Err(Error::invalid_pattern(path, "must start with '/'"));
        }
        debug!(path, "websocket route marked");
        self.ws_routes.insert(path.to_owned());
        Ok(self)
    }

    /// Wraps one middleware around the routes registered so far under `base`, or around
    /// every route when `apply_to_all` is set.
    ///
    /// A route is under `base` when its normalized path (`/users/[id]`) starts with `base`.
    /// Routes registered after this call are not wrapped.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPattern`] if `base` does not start with `/`.
    pub fn middleware(
        &mut self,
        base: &str,
        middleware: impl Middleware,
        apply_to_all: bool,
    ) -> Result<&mut Self> {
        self.middleware_chain(base, vec![from_middleware(middleware)], apply_to_all)
    }

    /// Like [`middleware`](Self::middleware) with an ordered chain; the first element is
    /// the outermost layer. Successive calls stack, the latest call outermost.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPattern`] if `base` does not start with `/`.
    /// - [`Error::TypeMismatch`] if `chain` is empty.
    pub fn middleware_chain(
        &mut self,
        base: &str,
        chain: Vec<MiddlewareHandler>,
        apply_to_all: bool,
    ) -> Result<&mut Self> {
        if !base.starts_with('/') {
            return Err(Error::invalid_pattern(base, "base path must start with '/'"));
        }
        if chain.is_empty() {
            return Err(Error::TypeMismatch {
                operation: "middleware_chain",
                reason: "expected at least one middleware".to_owned(),
            });
        }

        let mut wrapped = 0usize;
        for route in self.table.routes_mut() {
            if apply_to_all || route.path().starts_with(base) {
                let handler = compose(chain.clone(), Arc::clone(route.handler()));
                route.set_handler(handler);
                wrapped += 1;
            }
        }
        debug!(base, apply_to_all, layers = chain.len(), wrapped, "middleware applied");
        Ok(self)
    }

    /// Re-registers every route of `wrapper` under `base`, in the bundle's registration
    /// order. `/ping` injected at `/api` (or `/api/`) becomes `/api/ping`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPattern`] if `base` does not start with `/`.
    pub fn inject_wrapper(&mut self, base: &str, wrapper: &RoutesWrapper) -> Result<&mut Self> {
        if !base.starts_with('/') {
            return Err(Error::invalid_pattern(base, "base path must start with '/'"));
        }
        let prefix = base.strip_suffix('/').unwrap_or(base);

        for route in wrapper.routes() {
            let path = route.path();
            let rest = path.strip_prefix('/').unwrap_or(path.as_str());
            let joined = match (prefix.is_empty(), rest.is_empty()) {
                (true, true) => "/".to_owned(),
                (false, true) => prefix.to_owned(),
                _ => format!("{prefix}/{rest}"),
            };
            self.add_route(route.method().clone(), &joined, Arc::clone(route.handler()))?;
        }
        debug!(base, routes = wrapper.routes().len(), "route bundle injected");
        Ok(self)
    }

    /// Runs a setup callback against this builder.
    ///
    /// ```rust
    /// use rttp_router::{Context, Response, Result, RouterBuilder, StatusCode};
    ///
    /// async fn index(_ctx: Context) -> Result<Response> {
    ///     Ok(Response::new(StatusCode::Ok))
    /// }
    ///
    /// let mut builder = RouterBuilder::new();
    /// builder
    ///     .register(|r| {
    ///         r.get("/", index)?;
    ///         Ok(())
    ///     })
    ///     .unwrap();
    /// assert_eq!(builder.len(), 1);
    /// ```
    pub fn register<F>(&mut self, setup: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        setup(self)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    pub(crate) fn routes(&self) -> &[Route] {
        self.table.routes()
    }

    /// Orders the routes for matching and ends registration.
    pub fn finalize(mut self) -> Router {
        self.table.prioritize();
        info!(
            routes = self.table.len(),
            static_routes = self.table.static_count(),
            websocket_routes = self.ws_routes.len(),
            "router finalized"
        );
        Router {
            table: self.table,
            ws_routes: self.ws_routes,
        }
    }
}

/// A finalized, read-only router.
///
/// Built with [`RouterBuilder::finalize`]; typically wrapped in an `Arc` and shared by
/// every connection task. When no route matches, [`route`](Self::route) answers
/// `404 Not Found`.
///
/// # Examples
///
/// ```rust
/// use rttp_router::{Context, Method, Response, Result, Router, StatusCode};
///
/// async fn download(_ctx: Context) -> Result<Response> {
///     Ok(Response::new(StatusCode::Ok))
/// }
///
/// # fn main() -> Result<()> {
/// let mut builder = Router::builder();
/// builder.get("/files/[...path]", download)?;
/// let router = builder.finalize();
///
/// let found = router.match_route(&Method::Get, "/files/a/b").unwrap();
/// assert_eq!(found.params().get_all("path").unwrap(), ["a", "b"]);
/// assert!(router.match_route(&Method::Get, "/missing").is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Router {
    table: RouteTable,
    ws_routes: HashSet<String>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// `true` if `path` was marked with [`RouterBuilder::switch_to_ws`].
    pub fn is_websocket_route(&self, path: &str) -> bool {
        self.ws_routes.contains(path)
    }

    /// Resolves `method` and `path` to a route and its params, or `None`.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        matcher::find(&self.table, method, path)
    }

    /// Like [`match_route`](Self::match_route) for a raw request target: an
    /// absolute URL or a path, with or without a query string.
    pub fn match_url(&self, method: &Method, target: &str) -> Option<RouteMatch<'_>> {
        let (path, _query) = split_target(target);
        self.match_route(method, path)
    }

    /// Dispatches `request` to the matching route's handler.
    ///
    /// # Errors
    ///
    /// Whatever the handler or its middleware return, for example
    /// [`Error::DoubleNext`] or [`Error::Handler`]. A missing route is not an error.
    pub async fn route(&self, request: Request) -> Result<Response> {
        let Some(found) = self.match_route(request.method(), request.path()) else {
            debug!(method = %request.method(), path = request.path(), "no route matched");
            return Ok(Response::new(StatusCode::NotFound).body("Not Found"));
        };
        let (route, params) = found.into_parts();
        (route.handler())(Context::with_params(request, params)).await
    }

    /// Routes in match order.
    pub fn routes(&self) -> &[Route] {
        self.table.routes()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Drops every route, the static index and the WebSocket markers.
    pub fn cleanup(&mut self) {
        self.table.clear();
        self.ws_routes.clear();
        info!("router cleared");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::middleware::Next;

    async fn ok(_ctx: Context) -> Result<Response> {
        Ok(Response::new(StatusCode::Ok))
    }

    async fn echo_id(ctx: Context) -> Result<Response> {
        let id = ctx.params().get("id").unwrap_or("-").to_owned();
        Ok(Response::new(StatusCode::Ok).body(id))
    }

    pub(crate) fn noop() -> Handler {
        into_handler(ok)
    }

    fn tagged(tag: &'static str) -> impl IntoHandler {
        move |_ctx: Context| async move { Ok::<_, Error>(Response::new(StatusCode::Ok).body(tag)) }
    }

    fn layer(tag: &'static str) -> impl Middleware {
        move |ctx: Context, next: Next| async move {
            let response = next.run(ctx).await?;
            Ok::<_, Error>(response.header("X-Layer", tag))
        }
    }

    fn get(path: &str) -> Request {
        Request::new(Method::Get, path)
    }

    fn text(response: &Response) -> &str {
        std::str::from_utf8(response.content()).unwrap()
    }

    fn layers(response: &Response) -> Vec<&str> {
        response.headers().get_all("X-Layer").collect()
    }

    #[test]
    fn starts_empty() {
        let builder = RouterBuilder::new();
        assert!(builder.is_empty());
        let router = builder.finalize();
        assert!(router.is_empty());
        assert_eq!(router.len(), 0);
    }

    #[test]
    fn rejects_unroutable_methods() {
        let mut builder = RouterBuilder::new();
        let err = builder.add_handler(Method::Head, "/", ok).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        let err = builder
            .add_handler(Method::Custom("PURGE".into()), "/", ok)
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(builder.is_empty());
    }

    #[test]
    fn rejects_invalid_patterns() {
        let mut builder = RouterBuilder::new();
        assert!(matches!(
            builder.get("users", ok).unwrap_err(),
            Error::InvalidPattern { .. }
        ));
        assert!(matches!(
            builder.get("/a/[...rest]/b", ok).unwrap_err(),
            Error::InvalidPattern { .. }
        ));
        assert!(matches!(
            builder.switch_to_ws("chat").unwrap_err(),
            Error::InvalidPattern { .. }
        ));
        assert!(builder.is_empty());
    }

    #[test]
    fn scenario_root_users_files() {
        let mut builder = Router::builder();
        builder
            .get("/", ok)
            .unwrap()
            .get("/users/[id]", ok)
            .unwrap()
            .get("/files/[...path]", ok)
            .unwrap();
        let router = builder.finalize();

        let found = router.match_route(&Method::Get, "/users/42").unwrap();
        assert_eq!(found.route().pattern().as_str(), "/users/[id]");
        assert_eq!(found.params().get("id"), Some("42"));
        assert_eq!(found.params().len(), 1);

        let found = router.match_route(&Method::Get, "/files/a/b/c").unwrap();
        assert_eq!(found.params().get_all("path").unwrap(), ["a", "b", "c"]);

        let found = router.match_route(&Method::Get, "/").unwrap();
        assert!(found.params().is_empty());

        assert!(router.match_route(&Method::Get, "/missing").is_none());
    }

    #[test]
    fn literal_wins_regardless_of_registration_order() {
        let mut builder = Router::builder();
        builder.get("/a/[id]", ok).unwrap().get("/a/literal", ok).unwrap();
        let router = builder.finalize();

        let found = router.match_route(&Method::Get, "/a/literal").unwrap();
        assert_eq!(found.route().pattern().as_str(), "/a/literal");
        assert!(found.params().is_empty());
    }

    #[test]
    fn static_route_survives_catch_all_registered_first() {
        let mut builder = Router::builder();
        builder.get("/[...all]", ok).unwrap().get("/health", ok).unwrap();
        let router = builder.finalize();

        assert_eq!(router.routes()[0].pattern().as_str(), "/health");
        let found = router.match_route(&Method::Get, "/health").unwrap();
        assert!(found.route().is_static());
    }

    #[test]
    fn finalize_keeps_registration_order_for_ties() {
        let mut builder = Router::builder();
        builder
            .get("/x/[a]", ok)
            .unwrap()
            .get("/y/[b]", ok)
            .unwrap()
            .get("/z/[...c]", ok)
            .unwrap();
        let router = builder.finalize();
        let order: Vec<String> = router.routes().iter().map(Route::path).collect();
        assert_eq!(order, ["/x/[a]", "/y/[b]", "/z/[...c]"]);
    }

    #[test]
    fn match_url_accepts_absolute_targets() {
        let mut builder = Router::builder();
        builder.get("/users/[id]", ok).unwrap();
        let router = builder.finalize();

        let found = router
            .match_url(&Method::Get, "http://localhost:3000/users/7?full=1")
            .unwrap();
        assert_eq!(found.params().get("id"), Some("7"));
        assert!(router.match_url(&Method::Get, "/users/7?x=/y").is_some());
    }

    #[tokio::test]
    async fn route_dispatches_with_params() {
        let mut builder = Router::builder();
        builder.get("/users/[id]", echo_id).unwrap();
        let router = builder.finalize();

        let res = router.route(get("/users/42")).await.unwrap();
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(text(&res), "42");
    }

    #[tokio::test]
    async fn route_answers_404_when_nothing_matches() {
        let mut builder = Router::builder();
        builder.post("/users", ok).unwrap();
        let router = builder.finalize();

        let res = router.route(get("/users")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NotFound);
        assert_eq!(text(&res), "Not Found");
    }

    #[tokio::test]
    async fn every_routable_method_dispatches() {
        let mut builder = Router::builder();
        builder
            .get("/r", tagged("get"))
            .unwrap()
            .post("/r", tagged("post"))
            .unwrap()
            .put("/r", tagged("put"))
            .unwrap()
            .delete("/r", tagged("delete"))
            .unwrap()
            .patch("/r", tagged("patch"))
            .unwrap()
            .options("/r", tagged("options"))
            .unwrap();
        let router = builder.finalize();
        assert_eq!(router.len(), 6);

        for method in Method::ROUTABLE {
            let expected = method.as_str().to_ascii_lowercase();
            let res = router.route(Request::new(method, "/r")).await.unwrap();
            assert_eq!(text(&res), expected);
        }
    }

    #[test]
    fn inject_wrapper_prefixes_bundle_routes() {
        let bundle = RoutesWrapper::new()
            .inject(|r| {
                r.get("/ping", ok)?.get("/users/[id]", ok)?;
                Ok(())
            })
            .unwrap();

        let mut builder = Router::builder();
        builder.inject_wrapper("/api", &bundle).unwrap();
        builder.inject_wrapper("/v2/", &bundle).unwrap();
        builder.inject_wrapper("/", &bundle).unwrap();
        let router = builder.finalize();

        assert!(router.match_route(&Method::Get, "/api/ping").is_some());
        assert!(router.match_route(&Method::Get, "/v2/ping").is_some());
        assert!(router.match_route(&Method::Get, "/ping").is_some());
        let found = router.match_route(&Method::Get, "/api/users/9").unwrap();
        assert_eq!(found.params().get("id"), Some("9"));
    }

    #[tokio::test]
    async fn injected_routes_keep_bundle_middleware() {
        let bundle = RoutesWrapper::new()
            .inject(|r| {
                r.get("/ping", ok)?.middleware("/", layer("bundle"), true)?;
                Ok(())
            })
            .unwrap();

        let mut builder = Router::builder();
        builder.inject_wrapper("/api", &bundle).unwrap();
        let router = builder.finalize();

        let res = router.route(get("/api/ping")).await.unwrap();
        assert_eq!(layers(&res), ["bundle"]);
    }

    #[test]
    fn websocket_markers_are_exact() {
        let mut builder = Router::builder();
        builder.switch_to_ws("/chat").unwrap();
        let router = builder.finalize();

        assert!(router.is_websocket_route("/chat"));
        assert!(!router.is_websocket_route("/chat/"));
        assert!(!router.is_websocket_route("/other"));
        assert!(router.match_route(&Method::Get, "/chat").is_none());
    }

    #[test]
    fn cleanup_clears_everything() {
        let mut builder = Router::builder();
        builder.get("/", ok).unwrap().get("/u/[id]", ok).unwrap();
        builder.switch_to_ws("/ws").unwrap();
        let mut router = builder.finalize();

        router.cleanup();
        assert!(router.is_empty());
        assert!(router.match_route(&Method::Get, "/").is_none());
        assert!(!router.is_websocket_route("/ws"));
    }

    #[tokio::test]
    async fn middleware_applies_by_prefix() {
        let mut builder = Router::builder();
        builder
            .get("/admin/users", ok)
            .unwrap()
            .get("/public", ok)
            .unwrap()
            .middleware("/admin", layer("admin"), false)
            .unwrap();
        let router = builder.finalize();

        let res = router.route(get("/admin/users")).await.unwrap();
        assert_eq!(layers(&res), ["admin"]);
        let res = router.route(get("/public")).await.unwrap();
        assert!(layers(&res).is_empty());
    }

    #[tokio::test]
    async fn prefix_is_a_plain_string_match() {
        let mut builder = Router::builder();
        builder
            .get("/administrator", ok)
            .unwrap()
            .middleware("/admin", layer("admin"), false)
            .unwrap();
        let router = builder.finalize();

        let res = router.route(get("/administrator")).await.unwrap();
        assert_eq!(layers(&res), ["admin"]);
    }

    #[tokio::test]
    async fn apply_to_all_ignores_base() {
        let mut builder = Router::builder();
        builder
            .get("/a", ok)
            .unwrap()
            .get("/b/[id]", ok)
            .unwrap()
            .middleware("/nothing", layer("all"), true)
            .unwrap();
        let router = builder.finalize();

        for path in ["/a", "/b/1"] {
            let res = router.route(get(path)).await.unwrap();
            assert_eq!(layers(&res), ["all"]);
        }
    }

    #[tokio::test]
    async fn middleware_only_wraps_existing_routes() {
        let mut builder = Router::builder();
        builder
            .get("/early", ok)
            .unwrap()
            .middleware("/", layer("m"), true)
            .unwrap()
            .get("/late", ok)
            .unwrap();
        let router = builder.finalize();

        let res = router.route(get("/early")).await.unwrap();
        assert_eq!(layers(&res), ["m"]);
        let res = router.route(get("/late")).await.unwrap();
        assert!(layers(&res).is_empty());
    }

    #[tokio::test]
    async fn later_registrations_are_outer_layers() {
        let mut builder = Router::builder();
        builder
            .get("/", ok)
            .unwrap()
            .middleware("/", layer("first"), false)
            .unwrap()
            .middleware_chain(
                "/",
                vec![from_middleware(layer("outer")), from_middleware(layer("inner"))],
                false,
            )
            .unwrap();
        let router = builder.finalize();

        // headers are appended on the way out, innermost first
        let res = router.route(get("/")).await.unwrap();
        assert_eq!(layers(&res), ["first", "inner", "outer"]);
    }

    #[test]
    fn middleware_registration_errors() {
        let mut builder = Router::builder();
        assert!(matches!(
            builder.middleware("admin", layer("x"), false).unwrap_err(),
            Error::InvalidPattern { .. }
        ));
        assert!(matches!(
            builder.middleware_chain("/", Vec::new(), true).unwrap_err(),
            Error::TypeMismatch { .. }
        ));
    }

    #[tokio::test]
    async fn double_next_reaches_the_caller() {
        let mut builder = Router::builder();
        builder
            .get("/", ok)
            .unwrap()
            .middleware(
                "/",
                |ctx: Context, next: Next| async move {
                    next.run(ctx.clone()).await?;
                    next.run(ctx).await
                },
                false,
            )
            .unwrap();
        let router = builder.finalize();

        let err = router.route(get("/")).await.unwrap_err();
        assert!(matches!(err, Error::DoubleNext { .. }));
    }

    #[test]
    fn register_runs_setup_callback() {
        let mut builder = Router::builder();
        builder
            .register(|r| {
                r.get("/a", ok)?;
                r.switch_to_ws("/ws")?;
                Ok(())
            })
            .unwrap();
        let err = builder.register(|r| {
            r.get("bad", ok)?;
            Ok(())
        });
        assert!(err.is_err());

        let router = builder.finalize();
        assert_eq!(router.len(), 1);
        assert!(router.is_websocket_route("/ws"));
    }
}
