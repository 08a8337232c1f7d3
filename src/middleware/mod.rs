//! Middleware pipeline — ordered interception in front of a route handler.
//!
//! [`compose`] turns an ordered list of middleware plus a terminal [`Handler`] into a
//! single [`Handler`]. Each middleware receives the [`Context`] and a [`Next`] cursor
//! and may:
//!
//! - **Pass through** — `next.run(ctx).await`.
//! - **Short-circuit** — return a [`Response`] without calling `next`; nothing further
//!   down the chain runs. Auth rejection, CORS preflight and payload limits work this way.
//! - **Decorate** — call `next`, then adjust the response on its way back.
//!
//! Each dispatch tracks the furthest chain position it has started. Calling
//! [`Next::run`] for a position at or before that one fails with
//! [`Error::DoubleNext`]: a middleware cannot resume the chain twice, nor resume a
//! chain that an inner middleware already advanced past. The tracker lives per
//! dispatch, so concurrent requests never share it.
//!
//! ## Built-in middleware
//!
//! - [`LoggerMiddleware`] — request/response logging through `tracing`.
//! - [`BodyLimit`] — `413 Payload Too Large` rejection.
//! - [`CorsMiddleware`](crate::security::CorsMiddleware) lives in [`security`](crate::security).

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::router::{BoxFuture, Handler};
use crate::Response;

mod body_limit;

pub use body_limit::BodyLimit;

/// The core trait for all middleware.
///
/// Implemented for structs by hand, and for any
/// `Fn(Context, Next) -> impl Future<Output = Result<Response>>` closure through the
/// blanket impl below.
///
/// # Contract
///
/// - Implementations **must** be `Send + Sync` because middleware is shared across
///   Tokio tasks.
/// - `handle` **must** return a `Send` future.
/// - [`Next::run`] may be called at most once per invocation.
pub trait Middleware: Send + Sync + 'static {
    /// Handle the request and optionally delegate to the rest of the chain.
    fn handle(&self, ctx: Context, next: Next) -> BoxFuture<Result<Response>>;
}

impl<T, F> Middleware for T
where
    T: Fn(Context, Next) -> F + Send + Sync + 'static,
    F: Future<Output = Result<Response>> + Send + 'static,
{
    fn handle(&self, ctx: Context, next: Next) -> BoxFuture<Result<Response>> {
        Box::pin((self)(ctx, next))
    }
}

/// A type-erased, reference-counted middleware.
pub type MiddlewareHandler = Arc<dyn Middleware>;

/// Erases a [`Middleware`] into a [`MiddlewareHandler`] for use in chains.
///
/// # Examples
///
/// ```rust,no_run
/// use rttp_router::context::Context;
/// use rttp_router::middleware::{LoggerMiddleware, Next, from_middleware};
///
/// let chain = vec![
///     from_middleware(LoggerMiddleware),
///     from_middleware(|ctx: Context, next: Next| async move { next.run(ctx).await }),
/// ];
/// ```
pub fn from_middleware<M: Middleware>(middleware: M) -> MiddlewareHandler {
    Arc::new(middleware)
}

struct Chain {
    middlewares: Vec<MiddlewareHandler>,
    terminal: Handler,
}

/// A cursor into the remaining middleware chain for a single request.
///
/// Passed to each middleware's [`Middleware::handle`]. [`run`](Self::run) dispatches
/// the next middleware, or the terminal handler once the middleware are exhausted.
pub struct Next {
    chain: Arc<Chain>,
    // Furthest position started by this dispatch, plus one.
    dispatched: Arc<AtomicUsize>,
    position: usize,
}

impl Next {
    /// Invokes the next step of the chain.
    ///
    /// # Errors
    ///
    /// The returned future resolves to [`Error::DoubleNext`] if this step, or a later
    /// one, has already been started for the current request. Errors from downstream
    /// middleware and the handler are passed through unchanged.
    pub fn run(&self, ctx: Context) -> BoxFuture<Result<Response>> {
        dispatch(&self.chain, &self.dispatched, self.position, ctx)
    }
}

fn dispatch(
    chain: &Arc<Chain>,
    dispatched: &Arc<AtomicUsize>,
    position: usize,
    ctx: Context,
) -> BoxFuture<Result<Response>> {
    let claimed = dispatched.fetch_update(Ordering::AcqRel, Ordering::Acquire, |started| {
        (position >= started).then_some(position + 1)
    });
    if claimed.is_err() {
        warn!(position, "middleware resumed the chain more than once");
        return Box::pin(std::future::ready(Err(Error::DoubleNext { index: position })));
    }

    match chain.middlewares.get(position) {
        Some(middleware) => {
            let next = Next {
                chain: Arc::clone(chain),
                dispatched: Arc::clone(dispatched),
                position: position + 1,
            };
            middleware.handle(ctx, next)
        }
        None => (chain.terminal)(ctx),
    }
}

/// Composes `middlewares` (outermost first) around `terminal` into one handler.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use rttp_router::context::Context;
/// use rttp_router::middleware::{LoggerMiddleware, compose, from_middleware};
/// use rttp_router::router::{BoxFuture, Handler};
/// use rttp_router::{Response, StatusCode};
///
/// let terminal: Handler = Arc::new(|_ctx: Context| -> BoxFuture<rttp_router::Result<Response>> {
///     Box::pin(async { Ok(Response::new(StatusCode::Ok)) })
/// });
/// let handler = compose(vec![from_middleware(LoggerMiddleware)], terminal);
/// ```
pub fn compose(middlewares: Vec<MiddlewareHandler>, terminal: Handler) -> Handler {
    let chain = Arc::new(Chain {
        middlewares,
        terminal,
    });
    Arc::new(move |ctx: Context| dispatch(&chain, &Arc::new(AtomicUsize::new(0)), 0, ctx))
}

/// Built-in middleware that logs each request's method, path, status, and duration.
///
/// Emits a single `tracing::info!` line after the downstream handler completes,
/// in the format:
///
/// ```text
/// METHOD /path - STATUS (duration)
/// ```
///
/// Failures are logged with `tracing::error!` and passed through untouched.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> BoxFuture<Result<Response>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().clone();
            let path = ctx.request().path().to_owned();

            let result = next.run(ctx).await;

            let duration = start.elapsed();
            match &result {
                Ok(response) if response.status().is_server_error() => {
                    warn!("{} {} - {} ({:?})", method, path, response.status().as_u16(), duration)
                }
                Ok(response) => {
                    info!("{} {} - {} ({:?})", method, path, response.status().as_u16(), duration)
                }
                Err(e) => error!(%method, %path, error = %e, "request failed after {:?}", duration),
            }

            result
        })
    }
}
