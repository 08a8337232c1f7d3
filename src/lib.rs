//! # rttp-router
//!
//! An async HTTP/1.1 request router: segment-based route patterns with named and
//! catch-all parameters, a static-route fast path, deterministic prioritization of
//! overlapping routes, and middleware chains with a single-use `next`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rttp_router::middleware::LoggerMiddleware;
//! use rttp_router::server::{Server, ServerConfig};
//! use rttp_router::{Context, Response, Result, Router, StatusCode};
//!
//! async fn hello(_ctx: Context) -> Result<Response> {
//!     Ok(Response::new(StatusCode::Ok).body("Hello, World!"))
//! }
//!
//! async fn show_file(ctx: Context) -> Result<Response> {
//!     let path = ctx.params().get_all("path").unwrap_or_default().join("/");
//!     Ok(Response::new(StatusCode::Ok).body(path))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut builder = Router::builder();
//!     builder
//!         .get("/", hello)?
//!         .get("/files/[...path]", show_file)?
//!         .middleware("/", LoggerMiddleware, true)?;
//!
//!     let server = Server::bind(ServerConfig::from_env()).await?;
//!     server.serve(builder.finalize()).await?;
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod error;
pub mod http;
pub mod middleware;
pub mod router;
pub mod security;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use context::{Context, Params};
pub use error::{Error, Result};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::{Router, RouterBuilder};
pub use server::{Server, ServerConfig, ServerError};
