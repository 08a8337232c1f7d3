//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and dispatches HTTP/1.1 requests to a finalized
//! [`Router`]. Supports HTTP/1.1 persistent connections (keep-alive) out of the box.
//!
//! Per request the server checks the router's WebSocket markers first; a marked path is
//! handed, together with the socket, to the callback registered with
//! [`Server::on_websocket`]. Everything else goes through [`Router::route`]; handler and
//! middleware failures become `500 Internal Server Error` and never affect other
//! connections.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::http::{
    StatusCode,
    request::{Request, RequestError},
    response::Response,
};
use crate::router::{BoxFuture, Router};

mod config;

pub use config::ServerConfig;

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// Receives WebSocket upgrade requests together with their connection.
pub type WebSocketHandler = Arc<dyn Fn(Request, TcpStream) -> BoxFuture<()> + Send + Sync>;

struct Shared {
    router: Router,
    websocket: Option<WebSocketHandler>,
    debug_routes: bool,
    max_request_size: usize,
}

/// The HTTP server.
///
/// # Examples
///
/// ```rust,no_run
/// use rttp_router::server::{Server, ServerConfig};
/// use rttp_router::{Context, Response, Router, StatusCode};
///
/// async fn hello(_ctx: Context) -> rttp_router::Result<Response> {
///     Ok(Response::new(StatusCode::Ok).body("Hello!"))
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut builder = Router::builder();
///     builder.get("/", hello)?;
///
///     let server = Server::bind(ServerConfig::from_env()).await?;
///     server.serve(builder.finalize()).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: ServerConfig,
    websocket: Option<WebSocketHandler>,
}

impl Server {
    /// Binds the server to `config.addr()`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind { addr, source: e })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            config,
            websocket: None,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Takes over connections whose request path is a WebSocket route.
    ///
    /// The callback owns the socket from then on and is responsible for the upgrade
    /// handshake. Without a callback, WebSocket routes are matched like any other path.
    #[must_use]
    pub fn on_websocket<H, F>(mut self, handler: H) -> Self
    where
        H: Fn(Request, TcpStream) -> F + Send + Sync + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let handler: WebSocketHandler =
            Arc::new(move |request: Request, stream: TcpStream| -> BoxFuture<()> {
                Box::pin(handler(request, stream))
            });
        self.websocket = Some(handler);
        self
    }

    /// Accepts connections and dispatches their requests to `router`.
    ///
    /// Runs until the process is terminated or an unrecoverable listener error occurs.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn serve(self, router: Router) -> Result<(), ServerError> {
        if self.config.debug_routes && self.config.is_production() {
            warn!("route debugging is enabled in production; every request will be logged");
        }
        info!(
            address = %self.local_addr,
            routes = router.len(),
            "rttp listening"
        );

        let shared = Arc::new(Shared {
            router,
            websocket: self.websocket,
            debug_routes: self.config.debug_routes,
            max_request_size: self.config.max_request_size,
        });

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let shared = Arc::clone(&shared);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, shared).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Handles a single TCP connection over its lifetime.
///
/// HTTP/1.1 connections are persistent by default: we loop, serving one request per
/// iteration, until the peer closes the connection or signals `Connection: close`.
/// Bytes already buffered are parsed before reading again, so pipelined requests are
/// answered in order without waiting on the peer.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    shared: Arc<Shared>,
) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let parsed = if buf.is_empty() {
            Err(RequestError::Incomplete)
        } else {
            Request::parse(&buf)
        };

        let (request, body_offset) = match parsed {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => {
                if buf.len() > shared.max_request_size {
                    warn!(peer = %peer_addr, "request too large, sending 413");
                    return reject_too_large(&mut stream).await;
                }
                if stream.read_buf(&mut buf).await? == 0 {
                    debug!(peer = %peer_addr, "connection closed by peer");
                    break;
                }
                continue;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                return reject_bad_request(&mut stream, &e.to_string()).await;
            }
        };

        let declared = match request.headers().get("content-length") {
            None => 0,
            Some(value) => match value.trim().parse::<usize>() {
                Ok(len) => len,
                Err(_) => {
                    warn!(peer = %peer_addr, value, "invalid Content-Length, sending 400");
                    return reject_bad_request(&mut stream, "invalid Content-Length").await;
                }
            },
        };

        let total_needed = match body_offset.checked_add(declared) {
            Some(total) if total <= shared.max_request_size => total,
            _ => {
                warn!(peer = %peer_addr, declared, "declared body too large, sending 413");
                return reject_too_large(&mut stream).await;
            }
        };

        // Wait for the full body to arrive.
        if buf.len() < total_needed {
            if stream.read_buf(&mut buf).await? == 0 {
                debug!(peer = %peer_addr, "connection closed mid-body");
                break;
            }
            continue;
        }

        if let Some(websocket) = &shared.websocket {
            if shared.router.is_websocket_route(request.path()) {
                debug!(
                    peer = %peer_addr,
                    path = request.path(),
                    "handing off websocket connection"
                );
                websocket(request, stream).await;
                return Ok(());
            }
        }

        let keep_alive = request.is_keep_alive();
        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let response = respond(&shared.router, request, shared.debug_routes).await;
        stream.write_all(&response.keep_alive(keep_alive).into_bytes()).await?;
        stream.flush().await?;

        buf.advance(total_needed);

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close, shutting down");
            break;
        }
    }

    Ok(())
}

async fn reject_too_large(stream: &mut TcpStream) -> Result<(), std::io::Error> {
    let response = Response::new(StatusCode::PayloadTooLarge)
        .body("Request entity too large")
        .keep_alive(false);
    stream.write_all(&response.into_bytes()).await
}

async fn reject_bad_request(stream: &mut TcpStream, reason: &str) -> Result<(), std::io::Error> {
    let response = Response::new(StatusCode::BadRequest)
        .body(format!("Bad Request: {reason}"))
        .keep_alive(false);
    stream.write_all(&response.into_bytes()).await
}

/// Routes one request, turning dispatch failures into `500 Internal Server Error`.
async fn respond(router: &Router, request: Request, debug_routes: bool) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.path().to_owned();

    let response = match router.route(request).await {
        Ok(response) => response,
        Err(e) => {
            error!(%method, %path, error = %e, "request failed");
            Response::new(StatusCode::InternalServerError).body("Internal Server Error")
        }
    };

    if debug_routes {
        info!(
            "{} {} {} ({:?})",
            method,
            path,
            response.status().as_u16(),
            start.elapsed()
        );
    }
    response
}
