use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::context::Context;
use crate::error::Result;
use crate::middleware::{Middleware, Next};
use crate::router::BoxFuture;
use crate::{Method, Response, StatusCode};

/// CORS middleware — answers preflight requests and adds `Access-Control-*` headers
/// to actual responses.
///
/// Constructed via [`CorsMiddleware::new`] and further configured through the
/// builder methods [`allow_origin`](Self::allow_origin),
/// [`allow_method`](Self::allow_method), [`allow_header`](Self::allow_header) and
/// [`allow_credentials`](Self::allow_credentials).
///
/// # Behavior
///
/// - `OPTIONS` requests are short-circuited with `204 No Content`; the downstream
///   handler is **not** called.
/// - Other requests run downstream and get the CORS headers set on the response.
/// - With no configured origins every origin is allowed and
///   `Access-Control-Allow-Origin: *` is sent. Otherwise the request's `Origin` is
///   echoed back when it is on the list, together with `Vary: Origin`; requests from
///   other origins get no CORS headers at all.
///
/// # Examples
///
/// ```rust
/// use rttp_router::security::CorsMiddleware;
///
/// let cors = CorsMiddleware::new()
///     .allow_origin("https://example.com")
///     .allow_header("X-Custom-Header")
///     .allow_credentials();
/// ```
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    allowed_origins: Vec<String>,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    credentials: bool,
    max_age: Option<u64>,
    warned_wildcard: Arc<AtomicBool>,
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl CorsMiddleware {
    /// Creates a permissive policy:
    ///
    /// | Setting          | Default value                                  |
    /// |------------------|------------------------------------------------|
    /// | Allowed origins  | `*` (all origins)                              |
    /// | Allowed methods  | `GET`, `POST`, `PUT`, `PATCH`, `DELETE`, `OPTIONS` |
    /// | Allowed headers  | `Content-Type`                                 |
    /// | Credentials      | not allowed                                    |
    pub fn new() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .map(str::to_owned)
                .to_vec(),
            allowed_headers: vec!["Content-Type".to_owned()],
            credentials: false,
            max_age: None,
            warned_wildcard: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Restricts the policy to the given origins; call repeatedly to allow several.
    /// `"*"` keeps every origin allowed.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    /// Adds a method to `Access-Control-Allow-Methods` if it is not listed yet.
    #[must_use]
    pub fn allow_method(mut self, method: impl Into<String>) -> Self {
        let method = method.into();
        if !self.allowed_methods.iter().any(|m| m.eq_ignore_ascii_case(&method)) {
            self.allowed_methods.push(method);
        }
        self
    }

    /// Adds a request header to `Access-Control-Allow-Headers`.
    #[must_use]
    pub fn allow_header(mut self, header: impl Into<String>) -> Self {
        self.allowed_headers.push(header.into());
        self
    }

    /// Sends `Access-Control-Allow-Credentials: true`.
    ///
    /// Browsers ignore credentials for the `*` origin, so list exact origins as well.
    #[must_use]
    pub fn allow_credentials(mut self) -> Self {
        self.credentials = true;
        self
    }

    /// Sends `Access-Control-Max-Age` on preflight responses.
    #[must_use]
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    fn is_wildcard(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }

    // The `Access-Control-Allow-Origin` value for a request, or `None` if it is not allowed.
    fn resolve_origin(&self, request_origin: Option<&str>) -> Option<String> {
        if self.is_wildcard() {
            return Some("*".to_owned());
        }
        request_origin
            .filter(|origin| self.allowed_origins.iter().any(|o| o == origin))
            .map(str::to_owned)
    }

    fn apply(&self, response: &mut Response, allow_origin: &str) {
        response.set_header("Access-Control-Allow-Origin", allow_origin);
        response.set_header("Access-Control-Allow-Methods", self.allowed_methods.join(","));
        response.set_header("Access-Control-Allow-Headers", self.allowed_headers.join(","));
        if self.credentials {
            response.set_header("Access-Control-Allow-Credentials", "true");
            if allow_origin == "*" && !self.warned_wildcard.swap(true, Ordering::Relaxed) {
                warn!(
                    "CORS credentials are enabled with the '*' origin; list exact origins instead"
                );
            }
        }
        if allow_origin != "*" {
            response.set_header("Vary", "Origin");
        }
    }
}

impl Middleware for CorsMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> BoxFuture<Result<Response>> {
        let allow_origin = self.resolve_origin(ctx.request().headers().get("origin"));
        let is_preflight = ctx.request().method() == &Method::Options;

        let policy = self.clone();

        Box::pin(async move {
            if is_preflight {
                let mut response = Response::new(StatusCode::NoContent);
                if let Some(origin) = &allow_origin {
                    policy.apply(&mut response, origin);
                    if let Some(max_age) = policy.max_age {
                        response.set_header("Access-Control-Max-Age", max_age.to_string());
                    }
                }
                return Ok(response);
            }

            let mut response = next.run(ctx).await?;
            if let Some(origin) = &allow_origin {
                policy.apply(&mut response, origin);
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::Request;
    use crate::middleware::{compose, from_middleware};
    use crate::router::Handler;

    fn with_cors(cors: CorsMiddleware, hits: Arc<AtomicUsize>) -> Handler {
        let terminal: Handler = Arc::new(move |_ctx: Context| -> BoxFuture<Result<Response>> {
            hits.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(Response::new(StatusCode::Ok).body("ok")) })
        });
        compose(vec![from_middleware(cors)], terminal)
    }

    fn request(method: Method, origin: Option<&str>) -> Context {
        let mut req = Request::new(method, "/");
        if let Some(origin) = origin {
            req = req.with_header("Origin", origin);
        }
        Context::new(req)
    }

    #[tokio::test]
    async fn preflight_short_circuits_with_defaults() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = with_cors(CorsMiddleware::new(), Arc::clone(&hits));

        let res = handler(request(Method::Options, Some("https://a.example"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::NoContent);
        assert_eq!(res.headers().get("access-control-allow-origin"), Some("*"));
        assert_eq!(
            res.headers().get("access-control-allow-methods"),
            Some("GET,POST,PUT,PATCH,DELETE,OPTIONS")
        );
        assert_eq!(res.headers().get("access-control-allow-headers"), Some("Content-Type"));
        assert!(!res.headers().contains("vary"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn actual_request_gets_headers_after_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = with_cors(CorsMiddleware::new(), Arc::clone(&hits));

        let res = handler(request(Method::Get, None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.content(), b"ok");
        assert_eq!(res.headers().get("access-control-allow-origin"), Some("*"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn listed_origin_is_echoed_with_vary() {
        let cors = CorsMiddleware::new()
            .allow_origin("https://a.example")
            .allow_credentials()
            .max_age(600);
        let handler = with_cors(cors, Arc::new(AtomicUsize::new(0)));

        let res = handler(request(Method::Options, Some("https://a.example"))).await.unwrap();
        assert_eq!(res.headers().get("access-control-allow-origin"), Some("https://a.example"));
        assert_eq!(res.headers().get("access-control-allow-credentials"), Some("true"));
        assert_eq!(res.headers().get("access-control-max-age"), Some("600"));
        assert_eq!(res.headers().get("vary"), Some("Origin"));
    }

    #[tokio::test]
    async fn unlisted_origin_gets_no_cors_headers() {
        let hits = Arc::new(AtomicUsize::new(0));
        let cors = CorsMiddleware::new().allow_origin("https://a.example");
        let handler = with_cors(cors, Arc::clone(&hits));

        let res = handler(request(Method::Get, Some("https://evil.example"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::Ok);
        assert!(!res.headers().contains("access-control-allow-origin"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let res = handler(request(Method::Options, Some("https://evil.example"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::NoContent);
        assert!(!res.headers().contains("access-control-allow-origin"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn allow_method_skips_duplicates() {
        let cors = CorsMiddleware::new().allow_method("get").allow_method("PURGE");
        assert_eq!(cors.allowed_methods.len(), 7);
        assert_eq!(cors.allowed_methods.last().map(String::as_str), Some("PURGE"));
    }
}
