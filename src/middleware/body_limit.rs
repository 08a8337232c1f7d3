use std::str::FromStr;

use serde_json::json;
use tracing::debug;

use super::{Middleware, Next};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::router::BoxFuture;
use crate::{Response, StatusCode};

/// Rejects requests whose body is larger than a byte limit with `413 Payload Too Large`.
///
/// Both the declared `Content-Length` and the received body are checked; either one
/// exceeding the limit short-circuits the chain with `{"error":"Payload too large"}`.
///
/// # Examples
///
/// ```rust
/// use rttp_router::middleware::BodyLimit;
///
/// let limit: BodyLimit = "1mb".parse().unwrap();
/// assert_eq!(limit.bytes(), 1024 * 1024);
/// assert_eq!(BodyLimit::new(512).bytes(), 512);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimit {
    bytes: u64,
}

impl BodyLimit {
    pub fn new(bytes: u64) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    fn exceeded_by(&self, len: usize) -> bool {
        u64::try_from(len).map_or(true, |len| len > self.bytes)
    }
}

impl FromStr for BodyLimit {
    type Err = Error;

    /// Parses `<n>`, `<n>kb`, `<n>mb` or `<n>gb` (unit case-insensitive, 1 kb = 1024 bytes).
    fn from_str(limit: &str) -> Result<Self> {
        let mismatch = |reason: &str| Error::TypeMismatch {
            operation: "body limit",
            reason: format!("{reason}: {limit:?}"),
        };

        let split = limit
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(limit.len());
        let (digits, unit) = limit.split_at(split);
        if digits.is_empty() {
            return Err(mismatch("expected a byte count"));
        }

        let multiplier: u64 = match unit.to_ascii_lowercase().as_str() {
            "" => 1,
            "kb" => 1 << 10,
            "mb" => 1 << 20,
            "gb" => 1 << 30,
            _ => return Err(mismatch("unknown unit")),
        };

        digits
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(multiplier))
            .map(Self::new)
            .ok_or_else(|| mismatch("limit out of range"))
    }
}

impl Middleware for BodyLimit {
    fn handle(&self, ctx: Context, next: Next) -> BoxFuture<Result<Response>> {
        let limit = *self;
        Box::pin(async move {
            let request = ctx.request();
            let declared = request.content_length().unwrap_or(0);
            if limit.exceeded_by(declared) || limit.exceeded_by(request.body().len()) {
                debug!(
                    path = request.path(),
                    declared,
                    received = request.body().len(),
                    limit = limit.bytes,
                    "rejecting oversized body"
                );
                return Response::new(StatusCode::PayloadTooLarge)
                    .json(&json!({ "error": "Payload too large" }));
            }
            next.run(ctx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::middleware::{compose, from_middleware};
    use crate::router::Handler;
    use crate::{Method, Request};

    fn guarded(limit: BodyLimit, hits: Arc<AtomicUsize>) -> Handler {
        let terminal: Handler = Arc::new(move |_ctx: Context| -> BoxFuture<Result<Response>> {
            hits.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(Response::new(StatusCode::Ok)) })
        });
        compose(vec![from_middleware(limit)], terminal)
    }

    #[test]
    fn parses_units_case_insensitively() {
        assert_eq!("100".parse::<BodyLimit>().unwrap().bytes(), 100);
        assert_eq!("2kb".parse::<BodyLimit>().unwrap().bytes(), 2048);
        assert_eq!("1MB".parse::<BodyLimit>().unwrap().bytes(), 1 << 20);
        assert_eq!("3Gb".parse::<BodyLimit>().unwrap().bytes(), 3 << 30);
    }

    #[test]
    fn malformed_limits_are_type_mismatch() {
        for bad in ["", "mb", "1.5mb", "10 kb", "10tb", "-1"] {
            let err = bad.parse::<BodyLimit>().unwrap_err();
            assert!(matches!(err, Error::TypeMismatch { .. }), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn small_body_passes_through() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = guarded(BodyLimit::new(8), Arc::clone(&hits));
        let req = Request::new(Method::Post, "/")
            .with_header("Content-Length", "5")
            .with_body("hello");
        let res = handler(Context::new(req)).await.unwrap();
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn declared_length_over_limit_short_circuits() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = guarded(BodyLimit::new(4), Arc::clone(&hits));
        let req = Request::new(Method::Post, "/").with_header("Content-Length", "5");
        let res = handler(Context::new(req)).await.unwrap();
        assert_eq!(res.status(), StatusCode::PayloadTooLarge);
        assert_eq!(res.content(), br#"{"error":"Payload too large"}"#);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn actual_body_over_limit_short_circuits() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = guarded(BodyLimit::new(4), Arc::clone(&hits));
        let req = Request::new(Method::Post, "/").with_body("hello");
        let res = handler(Context::new(req)).await.unwrap();
        assert_eq!(res.status(), StatusCode::PayloadTooLarge);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
