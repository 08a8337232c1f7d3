//! Crate-wide error type for route registration and request dispatch.
//!
//! Registration-time variants ([`Error::InvalidPattern`], [`Error::TypeMismatch`]) are
//! meant to abort server setup before any traffic is accepted. Request-time variants
//! ([`Error::DoubleNext`], [`Error::Handler`]) travel back out of [`Router::route`] to the
//! transport, which turns them into a `500 Internal Server Error`.
//!
//! "No route matched" is not an error: [`Router::match_route`] returns `None` and
//! [`Router::route`] answers `404 Not Found`.
//!
//! [`Router::route`]: crate::router::Router::route
//! [`Router::match_route`]: crate::router::Router::match_route

use thiserror::Error;

/// Boxed error produced by user handlers and middleware.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while registering routes or dispatching a request.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid route pattern {pattern:?}: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },

    #[error("{operation}: {reason}")]
    TypeMismatch {
        operation: &'static str,
        reason: String,
    },

    #[error("next() called multiple times (middleware index {index})")]
    DoubleNext { index: usize },

    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),
}

impl Error {
    /// Wraps an arbitrary handler failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use rttp_router::Error;
    ///
    /// let err = Error::handler("database unavailable");
    /// assert_eq!(err.to_string(), "handler failed: database unavailable");
    /// ```
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    pub(crate) fn invalid_pattern(pattern: &str, reason: &'static str) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_owned(),
            reason,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
