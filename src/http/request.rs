//! HTTP/1.1 request parsing using the [`httparse`] crate.

use std::collections::HashMap;

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, Method};

/// Errors that can occur while parsing an HTTP/1.1 request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete — more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
}

/// An HTTP request as seen by routes and middleware.
///
/// Produced by [`Request::parse`] on the wire, or by [`Request::new`] when dispatching
/// in-process. The request target is split into path and query; absolute-form targets
/// (`http://host/path`) are reduced to their path.
///
/// # Examples
///
/// ```
/// use rttp_router::http::request::Request;
///
/// let raw = b"GET http://example.com/hello?name=world HTTP/1.1\r\nHost: example.com\r\n\r\n";
/// let (request, _offset) = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method().as_str(), "GET");
/// assert_eq!(request.path(), "/hello");
/// assert_eq!(request.query_param("name"), Some("world"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    /// HTTP minor version: 0 for HTTP/1.0, 1 for HTTP/1.1.
    version: u8,
    headers: Headers,
    query: Option<String>,
    query_params: HashMap<String, String>,
    body: Bytes,
}

impl Request {
    /// Maximum number of headers we support per request.
    const MAX_HEADERS: usize = 64;

    /// Builds an HTTP/1.1 request for `target` with no headers and an empty body.
    ///
    /// ```
    /// use rttp_router::{Method, Request};
    ///
    /// let req = Request::new(Method::Post, "/users?dry_run=1").with_body("{}");
    /// assert_eq!(req.path(), "/users");
    /// assert_eq!(req.query_param("dry_run"), Some("1"));
    /// assert_eq!(req.body().len(), 2);
    /// ```
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = split_target(target);
        let query_params = query.map(parse_query_string).unwrap_or_default();
        Self {
            method,
            path: path.to_owned(),
            version: 1,
            headers: Headers::new(),
            query: query.map(str::to_owned),
            query_params,
            body: Bytes::new(),
        }
    }

    /// Adds a header, keeping existing values.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Parse a raw HTTP/1.1 request from a byte slice.
    ///
    /// Returns the parsed `Request` and the byte offset at which the body begins
    /// in `buf` (i.e. immediately after the `\r\n\r\n` header terminator). Bytes after
    /// that offset, up to `Content-Length`, become the body.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`] — more data is needed to complete the request headers.
    /// - [`RequestError::Parse`] — the data is malformed and cannot be parsed.
    /// - [`RequestError::MissingField`] — a required field (method, path, version) is absent.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw_req = httparse::Request::new(&mut headers);

        let body_offset = match raw_req.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method: Method = match raw_req.method {
            Some(m) => match m.parse() {
                Ok(method) => method,
                Err(never) => match never {},
            },
            None => return Err(RequestError::MissingField { field: "method" }),
        };

        let target = raw_req
            .path
            .ok_or(RequestError::MissingField { field: "path" })?;

        let version = raw_req
            .version
            .ok_or(RequestError::MissingField { field: "version" })?;

        let mut request = Self::new(method, target);
        request.version = version;

        request.headers = Headers::with_capacity(raw_req.headers.len());
        for header in raw_req.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                request.headers.append(header.name, value);
            }
        }

        let available = &buf[body_offset..];
        let body_len = request
            .content_length()
            .map_or(available.len(), |len| len.min(available.len()));
        request.body = Bytes::copy_from_slice(&available[..body_len]);

        Ok((request, body_offset))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without scheme, authority or query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the HTTP minor version number (0 = HTTP/1.0, 1 = HTTP/1.1).
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the raw query string (without the leading `?`), if any.
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns a parsed query parameter value by key.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params.get(key).map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns `true` if the connection should be kept alive after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive. HTTP/1.0 defaults to close unless
    /// `Connection: keep-alive` is explicitly set.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(conn) => conn.eq_ignore_ascii_case("keep-alive"),
            None => self.version == 1,
        }
    }

    /// Returns the value of the `Content-Length` header parsed as a `usize`, if present.
    pub fn content_length(&self) -> Option<usize> {
        self.headers.get_parsed("content-length")
    }
}

/// Splits a request target into `(path, query)`.
///
/// Absolute-form targets lose their scheme and authority; a target with an authority
/// but no path maps to `/`. The query excludes the leading `?`.
///
/// ```
/// use rttp_router::http::request::split_target;
///
/// assert_eq!(split_target("/a/b?x=1"), ("/a/b", Some("x=1")));
/// assert_eq!(split_target("https://example.com:8443/a?"), ("/a", Some("")));
/// assert_eq!(split_target("http://example.com"), ("/", None));
/// ```
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    let without_authority = match target.find("://") {
        Some(scheme_end) if !target[..scheme_end].contains('/') => {
            let rest = &target[scheme_end + 3..];
            match rest.find(['/', '?']) {
                Some(i) => &rest[i..],
                None => "",
            }
        }
        _ => target,
    };

    let (path, query) = match without_authority.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_authority, None),
    };

    if path.is_empty() { ("/", query) } else { (path, query) }
}

/// Parses a URL query string (`key=value&key2=value2`) into a `HashMap`.
///
/// Keys and values have `+` decoded as a space; no percent-decoding is done.
fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key.replace('+', " "), value.replace('+', " "))
        })
        .collect()
}
