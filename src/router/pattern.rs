//! Route pattern compilation.
//!
//! A pattern is split on `/` into segments, dropping empty components, so `/a//b` and
//! `/a/b` compile identically. Each segment is one of:
//!
//! | Segment      | Meaning                                           |
//! |--------------|---------------------------------------------------|
//! | `users`      | literal, compared byte-for-byte                   |
//! | `[id]`       | single-segment parameter named `id`               |
//! | `[...rest]`  | catch-all binding `rest` to the remaining segments |
//!
//! Compilation happens once per route at registration time, never per request.

use crate::error::{Error, Result};

/// A single compiled path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    CatchAll(String),
}

impl Segment {
    fn parse(raw: &str, pattern: &str) -> Result<Self> {
        let Some(inner) = raw.strip_prefix('[') else {
            if raw.contains('[') || raw.contains(']') {
                return Err(Error::invalid_pattern(pattern, "unbalanced '[' or ']' in segment"));
            }
            return Ok(Self::Literal(raw.to_owned()));
        };

        let inner = inner
            .strip_suffix(']')
            .ok_or_else(|| Error::invalid_pattern(pattern, "parameter segment is missing ']'"))?;

        let (name, catch_all) = match inner.strip_prefix("...") {
            Some(name) => (name, true),
            None => (inner, false),
        };

        if name.is_empty() {
            return Err(Error::invalid_pattern(pattern, "parameter name is empty"));
        }
        if name.contains(['[', ']', '/']) {
            return Err(Error::invalid_pattern(pattern, "parameter name contains '[', ']' or '/'"));
        }

        Ok(if catch_all {
            Self::CatchAll(name.to_owned())
        } else {
            Self::Param(name.to_owned())
        })
    }

    /// Returns the parameter name, or `None` for literal segments.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::Param(name) | Self::CatchAll(name) => Some(name),
        }
    }
}

/// A compiled route pattern.
///
/// # Examples
///
/// ```
/// use rttp_router::router::{Pattern, Segment};
///
/// let pattern = Pattern::parse("/files/[owner]/[...path]").unwrap();
/// assert_eq!(pattern.param_names(), ["owner", "path"]);
/// assert!(!pattern.is_static());
/// assert_eq!(pattern.segments()[0], Segment::Literal("files".into()));
/// ```
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
    param_names: Vec<String>,
}

impl Pattern {
    /// Compiles `pattern` into segments.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPattern`] when the pattern does not start with `/`, a parameter
    /// segment is malformed, or a catch-all is repeated or not the last segment.
    pub fn parse(pattern: &str) -> Result<Self> {
        if !pattern.starts_with('/') {
            return Err(Error::invalid_pattern(pattern, "pattern must start with '/'"));
        }

        let segments = tokenize(pattern)
            .map(|raw| Segment::parse(raw, pattern))
            .collect::<Result<Vec<_>>>()?;

        if let Some(pos) = segments.iter().position(|s| matches!(s, Segment::CatchAll(_))) {
            if pos + 1 != segments.len() {
                return Err(Error::invalid_pattern(
                    pattern,
                    "catch-all must be the last segment",
                ));
            }
        }

        let param_names = segments
            .iter()
            .filter_map(|s| s.param_name().map(str::to_owned))
            .collect();

        Ok(Self {
            raw: pattern.to_owned(),
            segments,
            param_names,
        })
    }

    /// The pattern string exactly as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter names in declaration order, catch-all included.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// `true` when no segment is a parameter.
    pub fn is_static(&self) -> bool {
        self.param_names.is_empty()
    }

    pub fn has_catch_all(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::CatchAll(_)))
    }

    /// The pattern rebuilt from its segments: `/` plus the segments joined by `/`.
    ///
    /// Adjacent and trailing slashes from the registered string are gone, so
    /// `/api//users/` normalizes to `/api/users`.
    pub fn normalized(&self) -> String {
        let mut path = String::with_capacity(self.raw.len());
        path.push('/');
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                path.push('/');
            }
            match segment {
                Segment::Literal(s) => path.push_str(s),
                Segment::Param(name) => {
                    path.push('[');
                    path.push_str(name);
                    path.push(']');
                }
                Segment::CatchAll(name) => {
                    path.push_str("[...");
                    path.push_str(name);
                    path.push(']');
                }
            }
        }
        path
    }
}

/// Splits a path on `/`, skipping empty components.
///
/// Patterns and request paths go through the same tokenizer, which is what lets the
/// matcher compare them segment by segment.
pub fn tokenize(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Segment {
        Segment::Literal(s.to_owned())
    }

    #[test]
    fn root_has_no_segments() {
        let p = Pattern::parse("/").unwrap();
        assert!(p.segments().is_empty());
        assert!(p.is_static());
        assert_eq!(p.normalized(), "/");
    }

    #[test]
    fn literal_segments() {
        let p = Pattern::parse("/users/profile").unwrap();
        assert_eq!(p.segments(), [lit("users"), lit("profile")]);
        assert!(p.is_static());
        assert!(p.param_names().is_empty());
    }

    #[test]
    fn empty_components_dropped() {
        let a = Pattern::parse("/a//b/").unwrap();
        let b = Pattern::parse("/a/b").unwrap();
        assert_eq!(a.segments(), b.segments());
        // the registered string is kept verbatim for the static cache
        assert_eq!(a.as_str(), "/a//b/");
        assert_eq!(a.normalized(), "/a/b");
    }

    #[test]
    fn named_param() {
        let p = Pattern::parse("/users/[id]/posts/[post_id]").unwrap();
        assert_eq!(p.segments()[1], Segment::Param("id".into()));
        assert_eq!(p.param_names(), ["id", "post_id"]);
        assert!(!p.is_static());
        assert!(!p.has_catch_all());
    }

    #[test]
    fn catch_all_param() {
        let p = Pattern::parse("/files/[...path]").unwrap();
        assert_eq!(p.segments(), [lit("files"), Segment::CatchAll("path".into())]);
        assert_eq!(p.param_names(), ["path"]);
        assert!(p.has_catch_all());
        assert_eq!(p.normalized(), "/files/[...path]");
    }

    #[test]
    fn must_start_with_slash() {
        let err = Pattern::parse("users").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
        assert!(Pattern::parse("").is_err());
    }

    #[test]
    fn catch_all_must_be_last() {
        assert!(Pattern::parse("/a/[...rest]/b").is_err());
        assert!(Pattern::parse("/a/[...x]/[...y]").is_err());
    }

    #[test]
    fn malformed_params_rejected() {
        for bad in ["/a/[id", "/a/[]", "/a/[...]", "/a/id]", "/a/x[id]", "/a/[[id]]"] {
            assert!(
                matches!(Pattern::parse(bad), Err(Error::InvalidPattern { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn tokenize_matches_compiler() {
        let segs: Vec<_> = tokenize("//users///42/").collect();
        assert_eq!(segs, ["users", "42"]);
        assert_eq!(tokenize("/").count(), 0);
    }
}
