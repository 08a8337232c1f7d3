//! HTTP header map with case-insensitive name lookup.

use std::str::FromStr;

/// A case-insensitive, multi-value HTTP header map.
///
/// Insertion order is preserved. [`append`](Self::append) adds another value for a name;
/// [`set`](Self::set) replaces every value for it, which is what middleware wants when it
/// stamps CORS or content headers onto a downstream response.
///
/// # Examples
///
/// ```
/// use rttp_router::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.append("Vary", "Origin");
/// headers.append("Vary", "Accept");
/// headers.set("Content-Type", "text/plain");
/// headers.set("content-type", "application/json");
///
/// assert_eq!(headers.get_all("vary").count(), 2);
/// assert_eq!(headers.get("Content-Type"), Some("application/json"));
/// assert_eq!(headers.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Adds a value, keeping any existing values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces all values for `name` with a single `value`.
    ///
    /// The entry keeps the position of the first existing value, or is appended when the
    /// name was absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();

        let mut seen = false;
        self.entries.retain(|(k, _)| {
            if !k.eq_ignore_ascii_case(&name) {
                return true;
            }
            let keep = !seen;
            seen = true;
            keep
        });

        let existing = self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(&name));
        match existing {
            Some(i) => self.entries[i] = (name, value.into()),
            None => self.entries.push((name, value.into())),
        }
    }

    /// Returns the first value for `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parses the first value for `name`, returning `None` if absent or unparsable.
    pub fn get_parsed<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name)?.trim().parse().ok()
    }

    /// Returns every value for `name` (case-insensitive) in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Removes all values for `name`, returning `true` if any were present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.entries.len() < before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Number of entries, counting repeated names separately.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
