//! Per-request context: the request, its route params and typed extensions.
//!
//! A [`Context`] is built by the router once a route matches and is moved through the
//! middleware chain into the handler. Middleware can stash typed values in
//! [`Extensions`] (an authenticated principal, a request id) for handlers downstream.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use serde::Serialize;

use crate::Request;

/// Type-erased request extensions map — used to inject per-request state
/// into handlers without requiring handlers to know about each other's types.
///
/// Values are stored behind [`Arc`] so a whole [`Context`] can be cloned.
#[derive(Default, Clone)]
pub struct Extensions {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Create a new empty extensions map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value of the same type.
    pub fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Get a value from the extensions map
    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn contains<T>(&self) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Remove a value, returning `true` if one was present.
    pub fn remove<T>(&mut self) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.map.remove(&TypeId::of::<T>()).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

/// A captured route parameter.
///
/// Serializes untagged: a single value as a JSON string, a catch-all as an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Captured by a `[name]` segment.
    Single(String),
    /// Captured by a `[...name]` segment; possibly empty.
    CatchAll(Vec<String>),
}

impl ParamValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::CatchAll(_) => None,
        }
    }

    pub fn as_catch_all(&self) -> Option<&[String]> {
        match self {
            Self::Single(_) => None,
            Self::CatchAll(values) => Some(values),
        }
    }
}

/// Path parameters extracted from the matched route.
///
/// # Examples
///
/// ```
/// use rttp_router::context::Params;
///
/// let mut params = Params::new();
/// params.insert_single("id", "42");
/// params.insert_catch_all("rest", vec!["a".into(), "b".into()]);
///
/// assert_eq!(params.get("id"), Some("42"));
/// assert_eq!(params.get_all("rest"), Some(&["a".to_string(), "b".to_string()][..]));
/// assert_eq!(params.get("rest"), None);
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params {
    map: HashMap<String, ParamValue>,
}

impl Params {
    /// Create a new empty parameters map
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_single(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map
            .insert(name.into(), ParamValue::Single(value.into()));
    }

    pub fn insert_catch_all(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.map.insert(name.into(), ParamValue::CatchAll(values));
    }

    /// Returns a single-segment parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).and_then(ParamValue::as_single)
    }

    /// Returns a catch-all parameter by name. An empty slice is a valid capture.
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.map.get(name).and_then(ParamValue::as_catch_all)
    }

    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Per-request context handed to middleware and handlers.
#[derive(Debug, Clone)]
pub struct Context {
    request: Request,
    params: Params,
    extensions: Extensions,
}

impl Context {
    /// Create a context with no route params.
    pub fn new(request: Request) -> Self {
        Self::with_params(request, Params::new())
    }

    pub fn with_params(request: Request, params: Params) -> Self {
        Self {
            request,
            params,
            extensions: Extensions::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Consumes the context, returning the request.
    pub fn into_request(self) -> Request {
        self.request
    }
}
