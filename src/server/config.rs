use tracing::warn;

/// Settings for [`Server`](super::Server).
///
/// # Examples
///
/// ```rust
/// use rttp_router::server::ServerConfig;
///
/// let config = ServerConfig::default().port(8080).debug_routes(true);
/// assert_eq!(config.addr(), "127.0.0.1:8080");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Log every request with its status and elapsed time.
    pub debug_routes: bool,
    /// Largest request (headers plus body) buffered before answering `413`.
    pub max_request_size: usize,
    /// Deployment environment name; `"production"` makes `debug_routes` warn at startup.
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            debug_routes: false,
            max_request_size: 8 * 1024 * 1024,
            environment: "development".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `RTTP_HOST`, `PORT`, `RTTP_DEBUG_ROUTES` and `RTTP_ENV`.
    ///
    /// Values that do not parse are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup("RTTP_HOST").filter(|h| !h.trim().is_empty()) {
            config.host = host.trim().to_owned();
        }
        if let Some(port) = lookup("PORT") {
            match port.trim().parse() {
                Ok(port) => config.port = port,
                Err(e) => warn!(value = %port, error = %e, "ignoring invalid PORT"),
            }
        }
        if let Some(flag) = lookup("RTTP_DEBUG_ROUTES") {
            match parse_flag(&flag) {
                Some(enabled) => config.debug_routes = enabled,
                None => warn!(value = %flag, "ignoring invalid RTTP_DEBUG_ROUTES"),
            }
        }
        if let Some(environment) = lookup("RTTP_ENV") {
            config.environment = environment.trim().to_owned();
        }

        config
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn debug_routes(mut self, enabled: bool) -> Self {
        self.debug_routes = enabled;
        self
    }

    #[must_use]
    pub fn max_request_size(mut self, bytes: usize) -> Self {
        self.max_request_size = bytes;
        self
    }

    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// `host:port`, as passed to the listener.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
