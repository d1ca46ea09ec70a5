use crate::route::RouteId;
use thiserror::Error;

/// Error type produced by handlers and fallible match callbacks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can go wrong while building a router or routing a request
///
/// Not finding a route is not an error. `Router::dispatch` reports that
/// as `Ok(None)`.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A match callback returned an error instead of a match decision
    #[error("match callback for route {route} failed: {source}")]
    Predicate { route: RouteId, source: BoxError },
    /// The selected handler failed and no catch handler was set
    #[error("handler failed: {0}")]
    Handler(BoxError),
    /// The catch handler failed while recovering from a handler failure
    #[error("catch handler failed: {source} (while recovering from: {handler})")]
    CatchHandler { source: BoxError, handler: BoxError },
    #[error("route {0} is not registered")]
    NotRegistered(RouteId),
    #[error("invalid url {input:?}: {source}")]
    InvalidUrl {
        input: String,
        source: url::ParseError,
    },
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("invalid http method {0:?}")]
    InvalidMethod(String),
    #[error("navigation routes only respond to GET requests")]
    NavigationMethod,
    #[error("invalid configuration: {}", .0.join(", "))]
    Config(Vec<String>),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("default router has not been initialized")]
    Uninitialized,
}
