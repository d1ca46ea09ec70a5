use crate::{
    context::RouteContext,
    error::RouteError,
    handler::Handler,
    matcher::{match_fn, Matcher},
    navigation::{NavigationMatcher, NavigationOptions},
    params::Params,
    pattern::PatternMatcher,
};
use http::Method;
use regex::Regex;
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use url::Url;

static NEXT_ROUTE_ID: AtomicU64 = AtomicU64::new(1);

/// Process unique identifier of a route, used in logs and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(u64);

impl RouteId {
    fn next() -> Self {
        RouteId(NEXT_ROUTE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RouteId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kinds of matching a route can do
pub enum RouteMatcher {
    /// Arbitrary user supplied matching
    Callback(Box<dyn Matcher>),
    /// Origin aware regex matching
    Pattern(PatternMatcher),
    /// Navigation requests filtered by allow and deny lists
    Navigation(NavigationMatcher),
}

impl Matcher for RouteMatcher {
    fn matches(
        &self,
        ctx: &RouteContext,
    ) -> Result<Option<Params>, crate::BoxError> {
        match self {
            RouteMatcher::Callback(m) => m.matches(ctx),
            RouteMatcher::Pattern(m) => m.matches(ctx),
            RouteMatcher::Navigation(m) => m.matches(ctx),
        }
    }
}

impl fmt::Debug for RouteMatcher {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            RouteMatcher::Callback(_) => f.write_str("Callback"),
            RouteMatcher::Pattern(m) => f
                .debug_tuple("Pattern")
                .field(&m.regex().as_str())
                .finish(),
            RouteMatcher::Navigation(m) => f
                .debug_tuple("Navigation")
                .field(m.options())
                .finish(),
        }
    }
}

/// Binds a matcher and a handler to an HTTP method
///
/// Routes are immutable. Register them with a `Router`, which hands back an
/// `Arc<Route>` that identifies the registration for later removal.
pub struct Route {
    id: RouteId,
    method: Method,
    matcher: RouteMatcher,
    handler: Arc<dyn Handler>,
}

impl Route {
    /// A GET route matched by `matcher`
    pub fn new<M>(
        matcher: M,
        handler: Arc<dyn Handler>,
    ) -> Self
    where
        M: Matcher + 'static,
    {
        Self::from_parts(RouteMatcher::Callback(Box::new(matcher)), handler)
    }

    /// A GET route matched by an origin aware regex
    pub fn pattern(
        regex: Regex,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self::from_parts(RouteMatcher::Pattern(PatternMatcher::new(regex)), handler)
    }

    /// A route for navigation requests. Navigations are always GET.
    pub fn navigation(
        handler: Arc<dyn Handler>,
        options: NavigationOptions,
    ) -> Self {
        Self::from_parts(
            RouteMatcher::Navigation(NavigationMatcher::new(options)),
            handler,
        )
    }

    fn from_parts(
        matcher: RouteMatcher,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Route {
            id: RouteId::next(),
            method: Method::GET,
            matcher,
            handler,
        }
    }

    /// Builds a route from registration shorthand, resolving path captures
    /// against `scope`
    pub fn from_capture(
        capture: Capture,
        handler: Arc<dyn Handler>,
        scope: &Url,
    ) -> Result<Self, RouteError> {
        Ok(match capture {
            Capture::Path(path) => {
                let target = scope
                    .join(&path)
                    .map_err(|source| RouteError::InvalidUrl { input: path, source })?;
                Self::new(match_fn(move |ctx: &RouteContext| ctx.url() == &target), handler)
            }
            Capture::Regex(regex) => Self::pattern(regex, handler),
            Capture::Matcher(matcher) => Self::from_parts(RouteMatcher::Callback(matcher), handler),
        })
    }

    /// Restricts this route to `method` instead of GET
    pub fn with_method(
        mut self,
        method: Method,
    ) -> Result<Self, RouteError> {
        if matches!(self.matcher, RouteMatcher::Navigation(_)) && method != Method::GET {
            return Err(RouteError::NavigationMethod);
        }
        self.method = method;
        Ok(self)
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn matcher(&self) -> &RouteMatcher {
        &self.matcher
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Runs this route's matcher, attributing failures to this route
    pub fn matches(
        &self,
        ctx: &RouteContext,
    ) -> Result<Option<Params>, RouteError> {
        self.matcher
            .matches(ctx)
            .map_err(|source| RouteError::Predicate {
                route: self.id,
                source,
            })
    }
}

impl fmt::Debug for Route {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("matcher", &self.matcher)
            .finish()
    }
}

/// Shorthand for what a route should capture
pub enum Capture {
    /// Exactly this URL, resolved against the router's scope
    Path(String),
    /// Origin aware regex, see [`PatternMatcher`]
    Regex(Regex),
    Matcher(Box<dyn Matcher>),
}

impl Capture {
    pub fn matcher<M>(matcher: M) -> Self
    where
        M: Matcher + 'static,
    {
        Capture::Matcher(Box::new(matcher))
    }
}

impl From<&str> for Capture {
    fn from(path: &str) -> Self {
        Capture::Path(path.to_owned())
    }
}

impl From<String> for Capture {
    fn from(path: String) -> Self {
        Capture::Path(path)
    }
}

impl From<Regex> for Capture {
    fn from(regex: Regex) -> Self {
        Capture::Regex(regex)
    }
}
