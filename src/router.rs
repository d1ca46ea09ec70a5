use crate::{
    context::RouteContext,
    error::RouteError,
    handler::{Handler, PendingResponse},
    params::Params,
    route::{Capture, Route},
};
use http::Method;
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};
use tracing::{debug, error, warn};
use url::Url;

type Bucket = Arc<Vec<Arc<Route>>>;

/// Dispatches intercepted requests to registered routes
///
/// Routes are kept per HTTP method in registration order. The first
/// registered route whose matcher accepts a request wins, even when a later
/// one would also match.
///
/// Registration and dispatch may interleave freely. Each dispatch scans a
/// snapshot of its method's routes taken when it starts, and captures the
/// default and catch handlers at that same moment, so later changes never
/// affect a dispatch already underway.
pub struct Router {
    scope: Url,
    routes: RwLock<HashMap<Method, Bucket>>,
    default_handler: RwLock<Option<Arc<dyn Handler>>>,
    catch_handler: RwLock<Option<Arc<dyn Handler>>>,
}

impl Router {
    /// Creates an empty router for an agent registered at `scope`
    pub fn new(scope: Url) -> Self {
        Router {
            scope,
            routes: RwLock::new(HashMap::new()),
            default_handler: RwLock::new(None),
            catch_handler: RwLock::new(None),
        }
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// Appends `route` to the routes for its method
    ///
    /// The returned handle identifies this registration for [`Router::unregister`].
    pub fn register(
        &self,
        route: Route,
    ) -> Arc<Route> {
        let route = Arc::new(route);
        let mut routes = self.routes.write();
        let bucket = routes.entry(route.method().clone()).or_default();
        let mut next = Vec::with_capacity(bucket.len() + 1);
        next.extend(bucket.iter().cloned());
        next.push(route.clone());
        *bucket = Arc::new(next);
        debug!(route = %route.id(), method = %route.method(), "registered route");
        route
    }

    /// Builds a route from registration shorthand and registers it
    pub fn register_capture<C>(
        &self,
        capture: C,
        handler: Arc<dyn Handler>,
        method: Method,
    ) -> Result<Arc<Route>, RouteError>
    where
        C: Into<Capture>,
    {
        let route = Route::from_capture(capture.into(), handler, &self.scope)?
            .with_method(method)?;
        Ok(self.register(route))
    }

    /// Removes a previously registered route
    pub fn unregister(
        &self,
        route: &Arc<Route>,
    ) -> Result<(), RouteError> {
        let mut routes = self.routes.write();
        let bucket = routes
            .get_mut(route.method())
            .ok_or(RouteError::NotRegistered(route.id()))?;
        let index = bucket
            .iter()
            .position(|registered| Arc::ptr_eq(registered, route))
            .ok_or(RouteError::NotRegistered(route.id()))?;
        let mut next = bucket.as_ref().clone();
        next.remove(index);
        *bucket = Arc::new(next);
        debug!(route = %route.id(), method = %route.method(), "unregistered route");
        Ok(())
    }

    /// The routes currently registered for `method`, in evaluation order
    pub fn routes(
        &self,
        method: &Method,
    ) -> Vec<Arc<Route>> {
        self.bucket(method)
            .map(|bucket| bucket.as_ref().clone())
            .unwrap_or_default()
    }

    /// Responds to requests no route matches
    pub fn set_default_handler(
        &self,
        handler: Arc<dyn Handler>,
    ) {
        *self.default_handler.write() = Some(handler);
    }

    pub fn clear_default_handler(&self) {
        *self.default_handler.write() = None;
    }

    /// Recovers from handler failures
    pub fn set_catch_handler(
        &self,
        handler: Arc<dyn Handler>,
    ) {
        *self.catch_handler.write() = Some(handler);
    }

    pub fn clear_catch_handler(&self) {
        *self.catch_handler.write() = None;
    }

    fn bucket(
        &self,
        method: &Method,
    ) -> Option<Bucket> {
        self.routes.read().get(method).cloned()
    }

    /// Finds the first registered route accepting `ctx`, along with what its
    /// matcher produced
    pub fn find_matching_route(
        &self,
        ctx: &RouteContext,
    ) -> Result<Option<(Arc<Route>, Option<Params>)>, RouteError> {
        let bucket = match self.bucket(ctx.method()) {
            Some(bucket) => bucket,
            None => return Ok(None),
        };
        for route in bucket.iter() {
            match route.matches(ctx) {
                Ok(Some(params)) => {
                    return Ok(Some((route.clone(), params.into_handler_params())));
                }
                Ok(None) => continue,
                Err(err) => {
                    error!(
                        route = %route.id(),
                        url = %ctx.url(),
                        "match callback failed: {}",
                        err
                    );
                    return Err(err);
                }
            }
        }
        Ok(None)
    }

    /// Decides whether to claim a request
    ///
    /// `Ok(None)` means nothing claims the request and the caller should let
    /// it fall through to the network. Otherwise the returned
    /// [`PendingResponse`] resolves with the handler's response. When the
    /// handler fails and a catch handler is set, the catch handler gets one
    /// chance to produce a response instead.
    ///
    /// The route, its params and the catch handler are all fixed before this
    /// returns, but the handler itself only runs once the `PendingResponse` is
    /// first polled. Dropping it unpolled means the handler never runs.
    ///
    /// The only synchronous failure is a matcher returning an error.
    pub fn dispatch(
        &self,
        ctx: Arc<RouteContext>,
    ) -> Result<Option<PendingResponse>, RouteError> {
        let url = ctx.url();
        if !matches!(url.scheme(), "http" | "https") {
            debug!(url = %url, "only http and https requests are routed");
            return Ok(None);
        }

        let (handler, params) = match self.find_matching_route(&ctx)? {
            Some((route, params)) => {
                debug!(
                    route = %route.id(),
                    method = %ctx.method(),
                    url = %url,
                    "found a route for request"
                );
                (route.handler().clone(), params)
            }
            None => {
                let default_handler = self.default_handler.read().clone();
                match default_handler {
                    Some(handler) => {
                        debug!(
                            method = %ctx.method(),
                            url = %url,
                            "no route found, using the default handler"
                        );
                        (handler, None)
                    }
                    None => {
                        debug!(method = %ctx.method(), url = %url, "no route found");
                        return Ok(None);
                    }
                }
            }
        };
        let catch_handler = self.catch_handler.read().clone();

        Ok(Some(PendingResponse::new(async move {
            let failure = match handler.handle(ctx.clone(), params).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };
            let catch_handler = match catch_handler {
                Some(catch_handler) => catch_handler,
                None => {
                    warn!(url = %ctx.url(), "handler failed: {}", failure);
                    return Err(RouteError::Handler(failure));
                }
            };
            warn!(url = %ctx.url(), "handler failed, trying the catch handler: {}", failure);
            catch_handler.handle(ctx.clone(), None).await.map_err(|source| {
                error!(url = %ctx.url(), "catch handler failed: {}", source);
                RouteError::CatchHandler {
                    source,
                    handler: failure,
                }
            })
        })))
    }
}

static DEFAULT_ROUTER: OnceLock<Router> = OnceLock::new();

/// Initializes the process wide router for `scope`
///
/// Later calls return the router created by the first one.
pub fn init_default_router(scope: Url) -> &'static Router {
    DEFAULT_ROUTER.get_or_init(|| Router::new(scope))
}

/// The process wide router, for callers that only ever need one
pub fn default_router() -> Result<&'static Router, RouteError> {
    DEFAULT_ROUTER.get().ok_or(RouteError::Uninitialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{FetchEvent, RequestMode},
        handler::{handler_fn, Response},
        matcher::{match_fn, try_match_fn, Any},
        navigation::NavigationOptions,
        BoxError,
    };
    use bytes::Bytes;
    use http::Request;
    use regex::Regex;
    use std::{
        error::Error,
        sync::atomic::{AtomicUsize, Ordering},
    };

    fn scope() -> Url {
        Url::parse("https://app.example.com/").expect("valid scope")
    }

    fn ctx(
        method: Method,
        uri: &str,
    ) -> Result<Arc<RouteContext>, Box<dyn Error>> {
        let req = Request::builder().method(method).uri(uri).body(Bytes::new())?;
        Ok(Arc::new(RouteContext::new(FetchEvent::new(req, RequestMode::Cors), &scope())?))
    }

    fn navigate(uri: &str) -> Result<Arc<RouteContext>, Box<dyn Error>> {
        let req = Request::get(uri).body(Bytes::new())?;
        Ok(Arc::new(RouteContext::new(FetchEvent::navigate(req), &scope())?))
    }

    fn respond(body: &'static str) -> Arc<dyn Handler> {
        handler_fn(move |_, _| async move {
            Ok::<_, BoxError>(Response::new(Bytes::from_static(body.as_bytes())))
        })
    }

    fn fail(reason: &'static str) -> Arc<dyn Handler> {
        handler_fn(move |_, _| async move { Err::<Response, BoxError>(reason.into()) })
    }

    async fn body(
        router: &Router,
        ctx: Arc<RouteContext>,
    ) -> Result<Option<Bytes>, Box<dyn Error>> {
        Ok(match router.dispatch(ctx)? {
            Some(pending) => Some(pending.await?.into_body()),
            None => None,
        })
    }

    #[tokio::test]
    async fn first_registered_wins() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.register(Route::pattern(Regex::new("/api/")?, respond("first")));
        router.register(Route::new(Any, respond("second")));
        assert_eq!(body(&router, ctx(Method::GET, "/api/x")?).await?, Some(Bytes::from("first")));
        assert_eq!(body(&router, ctx(Method::GET, "/other")?).await?, Some(Bytes::from("second")));
        Ok(())
    }

    #[tokio::test]
    async fn routes_are_scoped_by_method() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.register(
            Route::pattern(Regex::new(r"/api/.*\.json")?, respond("a")).with_method(Method::POST)?,
        );
        router.register(Route::new(Any, respond("b")));

        let get = body(&router, ctx(Method::GET, "/api/data.json")?).await?;
        assert_eq!(get, Some(Bytes::from("b")));
        let post = body(&router, ctx(Method::POST, "/api/data.json")?).await?;
        assert_eq!(post, Some(Bytes::from("a")));
        assert!(router.dispatch(ctx(Method::POST, "/other")?)?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn default_handler_applies_to_later_dispatches() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        assert!(router.dispatch(ctx(Method::GET, "/nope")?)?.is_none());
        router.set_default_handler(respond("default"));
        assert_eq!(body(&router, ctx(Method::GET, "/nope")?).await?, Some(Bytes::from("default")));
        router.clear_default_handler();
        assert!(router.dispatch(ctx(Method::GET, "/nope")?)?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn catch_handler_recovers_failures() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.register(Route::new(Any, fail("offline")));
        router.set_catch_handler(respond("fallback"));
        assert_eq!(body(&router, ctx(Method::GET, "/")?).await?, Some(Bytes::from("fallback")));
        Ok(())
    }

    #[tokio::test]
    async fn default_handler_failures_are_caught_too() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.set_default_handler(fail("offline"));
        router.set_catch_handler(respond("fallback"));
        assert_eq!(body(&router, ctx(Method::GET, "/")?).await?, Some(Bytes::from("fallback")));
        Ok(())
    }

    #[tokio::test]
    async fn handler_failure_without_catch_handler() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.register(Route::new(Any, fail("offline")));
        let pending = router.dispatch(ctx(Method::GET, "/")?)?.expect("claimed");
        match pending.await {
            Err(RouteError::Handler(err)) => assert_eq!(err.to_string(), "offline"),
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn catch_handler_failure_is_final() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.register(Route::new(Any, fail("offline")));
        router.set_catch_handler(fail("no fallback"));
        let pending = router.dispatch(ctx(Method::GET, "/")?)?.expect("claimed");
        match pending.await {
            Err(RouteError::CatchHandler { source, handler }) => {
                assert_eq!(source.to_string(), "no fallback");
                assert_eq!(handler.to_string(), "offline");
            }
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn handlers_are_captured_at_dispatch() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.register(Route::new(Any, fail("offline")));
        router.set_catch_handler(respond("before"));
        let pending = router.dispatch(ctx(Method::GET, "/")?)?.expect("claimed");
        router.set_catch_handler(respond("after"));
        assert_eq!(pending.await?.into_body(), Bytes::from("before"));
        Ok(())
    }

    #[tokio::test]
    async fn handlers_run_when_polled() -> Result<(), Box<dyn Error>> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new(scope());
        router.register(Route::new(
            Any,
            handler_fn(move |_, _| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, BoxError>(Response::new(Bytes::new()))
                }
            }),
        ));

        let dropped = router.dispatch(ctx(Method::GET, "/")?)?.expect("claimed");
        drop(dropped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let pending = router.dispatch(ctx(Method::GET, "/")?)?.expect("claimed");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        pending.await?;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn matcher_errors_fail_dispatch() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.register(Route::new(
            try_match_fn(|_: &RouteContext| Err::<bool, _>("misconfigured")),
            respond("never"),
        ));
        router.set_default_handler(respond("default"));
        assert!(matches!(
            router.dispatch(ctx(Method::GET, "/")?),
            Err(RouteError::Predicate { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn params_reach_the_handler() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.register(Route::pattern(
            Regex::new(r"/users/(?P<id>\d+)")?,
            handler_fn(|_, params| async move {
                let id = params
                    .as_ref()
                    .and_then(Params::captures)
                    .and_then(|caps| caps.name("id"))
                    .unwrap_or_default()
                    .to_owned();
                Ok::<_, BoxError>(Response::new(Bytes::from(id)))
            }),
        ));
        assert_eq!(body(&router, ctx(Method::GET, "/users/7")?).await?, Some(Bytes::from("7")));
        Ok(())
    }

    #[tokio::test]
    async fn cross_origin_requests_need_anchored_patterns() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.register(Route::pattern(Regex::new(r"/styles/.*\.css")?, respond("local")));
        let local = body(&router, ctx(Method::GET, "/x/styles/y.css")?).await?;
        assert_eq!(local, Some(Bytes::from("local")));
        assert!(router
            .dispatch(ctx(Method::GET, "https://evil.example.com/x/styles/y.css")?)?
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn navigation_routes() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.register(Route::navigation(
            respond("shell"),
            NavigationOptions::default()
                .allow(Regex::new("^/app")?)
                .deny(Regex::new("^/app/raw")?),
        ));
        assert_eq!(body(&router, navigate("/app/inbox")?).await?, Some(Bytes::from("shell")));
        assert!(router.dispatch(navigate("/app/raw/1")?)?.is_none());
        assert!(router.dispatch(ctx(Method::GET, "/app/inbox")?)?.is_none());
        Ok(())
    }

    #[test]
    fn unregister() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        let a = router.register(Route::new(Any, respond("a")));
        let b = router.register(Route::new(Any, respond("b")));
        router.unregister(&a)?;
        let remaining = router.routes(&Method::GET);
        assert_eq!(remaining.len(), 1);
        assert!(Arc::ptr_eq(&remaining[0], &b));
        assert!(matches!(
            router.unregister(&a),
            Err(RouteError::NotRegistered(id)) if id == a.id()
        ));

        let post = Arc::new(Route::new(Any, respond("c")).with_method(Method::POST)?);
        assert!(matches!(router.unregister(&post), Err(RouteError::NotRegistered(_))));
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_is_taken_per_dispatch() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        let route = router.register(Route::new(Any, respond("a")));
        let pending = router.dispatch(ctx(Method::GET, "/")?)?.expect("claimed");
        router.unregister(&route)?;
        assert_eq!(pending.await?.into_body(), Bytes::from("a"));
        assert!(router.dispatch(ctx(Method::GET, "/")?)?.is_none());
        Ok(())
    }

    #[test]
    fn non_http_schemes_are_not_routed() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.set_default_handler(respond("default"));
        assert!(router
            .dispatch(ctx(Method::GET, "chrome-extension://abc/x.js")?)?
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn register_capture_shorthand() -> Result<(), Box<dyn Error>> {
        let router = Router::new(scope());
        router.register_capture("/offline.html", respond("page"), Method::GET)?;
        router.register_capture(Regex::new(r"\.png$")?, respond("image"), Method::GET)?;
        router.register_capture(
            Capture::matcher(match_fn(|ctx: &RouteContext| ctx.url().path() == "/ping")),
            respond("pong"),
            Method::HEAD,
        )?;
        let page = body(&router, ctx(Method::GET, "/offline.html")?).await?;
        assert_eq!(page, Some(Bytes::from("page")));
        assert_eq!(body(&router, ctx(Method::GET, "/a/b.png")?).await?, Some(Bytes::from("image")));
        assert_eq!(body(&router, ctx(Method::HEAD, "/ping")?).await?, Some(Bytes::from("pong")));
        assert!(router.dispatch(ctx(Method::GET, "/offline.html?x=1")?)?.is_none());
        Ok(())
    }
}
