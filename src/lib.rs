//! A request router for a browser's network interception agent.
//!
//! swroute decides which piece of application logic answers an intercepted
//! request. The decision to claim a request is synchronous and the response
//! itself is produced asynchronously, which is the contract interception
//! layers impose.
//!
//! ## Simple
//!
//! There are very few components. A [`Route`] binds a [`Matcher`], a
//! [`Handler`] and an HTTP method. A [`Router`] keeps routes in registration
//! order and the first one that matches wins. There is no specificity
//! ranking to reason about.
//!
//! ## Synchronous matching
//!
//! Matchers return plain values. It is not possible to await inside one, so
//! the claim decision can never be held up by IO. Handlers are where the
//! asynchronous work happens.
//!
//! ## Flexible
//!
//! Regexes are universal language for pattern recognition. Pattern routes
//! expose regex capture groups directly to handlers, and are origin aware:
//! a cross origin URL only matches a pattern that matches from its very
//! first character. Navigation routes respond to page loads filtered by
//! allow and deny lists. Anything else is a closure away with [`match_fn`].
//!
//! ## Fallbacks
//!
//! A default handler answers requests no route claims and a catch handler
//! gets one chance to recover when a handler fails.
//!
//! ```no_run
//! use bytes::Bytes;
//! use regex::Regex;
//! use swroute::{handler_fn, BoxError, FetchEvent, Response, Route, RouteContext, Router};
//! use std::sync::Arc;
//!
//! # async fn run(event: FetchEvent) -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::new("https://app.example.com/".parse()?);
//! router.register(Route::pattern(
//!     Regex::new(r"/api/(\w+)\.json")?,
//!     handler_fn(|_, params| async move {
//!         Ok::<_, BoxError>(Response::new(Bytes::from(format!("{:?}", params))))
//!     }),
//! ));
//!
//! let ctx = Arc::new(RouteContext::new(event, router.scope())?);
//! match router.dispatch(ctx)? {
//!     Some(pending) => println!("{:?}", pending.await?),
//!     None => println!("not ours, let the network have it"),
//! }
//! # Ok(())
//! # }
//! ```
mod config;
mod context;
mod error;
mod handler;
mod matcher;
mod navigation;
mod params;
mod pattern;
mod route;
mod router;

pub use crate::{
    config::{load_config, validate, HandlerRegistry, NavigationConfig, RouteConfig, RouterConfig},
    context::{FetchEvent, RequestMode, RouteContext},
    error::{BoxError, RouteError},
    handler::{handler_fn, Handler, HandlerFn, PendingResponse, Response},
    matcher::{match_fn, try_match_fn, Any, MatchFn, Matcher, TryMatchFn},
    navigation::{NavigationMatcher, NavigationOptions},
    params::{Captures, IntoParams, Params},
    pattern::PatternMatcher,
    route::{Capture, Route, RouteId, RouteMatcher},
    router::{default_router, init_default_router, Router},
};
pub use async_trait::async_trait;
