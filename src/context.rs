//! Per request state handed to every match callback and handler.
use crate::error::RouteError;
use bytes::Bytes;
use futures::future::{join_all, BoxFuture};
use http::{Method, Request};
use parking_lot::Mutex;
use std::{fmt, future::Future};
use url::Url;

/// The mode a request was issued with
///
/// Only `Navigate` has routing significance. It marks a request for a
/// new top level document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

/// An intercepted request, as handed over by the interception layer
pub struct FetchEvent {
    request: Request<Bytes>,
    mode: RequestMode,
    extensions: Mutex<Vec<BoxFuture<'static, ()>>>,
}

impl FetchEvent {
    pub fn new(
        request: Request<Bytes>,
        mode: RequestMode,
    ) -> Self {
        FetchEvent {
            request,
            mode,
            extensions: Mutex::new(Vec::new()),
        }
    }

    /// Shorthand for a navigation request to `request`
    pub fn navigate(request: Request<Bytes>) -> Self {
        Self::new(request, RequestMode::Navigate)
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Extends the lifetime of this event until `work` completes
    ///
    /// Handlers use this for work that must outlive the response, such as
    /// writing a cache entry after the response has been returned.
    pub fn wait_until<F>(
        &self,
        work: F,
    ) where
        F: Future<Output = ()> + Send + 'static,
    {
        self.extensions.lock().push(Box::pin(work));
    }

    /// Resolves once every lifetime extension, including ones registered
    /// while waiting, has completed
    pub async fn settled(&self) {
        loop {
            let pending = std::mem::take(&mut *self.extensions.lock());
            if pending.is_empty() {
                return;
            }
            join_all(pending).await;
        }
    }
}

impl fmt::Debug for FetchEvent {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("FetchEvent")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("mode", &self.mode)
            .field("extensions", &self.extensions.lock().len())
            .finish()
    }
}

/// Read only view of a single intercepted request
///
/// Created once per request and shared by every match callback evaluated
/// for it and by the handler that ends up responding.
#[derive(Debug)]
pub struct RouteContext {
    event: FetchEvent,
    url: Url,
    same_origin: bool,
}

impl RouteContext {
    /// Resolves the request URI against `scope`, the URL the intercepting
    /// agent was registered for
    pub fn new(
        event: FetchEvent,
        scope: &Url,
    ) -> Result<Self, RouteError> {
        let input = event.request().uri().to_string();
        let url = scope
            .join(&input)
            .map_err(|source| RouteError::InvalidUrl { input, source })?;
        let same_origin = url.origin() == scope.origin();
        Ok(RouteContext {
            event,
            url,
            same_origin,
        })
    }

    pub fn event(&self) -> &FetchEvent {
        &self.event
    }

    pub fn request(&self) -> &Request<Bytes> {
        self.event.request()
    }

    pub fn method(&self) -> &Method {
        self.event.request().method()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// True when the request targets the same origin as the routing scope
    pub fn is_same_origin(&self) -> bool {
        self.same_origin
    }
}
