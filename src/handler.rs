use crate::{
    context::RouteContext,
    error::{BoxError, RouteError},
    params::Params,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

/// The response a handler resolves with
pub type Response = http::Response<Bytes>;

/// An abstract request handler
///
/// A handler receives the request context and whatever its route's matcher
/// produced, and asynchronously resolves with a response. How that response
/// is produced (network, cache, synthesized) is up to the implementation.
/// Failure is signaled through `Err`, never through an empty response.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        ctx: Arc<RouteContext>,
        params: Option<Params>,
    ) -> Result<Response, BoxError>;
}

/// See [`handler_fn`]
pub struct HandlerFn<F>(F);

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Arc<RouteContext>, Option<Params>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    async fn handle(
        &self,
        ctx: Arc<RouteContext>,
        params: Option<Params>,
    ) -> Result<Response, BoxError> {
        (self.0)(ctx, params).await
    }
}

/// Adapts an async closure into a shareable [`Handler`]
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(Arc<RouteContext>, Option<Params>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    Arc::new(HandlerFn(f))
}

/// A response that will be available once its handler settles
///
/// Returned by `Router::dispatch` once a route has claimed a request. The
/// caller commits to it before it resolves.
pub struct PendingResponse {
    inner: BoxFuture<'static, Result<Response, RouteError>>,
}

impl PendingResponse {
    pub(crate) fn new<F>(fut: F) -> Self
    where
        F: Future<Output = Result<Response, RouteError>> + Send + 'static,
    {
        PendingResponse {
            inner: Box::pin(fut),
        }
    }
}

impl Future for PendingResponse {
    type Output = Result<Response, RouteError>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl fmt::Debug for PendingResponse {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("PendingResponse").finish_non_exhaustive()
    }
}
