use crate::{
    context::RouteContext,
    error::BoxError,
    params::{IntoParams, Params},
};
use http::{header::HeaderName, HeaderValue};

/// Decides whether a route applies to a request
///
/// Matching is synchronous. The interception layer needs a claim or no
/// claim answer before it can return, so nothing here may be awaited.
///
/// A few Matcher impls are provided for http type values.
/// These also serve as an extension point
pub trait Matcher: Send + Sync {
    /// Returns `Ok(None)` when the route does not apply. An `Err` is a bug
    /// in the matcher and fails the dispatch outright.
    fn matches(
        &self,
        ctx: &RouteContext,
    ) -> Result<Option<Params>, BoxError>;
}

/// Matches every request
#[derive(Debug, Clone, Copy)]
pub struct Any;

impl Matcher for Any {
    fn matches(
        &self,
        _: &RouteContext,
    ) -> Result<Option<Params>, BoxError> {
        Ok(Some(Params::Matched))
    }
}

impl Matcher for HeaderName {
    fn matches(
        &self,
        ctx: &RouteContext,
    ) -> Result<Option<Params>, BoxError> {
        Ok(ctx.request().headers().contains_key(self).into_params())
    }
}

impl Matcher for (HeaderName, HeaderValue) {
    fn matches(
        &self,
        ctx: &RouteContext,
    ) -> Result<Option<Params>, BoxError> {
        let (k, v) = self;
        Ok(ctx
            .request()
            .headers()
            .get(k)
            .filter(|value| *value == v)
            .is_some()
            .into_params())
    }
}

/// See [`match_fn`]
pub struct MatchFn<F>(F);

impl<F, R> Matcher for MatchFn<F>
where
    F: Fn(&RouteContext) -> R + Send + Sync,
    R: IntoParams,
{
    fn matches(
        &self,
        ctx: &RouteContext,
    ) -> Result<Option<Params>, BoxError> {
        Ok((self.0)(ctx).into_params())
    }
}

/// Adapts a closure into a [`Matcher`]
///
/// The closure may return `bool`, [`Params`] or an `Option` of either.
pub fn match_fn<F, R>(f: F) -> MatchFn<F>
where
    F: Fn(&RouteContext) -> R + Send + Sync,
    R: IntoParams,
{
    MatchFn(f)
}

/// See [`try_match_fn`]
pub struct TryMatchFn<F>(F);

impl<F, R, E> Matcher for TryMatchFn<F>
where
    F: Fn(&RouteContext) -> Result<R, E> + Send + Sync,
    R: IntoParams,
    E: Into<BoxError>,
{
    fn matches(
        &self,
        ctx: &RouteContext,
    ) -> Result<Option<Params>, BoxError> {
        (self.0)(ctx).map(IntoParams::into_params).map_err(Into::into)
    }
}

/// Adapts a fallible closure into a [`Matcher`]
pub fn try_match_fn<F, R, E>(f: F) -> TryMatchFn<F>
where
    F: Fn(&RouteContext) -> Result<R, E> + Send + Sync,
    R: IntoParams,
    E: Into<BoxError>,
{
    TryMatchFn(f)
}
