//! Regex based matching with origin aware anchoring.
//!
//! For same origin requests the pattern may match anywhere in the full URL.
//! For cross origin requests only a match starting at the very beginning of
//! the URL counts, so a pattern written for a local path such as
//! `/styles/.*\.css` never captures `https://other.example/x/styles/y.css`.
use crate::{
    context::RouteContext,
    error::BoxError,
    matcher::Matcher,
    params::{Captures, Params},
};
use regex::Regex;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
}

impl PatternMatcher {
    pub fn new(regex: Regex) -> Self {
        PatternMatcher { regex }
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Matches `url`, knowing whether it shares the routing scope's origin
    pub fn captures(
        &self,
        url: &str,
        same_origin: bool,
    ) -> Option<Captures> {
        let caps = self.regex.captures(url)?;
        let start = caps.get(0).map(|m| m.start()).unwrap_or_default();
        if !same_origin && start != 0 {
            debug!(
                pattern = self.regex.as_str(),
                url,
                offset = start,
                "pattern only partially matched a cross-origin url, \
                 anchor it with the full origin to handle this request"
            );
            return None;
        }
        Some(Captures::from_regex(&self.regex, &caps))
    }
}

impl Matcher for PatternMatcher {
    fn matches(
        &self,
        ctx: &RouteContext,
    ) -> Result<Option<Params>, BoxError> {
        Ok(self
            .captures(ctx.url().as_str(), ctx.is_same_origin())
            .map(Params::Captures))
    }
}
