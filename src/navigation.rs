//! Matching for top level document navigations.
use crate::{context::RouteContext, error::BoxError, matcher::Matcher, params::Params};
use regex::Regex;
use tracing::debug;

/// Filters narrowing which navigations a navigation route responds to
///
/// Patterns are tested against the URL's path and query string
/// (`/path?query`). An empty allowlist allows every navigation. A URL
/// matching any denylist pattern is rejected even when it is also
/// allowlisted.
#[derive(Debug, Clone, Default)]
pub struct NavigationOptions {
    pub allowlist: Vec<Regex>,
    pub denylist: Vec<Regex>,
}

impl NavigationOptions {
    pub fn allow(
        mut self,
        pattern: Regex,
    ) -> Self {
        self.allowlist.push(pattern);
        self
    }

    pub fn deny(
        mut self,
        pattern: Regex,
    ) -> Self {
        self.denylist.push(pattern);
        self
    }
}

#[derive(Debug, Clone)]
pub struct NavigationMatcher {
    options: NavigationOptions,
}

impl NavigationMatcher {
    pub fn new(options: NavigationOptions) -> Self {
        NavigationMatcher { options }
    }

    pub fn options(&self) -> &NavigationOptions {
        &self.options
    }

    /// Applies the deny and allow lists to a path and query string
    pub fn allows(
        &self,
        path_and_query: &str,
    ) -> bool {
        if let Some(pattern) = self
            .options
            .denylist
            .iter()
            .find(|pattern| pattern.is_match(path_and_query))
        {
            debug!(
                url = path_and_query,
                pattern = pattern.as_str(),
                "navigation route not used, url matches a denylist pattern"
            );
            return false;
        }
        if self.options.allowlist.is_empty() {
            return true;
        }
        match self
            .options
            .allowlist
            .iter()
            .find(|pattern| pattern.is_match(path_and_query))
        {
            Some(pattern) => {
                debug!(
                    url = path_and_query,
                    pattern = pattern.as_str(),
                    "navigation route matched an allowlist pattern"
                );
                true
            }
            None => {
                debug!(
                    url = path_and_query,
                    "navigation route not used, url matches no allowlist pattern"
                );
                false
            }
        }
    }
}

impl Matcher for NavigationMatcher {
    fn matches(
        &self,
        ctx: &RouteContext,
    ) -> Result<Option<Params>, BoxError> {
        if !ctx.event().is_navigation() {
            return Ok(None);
        }
        let url = ctx.url();
        let path_and_query = match url.query() {
            Some(query) if !query.is_empty() => format!("{}?{}", url.path(), query),
            _ => url.path().to_owned(),
        };
        Ok(if self.allows(&path_and_query) {
            Some(Params::Matched)
        } else {
            None
        })
    }
}
