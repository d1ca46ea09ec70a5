//! Declarative router configuration.
//!
//! A TOML file names the routes, and a [`HandlerRegistry`] supplies the
//! handlers those routes refer to by name:
//!
//! ```toml
//! scope = "https://app.example.com/"
//! default_handler = "network"
//! catch_handler = "offline"
//!
//! [[routes]]
//! pattern = "/api/.*\\.json"
//! handler = "api"
//! method = "POST"
//!
//! [navigation]
//! handler = "shell"
//! denylist = ["^/admin"]
//! ```
//!
//! Loading is split into parsing (serde) and a semantic validation pass that
//! reports every problem at once. Routes are registered in file order,
//! followed by the navigation route.
use crate::{
    error::RouteError,
    handler::Handler,
    navigation::NavigationOptions,
    route::Route,
    router::Router,
};
use http::Method;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path, sync::Arc};
use tracing::info;
use url::Url;

/// Handlers available to a configuration, by name
pub type HandlerRegistry = HashMap<String, Arc<dyn Handler>>;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouterConfig {
    /// URL the intercepting agent is registered for
    pub scope: String,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    #[serde(default)]
    pub navigation: Option<NavigationConfig>,

    #[serde(default)]
    pub default_handler: Option<String>,

    #[serde(default)]
    pub catch_handler: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Origin aware regex, see [`crate::PatternMatcher`]
    pub pattern: String,

    pub handler: String,

    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    Method::GET.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NavigationConfig {
    pub handler: String,

    #[serde(default)]
    pub allowlist: Vec<String>,

    #[serde(default)]
    pub denylist: Vec<String>,
}

impl RouterConfig {
    pub fn from_toml(content: &str) -> Result<Self, RouteError> {
        Ok(toml::from_str(content)?)
    }
}

/// Load a configuration from a TOML file
pub fn load_config(path: &Path) -> Result<RouterConfig, RouteError> {
    let content = fs::read_to_string(path)?;
    RouterConfig::from_toml(&content)
}

fn parse_method(method: &str) -> Result<Method, RouteError> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| RouteError::InvalidMethod(method.to_owned()))
}

/// Checks everything serde can't, returning all problems found
pub fn validate(
    config: &RouterConfig,
    handlers: &HandlerRegistry,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    let check_handler = |errors: &mut Vec<String>, what: &str, name: &str| {
        if !handlers.contains_key(name) {
            errors.push(format!("{} refers to unknown handler {:?}", what, name));
        }
    };

    if let Err(err) = Url::parse(&config.scope) {
        errors.push(format!("scope {:?} is not a valid url: {}", config.scope, err));
    }
    for (i, route) in config.routes.iter().enumerate() {
        let what = format!("routes[{}]", i);
        if let Err(err) = Regex::new(&route.pattern) {
            errors.push(format!("{} has an invalid pattern: {}", what, err));
        }
        if let Err(err) = parse_method(&route.method) {
            errors.push(format!("{}: {}", what, err));
        }
        check_handler(&mut errors, &what, &route.handler);
    }
    if let Some(navigation) = &config.navigation {
        for pattern in navigation.allowlist.iter().chain(&navigation.denylist) {
            if let Err(err) = Regex::new(pattern) {
                errors.push(format!("navigation has an invalid pattern: {}", err));
            }
        }
        check_handler(&mut errors, "navigation", &navigation.handler);
    }
    if let Some(name) = &config.default_handler {
        check_handler(&mut errors, "default_handler", name);
    }
    if let Some(name) = &config.catch_handler {
        check_handler(&mut errors, "catch_handler", name);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn lookup(
    handlers: &HandlerRegistry,
    name: &str,
) -> Result<Arc<dyn Handler>, RouteError> {
    handlers
        .get(name)
        .cloned()
        .ok_or_else(|| RouteError::Config(vec![format!("unknown handler {:?}", name)]))
}

impl Router {
    /// Builds a router from a validated configuration
    pub fn from_config(
        config: &RouterConfig,
        handlers: &HandlerRegistry,
    ) -> Result<Self, RouteError> {
        validate(config, handlers).map_err(RouteError::Config)?;
        let scope = Url::parse(&config.scope).map_err(|source| RouteError::InvalidUrl {
            input: config.scope.clone(),
            source,
        })?;
        let router = Router::new(scope);

        for route in &config.routes {
            let handler = lookup(handlers, &route.handler)?;
            let built = Route::pattern(Regex::new(&route.pattern)?, handler)
                .with_method(parse_method(&route.method)?)?;
            router.register(built);
        }
        if let Some(navigation) = &config.navigation {
            let options = NavigationOptions {
                allowlist: navigation
                    .allowlist
                    .iter()
                    .map(|pattern| Regex::new(pattern))
                    .collect::<Result<_, _>>()?,
                denylist: navigation
                    .denylist
                    .iter()
                    .map(|pattern| Regex::new(pattern))
                    .collect::<Result<_, _>>()?,
            };
            router.register(Route::navigation(lookup(handlers, &navigation.handler)?, options));
        }
        if let Some(name) = &config.default_handler {
            router.set_default_handler(lookup(handlers, name)?);
        }
        if let Some(name) = &config.catch_handler {
            router.set_catch_handler(lookup(handlers, name)?);
        }

        info!(
            scope = %router.scope(),
            routes = config.routes.len(),
            navigation = config.navigation.is_some(),
            "router configured"
        );
        Ok(router)
    }
}
