//! Route lookup.
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes checked in priority order, ties keep config order
//! - Explicit no-match rather than silent default

use axum::http::{request::Parts, uri::PathAndQuery, Uri};

use crate::config::RouteConfig;
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher};

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    /// Logical service the route forwards to.
    pub service: String,
    matcher: AndMatcher,
    strip: Option<PathPrefixMatcher>,
}

impl Route {
    /// Uri to forward: the matched prefix removed when stripping is enabled.
    pub fn rewrite_uri(&self, uri: &Uri) -> Uri {
        let Some(strip) = &self.strip else {
            return uri.clone();
        };
        if strip.prefix() == "/" {
            return uri.clone();
        }

        let rest = uri.path().strip_prefix(strip.prefix()).unwrap_or(uri.path());
        let path = if rest.is_empty() { "/" } else { rest };
        let rewritten = match uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        };

        let mut parts = uri.clone().into_parts();
        parts.path_and_query = PathAndQuery::try_from(rewritten).ok();
        Uri::from_parts(parts).unwrap_or_else(|_| uri.clone())
    }
}

/// Routing table resolving requests to logical services.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn from_config(mut configs: Vec<RouteConfig>) -> Self {
        configs.sort_by(|a, b| b.priority.cmp(&a.priority));

        let routes = configs
            .into_iter()
            .map(|config| {
                let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
                if let Some(host) = &config.host {
                    matchers.push(Box::new(HostMatcher::new(host.clone())));
                }
                let prefix = config.path_prefix.as_deref().map(PathPrefixMatcher::new);
                if let Some(prefix) = &prefix {
                    matchers.push(Box::new(prefix.clone()));
                }
                Route {
                    name: config.name,
                    service: config.service,
                    matcher: AndMatcher::new(matchers),
                    strip: prefix.filter(|_| config.strip_prefix),
                }
            })
            .collect();

        Self { routes }
    }

    /// First route matching the request.
    pub fn match_request(&self, req: &Parts) -> Option<&Route> {
        self.routes.iter().find(|route| route.matcher.matches(req))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
