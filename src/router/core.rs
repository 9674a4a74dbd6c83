//! Router core: registration, freeze and request resolution.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::method::Method;
use super::radix::{parse_pattern, Captures};
use super::route::{Handler, Route, RouteBuilder, RouteInfo};
use super::scope::Scope;
use super::table::RouteTable;
use crate::context::{Context, ContextPool, Params, MAX_INLINE_PARAMS};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink, SharedSink, TracingSink};
use crate::error::{MatchError, RegistrationError};
use crate::middleware::{Middleware, SharedMiddleware};
use crate::runtime_config::RouterConfig;
use crate::server::Request;

/// Result of resolving a request to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route (shared with the table).
    pub route: Arc<Route>,
    /// Path parameters, in path order.
    pub params: Params,
    /// Version table the route came from, if any.
    pub version: Option<Arc<str>>,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics for duplicate names.
    #[inline]
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        self.route.handler_name()
    }
}

/// Route resolution borrowed from the router and the request.
pub(crate) struct Resolution<'a> {
    pub(crate) route: &'a Arc<Route>,
    pub(crate) captures: Captures<'a>,
    pub(crate) version: Option<&'a Arc<str>>,
}

/// HTTP router with a segment trie, static-path prefilter and per-version tables.
///
/// Routes are registered during startup, then [`Router::freeze`] seals the
/// table. After freeze the router is read-only and can be shared across
/// threads (`Arc<Router>`) without locks; only the context pool synchronizes.
///
/// # Example
///
/// ```rust
/// use sealroute::context::Context;
/// use sealroute::router::Router;
/// use sealroute::server::{CapturedResponse, Request};
/// use http::{Method, StatusCode};
///
/// let mut router = Router::default();
/// router
///     .get("/users/:id", |ctx: &mut Context| {
///         let id = ctx.param("id").unwrap_or_default().to_string();
///         ctx.text(StatusCode::OK, id);
///     })
///     .unwrap()
///     .where_int("id");
/// router.freeze();
///
/// let mut out = CapturedResponse::new();
/// router.serve(Request::new(Method::GET, "/users/42"), &mut out);
/// assert_eq!(out.take().unwrap().body_str(), Some("42"));
/// ```
pub struct Router {
    config: RouterConfig,
    base: RouteTable,
    versions: BTreeMap<Arc<str>, RouteTable>,
    middleware: Vec<SharedMiddleware>,
    fallback: Option<Handler>,
    diagnostics: SharedSink,
    pool: ContextPool,
    frozen: bool,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl Router {
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        let pool = ContextPool::with_prewarm(config.pool.capacity, config.pool.prewarm);
        Self {
            base: Self::new_table(&config),
            versions: BTreeMap::new(),
            middleware: Vec::new(),
            fallback: None,
            diagnostics: Arc::new(TracingSink),
            pool,
            frozen: false,
            config,
        }
    }

    fn new_table(config: &RouterConfig) -> RouteTable {
        RouteTable::new(config.bloom.bits, config.bloom.hashes, config.bloom.enabled)
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    // ----- registration -----

    pub fn get<H>(&mut self, pattern: &str, handler: H) -> Result<RouteBuilder<'_>, RegistrationError>
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Get, pattern, handler)
    }

    pub fn post<H>(&mut self, pattern: &str, handler: H) -> Result<RouteBuilder<'_>, RegistrationError>
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Post, pattern, handler)
    }

    pub fn put<H>(&mut self, pattern: &str, handler: H) -> Result<RouteBuilder<'_>, RegistrationError>
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Put, pattern, handler)
    }

    pub fn delete<H>(&mut self, pattern: &str, handler: H) -> Result<RouteBuilder<'_>, RegistrationError>
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Delete, pattern, handler)
    }

    pub fn patch<H>(&mut self, pattern: &str, handler: H) -> Result<RouteBuilder<'_>, RegistrationError>
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Patch, pattern, handler)
    }

    pub fn head<H>(&mut self, pattern: &str, handler: H) -> Result<RouteBuilder<'_>, RegistrationError>
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Head, pattern, handler)
    }

    pub fn options<H>(&mut self, pattern: &str, handler: H) -> Result<RouteBuilder<'_>, RegistrationError>
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::Options, pattern, handler)
    }

    /// Register `handler` for `method` and `pattern`.
    pub fn route<H>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<RouteBuilder<'_>, RegistrationError>
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        let name: Arc<str> = Arc::from(std::any::type_name::<H>());
        self.add_route(None, "", &[], method, pattern, Arc::new(handler), name)
    }

    /// Register an already shared handler.
    pub fn route_shared(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Handler,
    ) -> Result<RouteBuilder<'_>, RegistrationError> {
        self.add_route(None, "", &[], method, pattern, handler, Arc::from("handler"))
    }

    /// Shared registration path for the router and its scopes.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn add_route(
        &mut self,
        version: Option<&Arc<str>>,
        prefix: &str,
        scope_middleware: &[SharedMiddleware],
        method: Method,
        pattern: &str,
        handler: Handler,
        handler_name: Arc<str>,
    ) -> Result<RouteBuilder<'_>, RegistrationError> {
        let full = join_path(prefix, pattern);
        if self.frozen {
            warn!(method = %method, pattern = %full, "Registration after freeze rejected");
            return Err(RegistrationError::AlreadyFrozen {
                method,
                pattern: full,
            });
        }

        let segments = parse_pattern(&full)?;
        let route = Route::new(
            method,
            &full,
            segments,
            handler,
            handler_name,
            version.map(Arc::clone),
            scope_middleware.to_vec(),
        );
        let params = route.param_names().count();
        if params > MAX_INLINE_PARAMS {
            self.diagnostics.emit(&DiagnosticEvent::HighParamCount {
                method: method.to_string(),
                pattern: full.clone(),
                params,
            });
        }

        let bloom = &self.config.bloom;
        let table = match version {
            Some(v) => self
                .versions
                .entry(Arc::clone(v))
                .or_insert_with(|| RouteTable::new(bloom.bits, bloom.hashes, bloom.enabled)),
            None => &mut self.base,
        };
        let slot = table.insert(route).inspect_err(|e| {
            warn!(error = %e, "Route registration failed");
        })?;
        debug!(
            method = %method,
            pattern = %full,
            version = version.map_or("", |v| v.as_ref()),
            params,
            "Route registered"
        );
        Ok(RouteBuilder::new(slot))
    }

    /// Open a group whose routes share `prefix` and the group's middleware.
    pub fn group(&mut self, prefix: &str) -> Scope<'_> {
        Scope::new(self, prefix.trim_end_matches('/').to_string(), Vec::new(), None)
    }

    /// Open a version scope. Routes registered through it go into the version's own table.
    pub fn version(&mut self, name: &str) -> Scope<'_> {
        let name: Arc<str> = Arc::from(name);
        if self.frozen {
            warn!(version = %name, "Version declared after freeze; its routes will be rejected");
        } else if !self.versions.contains_key(&name) {
            let table = Self::new_table(&self.config);
            self.versions.insert(Arc::clone(&name), table);
        }
        Scope::new(self, String::new(), Vec::new(), Some(name))
    }

    /// Add router-level middleware; it runs before group and route middleware.
    pub fn use_middleware(
        &mut self,
        middleware: impl Middleware + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        self.use_shared(Arc::new(middleware))
    }

    pub fn use_shared(&mut self, middleware: SharedMiddleware) -> Result<&mut Self, RegistrationError> {
        if self.frozen {
            return Err(RegistrationError::AlreadyFrozenSetting {
                setting: format!("middleware '{}'", middleware.name()),
            });
        }
        self.middleware.push(middleware);
        Ok(self)
    }

    /// Handler for requests that match no route. It runs behind the router-level
    /// middleware with [`Context::match_error`] set.
    pub fn fallback<H>(&mut self, handler: H) -> Result<&mut Self, RegistrationError>
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        if self.frozen {
            return Err(RegistrationError::AlreadyFrozenSetting {
                setting: "fallback handler".to_string(),
            });
        }
        self.fallback = Some(Arc::new(handler));
        Ok(self)
    }

    /// Replace the diagnostics sink (default: [`TracingSink`]).
    pub fn diagnostics(&mut self, sink: impl DiagnosticSink + 'static) -> &mut Self {
        self.diagnostics = Arc::new(sink);
        self
    }

    /// Seal the route table and compute every route's middleware chain.
    ///
    /// Calling it twice is a no-op.
    pub fn freeze(&mut self) {
        if self.frozen {
            return;
        }
        let router_middleware = self.middleware.clone();
        for table in std::iter::once(&mut self.base).chain(self.versions.values_mut()) {
            for route in table.routes_mut() {
                Arc::make_mut(route).build_chain(&router_middleware);
            }
        }
        if let Some(default) = &self.config.versioning.default_version {
            if !self.versions.contains_key(default.as_str()) {
                warn!(
                    default_version = %default,
                    "Default version is not registered; unversioned requests use the base table"
                );
            }
        }
        self.frozen = true;

        let routes = self.routes();
        let summary: Vec<String> = routes.iter().take(10).map(ToString::to_string).collect();
        info!(
            routes_count = routes.len(),
            versions = ?self.versions.keys().collect::<Vec<_>>(),
            middleware = self.middleware.len(),
            bloom_bits = self.base.bloom().bits(),
            bloom_fp_rate = self.base.bloom().estimated_false_positive_rate(),
            routes_summary = ?summary,
            "Route table frozen"
        );
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    // ----- resolution -----

    /// Resolve a request to a route without running anything.
    pub fn resolve(&self, req: &Request) -> Result<RouteMatch, MatchError> {
        let found = self.resolve_borrowed(req)?;
        let mut params = Params::new();
        for (name, value) in &found.captures {
            params.push(Arc::clone(name), (*value).to_string());
        }
        Ok(RouteMatch {
            route: Arc::clone(found.route),
            params,
            version: found.version.map(Arc::clone),
        })
    }

    /// Resolve a method and path, ignoring header and query version detection.
    pub fn match_route(&self, method: http::Method, path: &str) -> Result<RouteMatch, MatchError> {
        self.resolve(&Request::new(method, path))
    }

    pub(crate) fn resolve_borrowed<'a>(&'a self, req: &'a Request) -> Result<Resolution<'a>, MatchError> {
        debug!(method = %req.method(), path = %req.path(), "Route match attempt");
        let start = Instant::now();
        let result = self.lookup(req);
        let elapsed = start.elapsed();

        match &result {
            Ok(found) => {
                let route = found.route;
                if elapsed > Duration::from_millis(1) {
                    warn!(
                        method = %req.method(),
                        path = %req.path(),
                        handler_name = %route.handler_name(),
                        route_pattern = %route.pattern(),
                        duration_us = elapsed.as_micros() as u64,
                        "Slow route matching detected"
                    );
                } else {
                    debug!(
                        method = %req.method(),
                        path = %req.path(),
                        handler_name = %route.handler_name(),
                        route_pattern = %route.pattern(),
                        version = found.version.map_or("", |v| v.as_ref()),
                        duration_us = elapsed.as_micros() as u64,
                        "Route matched"
                    );
                }
            }
            Err(err) => debug!(
                method = %req.method(),
                path = %req.path(),
                error = %err,
                duration_us = elapsed.as_micros() as u64,
                "No route matched"
            ),
        }
        result
    }

    fn lookup<'a>(&'a self, req: &'a Request) -> Result<Resolution<'a>, MatchError> {
        let method = Method::from_http(req.method());
        let path = req.path();

        let Some((version, table, routed)) = self.select_version(req)? else {
            let (route, captures) = self.base.resolve(method, path)?;
            return Ok(Resolution {
                route,
                captures,
                version: None,
            });
        };

        match table.resolve(method, routed) {
            Ok((route, captures)) => Ok(Resolution {
                route,
                captures,
                version: Some(version),
            }),
            // unversioned routes still serve requests that carry a version
            Err(MatchError::NotFound) => {
                let (route, captures) = self.base.resolve(method, path)?;
                Ok(Resolution {
                    route,
                    captures,
                    version: None,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Pick the version table for `req`: `Ok(None)` routes through the base table.
    #[allow(clippy::type_complexity)]
    fn select_version<'a>(
        &'a self,
        req: &'a Request,
    ) -> Result<Option<(&'a Arc<str>, &'a RouteTable, &'a str)>, MatchError> {
        if self.versions.is_empty() {
            return Ok(None);
        }
        let versioning = &self.config.versioning;
        let is_registered = |name: &str| self.versions.contains_key(name);
        if let Some(detected) = versioning.detect(req, &is_registered) {
            return match self.versions.get_key_value(&*detected.name) {
                Some((name, table)) => Ok(Some((name, table, detected.path))),
                None => Err(MatchError::UnknownVersion {
                    version: detected.name.into_owned(),
                }),
            };
        }
        Ok(versioning
            .default_version
            .as_deref()
            .and_then(|v| self.versions.get_key_value(v))
            .map(|(name, table)| (name, table, req.path())))
    }

    // ----- introspection -----

    /// Every registered route, unversioned first, then by version name.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        std::iter::once(&self.base)
            .chain(self.versions.values())
            .flat_map(|t| t.routes().iter().map(|r| r.info()))
            .collect()
    }

    /// Print all registered routes to stdout
    pub fn dump_routes(&self) {
        let routes = self.routes();
        println!(
            "[routes] count={} versions={} frozen={}",
            routes.len(),
            self.versions.len(),
            self.frozen
        );
        for route in &routes {
            println!("[route] {route}");
        }
    }

    /// Names of registered versions.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(|k| k.as_ref())
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    pub(crate) fn router_middleware(&self) -> &[SharedMiddleware] {
        &self.middleware
    }

    pub(crate) fn fallback_handler(&self) -> Option<&Handler> {
        self.fallback.as_ref()
    }

    pub(crate) fn diagnostics_sink(&self) -> &SharedSink {
        &self.diagnostics
    }
}

/// Join a scope prefix and a route pattern: `/api` + `/users` -> `/api/users`.
pub(crate) fn join_path(prefix: &str, pattern: &str) -> String {
    if prefix.is_empty() {
        return pattern.to_string();
    }
    if pattern.is_empty() {
        return prefix.to_string();
    }
    let prefix = prefix.trim_end_matches('/');
    if pattern.starts_with('/') {
        format!("{prefix}{pattern}")
    } else {
        format!("{prefix}/{pattern}")
    }
}
