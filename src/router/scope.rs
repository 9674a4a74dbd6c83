use std::sync::Arc;

use super::core::{join_path, Router};
use super::method::Method;
use super::route::RouteBuilder;
use crate::context::Context;
use crate::error::RegistrationError;
use crate::middleware::{Middleware, SharedMiddleware};

/// Registration handle for a group or version.
///
/// A scope only exists while routes are being registered: its prefix is
/// folded into each route's pattern and its middleware copied onto each
/// route, so nothing of it remains at serving time. Nested scopes inherit
/// the parent's prefix, middleware and version.
///
/// ```rust
/// use sealroute::context::Context;
/// use sealroute::middleware::Next;
/// use sealroute::router::Router;
///
/// let mut router = Router::default();
/// let mut api = router
///     .group("/api/v1")
///     .with(|ctx: &mut Context, next: Next<'_>| next.run(ctx));
/// api.get("/users", |_ctx: &mut Context| {}).unwrap();
/// let mut admin = api.group("/admin");
/// admin.delete("/users/:id", |_ctx: &mut Context| {}).unwrap();
///
/// let paths: Vec<_> = router.routes().into_iter().map(|r| r.path).collect();
/// assert_eq!(paths, ["/api/v1/users", "/api/v1/admin/users/:id"]);
/// ```
pub struct Scope<'r> {
    router: &'r mut Router,
    prefix: String,
    middleware: Vec<SharedMiddleware>,
    version: Option<Arc<str>>,
}

impl<'r> Scope<'r> {
    pub(crate) fn new(
        router: &'r mut Router,
        prefix: String,
        middleware: Vec<SharedMiddleware>,
        version: Option<Arc<str>>,
    ) -> Self {
        Self {
            router,
            prefix,
            middleware,
            version,
        }
    }

    /// Add middleware for routes registered through this scope from now on.
    #[must_use]
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Nested group: prefix appended, middleware and version inherited.
    pub fn group(&mut self, prefix: &str) -> Scope<'_> {
        Scope {
            prefix: join_path(&self.prefix, prefix.trim_end_matches('/')),
            middleware: self.middleware.clone(),
            version: self.version.clone(),
            router: &mut *self.router,
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

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
        self.router.add_route(
            self.version.as_ref(),
            &self.prefix,
            &self.middleware,
            method,
            pattern,
            Arc::new(handler),
            name,
        )
    }

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
}
