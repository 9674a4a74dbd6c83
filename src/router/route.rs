use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use super::method::Method;
use super::radix::PatternSegment;
use crate::constraint::{Constraint, ParamConstraint};
use crate::context::Context;
use crate::error::RegistrationError;
use crate::middleware::{Middleware, SharedMiddleware};

/// Canonical handler signature: read the context, write the response into it.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// A registered route.
///
/// Built during registration; immutable once the router is frozen. The
/// effective middleware chain (router, then scopes, then route) is computed
/// at freeze time.
#[derive(Clone)]
pub struct Route {
    method: Method,
    pattern: Arc<str>,
    segments: Arc<[PatternSegment]>,
    constraints: Vec<ParamConstraint>,
    handler: Handler,
    handler_name: Arc<str>,
    version: Option<Arc<str>>,
    /// Scope and route middleware, in order.
    middleware: Vec<SharedMiddleware>,
    /// Final chain, filled by freeze.
    chain: Arc<[SharedMiddleware]>,
}

impl Route {
    pub(crate) fn new(
        method: Method,
        pattern: &str,
        segments: Vec<PatternSegment>,
        handler: Handler,
        handler_name: Arc<str>,
        version: Option<Arc<str>>,
        middleware: Vec<SharedMiddleware>,
    ) -> Self {
        Self {
            method,
            pattern: Arc::from(pattern),
            segments: Arc::from(segments),
            constraints: Vec::new(),
            handler,
            handler_name,
            version,
            middleware,
            chain: Arc::from(Vec::new()),
        }
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Absolute pattern, group prefixes included.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    #[must_use]
    pub fn constraints(&self) -> &[ParamConstraint] {
        &self.constraints
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Effective middleware chain. Empty until the router is frozen.
    #[must_use]
    pub fn chain(&self) -> &[SharedMiddleware] {
        &self.chain
    }

    /// Parameter and catch-all names, in path order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|seg| match seg {
            PatternSegment::Param(name) | PatternSegment::Wildcard(name) => Some(name.as_ref()),
            PatternSegment::Literal(_) => None,
        })
    }

    pub(crate) fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    pub(crate) fn is_static(&self) -> bool {
        !self.segments.iter().any(PatternSegment::is_dynamic)
    }

    pub(crate) fn build_chain(&mut self, router_middleware: &[SharedMiddleware]) {
        self.chain = router_middleware
            .iter()
            .chain(self.middleware.iter())
            .cloned()
            .collect();
    }

    #[must_use]
    pub fn info(&self) -> RouteInfo {
        RouteInfo {
            method: self.method,
            path: self.pattern.to_string(),
            handler: self.handler_name.to_string(),
            version: self.version.as_deref().map(str::to_string),
            constraints: self
                .constraints
                .iter()
                .map(|c| format!("{}:{}", c.param, c.constraint.kind()))
                .collect(),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("constraints", &self.constraints)
            .field("handler_name", &self.handler_name)
            .field("version", &self.version)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

/// Read-only description of a route for listings and tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    pub handler: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if let Some(version) = &self.version {
            write!(f, " [{version}]")?;
        }
        write!(f, " -> {}", self.handler)
    }
}

/// Handle to a freshly registered route, used to attach constraints and middleware.
///
/// ```rust,ignore
/// router
///     .get("/users/:id", show_user)?
///     .where_int("id")
///     .name("show_user");
/// ```
///
/// Constraints naming a parameter the pattern does not declare are ignored
/// with a warning.
pub struct RouteBuilder<'r> {
    route: &'r mut Arc<Route>,
}

impl<'r> RouteBuilder<'r> {
    pub(crate) fn new(route: &'r mut Arc<Route>) -> Self {
        Self { route }
    }

    fn route_mut(&mut self) -> &mut Route {
        Arc::make_mut(self.route)
    }

    /// Attach a constraint to `param`.
    #[must_use]
    pub fn constrain(mut self, param: &str, constraint: Constraint) -> Self {
        let Some(name) = self.route.param_names().find(|n| *n == param).map(Arc::<str>::from) else {
            warn!(
                method = %self.route.method,
                pattern = %self.route.pattern,
                param = %param,
                constraint = constraint.kind(),
                "Constraint names an unknown parameter - ignored"
            );
            return self;
        };
        self.route_mut().constraints.push(ParamConstraint {
            param: name,
            constraint,
        });
        self
    }

    #[must_use]
    pub fn where_int(self, param: &str) -> Self {
        self.constrain(param, Constraint::Int)
    }

    #[must_use]
    pub fn where_float(self, param: &str) -> Self {
        self.constrain(param, Constraint::Float)
    }

    #[must_use]
    pub fn where_uuid(self, param: &str) -> Self {
        self.constrain(param, Constraint::Uuid)
    }

    #[must_use]
    pub fn where_date(self, param: &str) -> Self {
        self.constrain(param, Constraint::Date)
    }

    #[must_use]
    pub fn where_datetime(self, param: &str) -> Self {
        self.constrain(param, Constraint::DateTime)
    }

    #[must_use]
    pub fn where_enum<I, S>(self, param: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constrain(param, Constraint::one_of(values))
    }

    /// Constrain `param` to a full match of `pattern`.
    pub fn where_regex(self, param: &str, pattern: &str) -> Result<Self, RegistrationError> {
        let constraint = Constraint::regex(param, pattern)?;
        Ok(self.constrain(param, constraint))
    }

    /// Add route-specific middleware; runs after router and scope middleware.
    #[must_use]
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.route_mut().middleware.push(Arc::new(middleware));
        self
    }

    #[must_use]
    pub fn with_shared(mut self, middleware: SharedMiddleware) -> Self {
        self.route_mut().middleware.push(middleware);
        self
    }

    /// Override the handler name shown in logs and listings.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.route_mut().handler_name = Arc::from(name);
        self
    }

    #[must_use]
    pub fn route(&self) -> &Route {
        self.route
    }
}
