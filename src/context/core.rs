use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;

use super::params::Params;
use crate::diagnostics::{DiagnosticEvent, SharedSink};
use crate::error::{ChainError, MatchError};
use crate::ids::{RequestId, TraceContext};
use crate::middleware::ChainState;
use crate::router::Route;
use crate::server::{Body, CancelToken, Request, Response};

/// Per-request state threaded through the middleware chain.
///
/// Contexts are recycled by [`ContextPool`](super::ContextPool). Handlers get a
/// `&mut Context` for the duration of the chain and must not keep anything
/// borrowed from it afterwards. Every field is cleared by [`Context::reset`].
pub struct Context {
    request: Option<Request>,
    response: Response,
    params: Params,
    route: Option<Arc<Route>>,
    aborted: bool,
    errors: Vec<ChainError>,
    request_id: Option<RequestId>,
    trace: Option<TraceContext>,
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
    chain_state: ChainState,
    version: Option<Arc<str>>,
    match_error: Option<MatchError>,
    diagnostics: Option<SharedSink>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            request: None,
            response: Response::default(),
            params: Params::new(),
            route: None,
            aborted: false,
            errors: Vec::new(),
            request_id: None,
            trace: None,
            values: HashMap::new(),
            chain_state: ChainState::Pending,
            version: None,
            match_error: None,
            diagnostics: None,
        }
    }
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an inbound request and derive its ids from the headers.
    pub fn bind(&mut self, request: Request) {
        self.request_id = Some(RequestId::from_header_or_new(request.header("x-request-id")));
        self.trace = request
            .header("traceparent")
            .and_then(TraceContext::from_traceparent);
        self.request = Some(request);
    }

    pub(crate) fn set_diagnostics(&mut self, sink: Option<SharedSink>) {
        self.diagnostics = sink;
    }

    // ----- request -----

    #[must_use]
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub fn request_mut(&mut self) -> Option<&mut Request> {
        self.request.as_mut()
    }

    /// Request path, or `""` when no request is bound.
    #[must_use]
    pub fn path(&self) -> &str {
        self.request.as_ref().map_or("", Request::path)
    }

    #[must_use]
    pub fn method(&self) -> Option<&http::Method> {
        self.request.as_ref().map(Request::method)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.as_ref().and_then(|r| r.header(name))
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.request.as_ref().and_then(|r| r.query_param(name))
    }

    pub fn take_body(&mut self) -> Option<Body> {
        self.request.as_mut().and_then(Request::take_body)
    }

    #[must_use]
    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.request.as_ref().map(Request::cancel_token)
    }

    // ----- routing results -----

    /// Path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// Route that matched this request, if any.
    #[must_use]
    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    pub(crate) fn set_route(&mut self, route: Arc<Route>) {
        self.route = Some(route);
    }

    /// API version the request was routed under.
    #[must_use]
    pub fn api_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub(crate) fn set_api_version(&mut self, version: Option<Arc<str>>) {
        self.version = version;
    }

    /// Why routing failed; set only while a fallback handler runs.
    #[must_use]
    pub fn match_error(&self) -> Option<&MatchError> {
        self.match_error.as_ref()
    }

    pub(crate) fn set_match_error(&mut self, err: MatchError) {
        self.match_error = Some(err);
    }

    // ----- ids -----

    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        self.request_id
    }

    #[must_use]
    pub fn trace(&self) -> Option<&TraceContext> {
        self.trace.as_ref()
    }

    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace.as_ref().map(|t| t.trace_id.as_str())
    }

    #[must_use]
    pub fn span_id(&self) -> Option<&str> {
        self.trace.as_ref().map(|t| t.span_id.as_str())
    }

    // ----- response -----

    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.response.status = status;
    }

    /// Set a response header. CR and LF are stripped from the value and the
    /// removal is reported to the diagnostics sink.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        if self.response.set_header(name, value.into()) {
            if let Some(sink) = &self.diagnostics {
                sink.emit(&DiagnosticEvent::HeaderInjectionSanitized {
                    header: name.to_string(),
                });
            }
        }
    }

    /// Write a JSON body with its content type.
    pub fn json(&mut self, status: StatusCode, body: &Value) {
        self.response.set_json(status, body);
    }

    /// Write a plain-text body.
    pub fn text(&mut self, status: StatusCode, body: impl Into<String>) {
        self.response.status = status;
        self.response
            .set_header("content-type", "text/plain; charset=utf-8".to_string());
        self.response.body = body.into().into_bytes();
    }

    pub(crate) fn take_response(&mut self) -> Response {
        std::mem::take(&mut self.response)
    }

    // ----- chain control -----

    /// Stop the chain. Middleware already running finish their post-processing.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Stop the chain and answer with a JSON error.
    pub fn abort_with(&mut self, status: StatusCode, message: &str) {
        self.json(status, &serde_json::json!({ "error": message }));
        self.aborted = true;
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn push_error(&mut self, err: ChainError) {
        self.errors.push(err);
    }

    #[must_use]
    pub fn errors(&self) -> &[ChainError] {
        &self.errors
    }

    #[must_use]
    pub fn chain_state(&self) -> ChainState {
        self.chain_state
    }

    pub(crate) fn set_chain_state(&mut self, state: ChainState) {
        self.chain_state = state;
    }

    // ----- middleware handoff -----

    /// Store a value for later middleware or the handler. Replaces any previous value under `key`.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Value stored under `key`, if present and of type `T`.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn remove<T: Any + Send + Sync>(&mut self, key: &str) -> Option<T> {
        let boxed = self.values.remove(key)?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    /// Clear every field so the context carries nothing from the previous request.
    pub fn reset(&mut self) {
        self.request = None;
        self.response.reset();
        self.params.clear();
        self.route = None;
        self.aborted = false;
        self.errors.clear();
        self.request_id = None;
        self.trace = None;
        self.values.clear();
        self.chain_state = ChainState::Pending;
        self.version = None;
        self.match_error = None;
        self.diagnostics = None;
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request", &self.request)
            .field("status", &self.response.status)
            .field("params", &self.params)
            .field("route", &self.route.as_ref().map(|r| r.pattern()))
            .field("aborted", &self.aborted)
            .field("errors", &self.errors)
            .field("request_id", &self.request_id)
            .field("trace", &self.trace)
            .field("values", &self.values.len())
            .field("chain_state", &self.chain_state)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
