use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;
use smallvec::SmallVec;

use crate::diagnostics::sanitize_header_value;

/// Maximum inline headers before heap allocation.
/// Most responses carry ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage.
///
/// Header names use `Arc<str>`: they repeat across responses and clone in O(1).
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Response produced by the handler chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl Response {
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }

    /// JSON response with a `content-type` header.
    #[must_use]
    pub fn json(status: StatusCode, body: &Value) -> Self {
        let mut res = Self::new(status);
        res.set_json(status, body);
        res
    }

    /// `{"error": message}` JSON response.
    #[must_use]
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    pub(crate) fn set_json(&mut self, status: StatusCode, body: &Value) {
        self.status = status;
        self.set_header("content-type", "application/json".to_string());
        self.body = body.to_string().into_bytes();
    }

    /// Get a header by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header. CR and LF are stripped from the value;
    /// returns `true` when something was stripped.
    pub fn set_header(&mut self, name: &str, mut value: String) -> bool {
        let sanitized = sanitize_header_value(&mut value);
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
        sanitized
    }

    /// Body as UTF-8, if it is.
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Body parsed as JSON, if it is.
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Back to an empty 200, keeping buffer capacity.
    pub fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
    }
}

/// Where [`Router::serve`](crate::router::Router::serve) writes the finished response.
pub trait ResponseSink {
    fn send(&mut self, response: Response);
}

impl<F> ResponseSink for F
where
    F: FnMut(Response),
{
    fn send(&mut self, response: Response) {
        self(response);
    }
}

/// Sink that keeps the last response; handy for tests and the CLI.
#[derive(Debug, Default)]
pub struct CapturedResponse(pub Option<Response>);

impl CapturedResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn take(&mut self) -> Option<Response> {
        self.0.take()
    }
}

impl ResponseSink for CapturedResponse {
    fn send(&mut self, response: Response) {
        self.0 = Some(response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_is_json() {
        let res = Response::error(StatusCode::NOT_FOUND, "Not Found");
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.get_header("Content-Type"), Some("application/json"));
        assert_eq!(res.body_json().unwrap()["error"], "Not Found");
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut res = Response::default();
        res.set_header("X-Trace", "a".into());
        res.set_header("x-trace", "b".into());
        assert_eq!(res.headers.len(), 1);
        assert_eq!(res.get_header("X-TRACE"), Some("b"));
    }

    #[test]
    fn set_header_strips_crlf() {
        let mut res = Response::default();
        assert!(res.set_header("Location", "/next\r\nSet-Cookie: admin=1".into()));
        assert_eq!(res.get_header("location"), Some("/nextSet-Cookie: admin=1"));
        assert!(!res.set_header("Location", "/clean".into()));
        assert_eq!(res.get_header("location"), Some("/clean"));
    }

    #[test]
    fn reset_returns_to_empty_ok() {
        let mut res = Response::error(StatusCode::BAD_REQUEST, "bad");
        res.reset();
        assert_eq!(res, Response::default());
    }
}
