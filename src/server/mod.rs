//! Serving surface: the inbound request descriptor, the response value and
//! [`Router::serve`](crate::router::Router::serve).
//!
//! The router does no socket I/O. A host adapter turns its native request into
//! a [`Request`], calls `serve`, and writes the [`Response`] it receives back.

mod request;
mod response;
mod service;

pub use request::{Body, CancelToken, Request};
pub use response::{CapturedResponse, HeaderVec, Response, ResponseSink, MAX_INLINE_HEADERS};
pub use service::write_match_error;
