use std::sync::Arc;

use http::StatusCode;
use once_cell::sync::Lazy;
use tracing::{error, warn};

use super::request::Request;
use super::response::{Response, ResponseSink};
use crate::context::Context;
use crate::diagnostics::inspect_request_headers;
use crate::error::{ChainError, MatchError};
use crate::middleware::Chain;
use crate::router::{Handler, Router};

/// Answers routing failures when no fallback handler is registered.
static DEFAULT_FALLBACK: Lazy<Handler> = Lazy::new(|| Arc::new(write_match_error));

/// Default responses for routing failures: 404, 405 with `Allow`, or 400 for an unknown version.
pub fn write_match_error(ctx: &mut Context) {
    let Some(err) = ctx.match_error().cloned() else {
        ctx.json(
            StatusCode::NOT_FOUND,
            &serde_json::json!({ "error": MatchError::NotFound.to_string() }),
        );
        return;
    };
    if let MatchError::MethodNotAllowed { allowed } = &err {
        ctx.set_header("allow", allowed.to_header_value());
    }
    ctx.json(err.status(), &serde_json::json!({ "error": err.to_string() }));
}

impl Router {
    /// Serve one request: resolve it, run its middleware chain and handler on a
    /// pooled context, then hand the response to `sink`.
    ///
    /// Routing failures go to the fallback handler (behind router-level
    /// middleware) or to [`write_match_error`]. Serving an unfrozen router is a
    /// startup bug and answers 503.
    pub fn serve(&self, req: Request, sink: &mut dyn ResponseSink) {
        if !self.is_frozen() {
            error!(
                method = %req.method(),
                path = %req.path(),
                "Router served before freeze() - rejecting request"
            );
            sink.send(Response::error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Router not ready",
            ));
            return;
        }

        let diagnostics = self.diagnostics_sink();
        if self.config().diagnostics.inspect_headers {
            inspect_request_headers(
                req.headers(),
                self.config().diagnostics.max_forwarded_hops,
                diagnostics.as_ref(),
            );
        }

        let mut ctx = self.pool().acquire();
        ctx.set_diagnostics(Some(Arc::clone(diagnostics)));

        // copy what the chain needs out of the borrowed resolution before the
        // request moves into the context
        let outcome = self.resolve_borrowed(&req).map(|found| {
            for (name, value) in &found.captures {
                ctx.params_mut().push(Arc::clone(name), (*value).to_string());
            }
            (Arc::clone(found.route), found.version.map(Arc::clone))
        });
        ctx.bind(req);

        let check_cancellation = self.config().chain.check_cancellation;
        match outcome {
            Ok((route, version)) => {
                ctx.set_api_version(version);
                ctx.set_route(Arc::clone(&route));
                Chain::new(route.chain(), route.handler())
                    .check_cancellation(check_cancellation)
                    .run(&mut ctx);
            }
            Err(err) => {
                ctx.set_match_error(err);
                let handler = self.fallback_handler().unwrap_or(&*DEFAULT_FALLBACK);
                Chain::new(self.router_middleware(), handler)
                    .check_cancellation(check_cancellation)
                    .run(&mut ctx);
            }
        }

        let response = finish_response(&mut ctx);
        self.pool().release(ctx);
        sink.send(response);
    }
}

/// Take the response off the context, filling in cancellation statuses and the request id.
fn finish_response(ctx: &mut Context) -> Response {
    let untouched = ctx.response().status == StatusCode::OK && ctx.response().body.is_empty();
    if untouched {
        let stopped = ctx.errors().iter().find_map(|e| match e {
            ChainError::DeadlineExceeded => Some((StatusCode::GATEWAY_TIMEOUT, "Deadline exceeded")),
            ChainError::Cancelled => Some((StatusCode::SERVICE_UNAVAILABLE, "Request cancelled")),
            _ => None,
        });
        if let Some((status, message)) = stopped {
            warn!(path = %ctx.path(), status = status.as_u16(), "Chain stopped before a response was written");
            ctx.json(status, &serde_json::json!({ "error": message }));
        }
    }
    if ctx.response().get_header("x-request-id").is_none() {
        if let Some(id) = ctx.request_id() {
            ctx.set_header("x-request-id", id.to_string());
        }
    }
    ctx.take_response()
}
