//! Echo handler: answers with a JSON description of what was matched.
//!
//! Used by the `sealroute match` command and handy when wiring a router up.

use http::StatusCode;
use serde_json::json;

use crate::context::Context;

/// Write `{method, path, params, version, handler, request_id}` as a 200 JSON body.
pub fn echo_handler(ctx: &mut Context) {
    let handler = ctx.route().map(|r| r.handler_name().to_string());
    let body = json!({
        "method": ctx.method().map(ToString::to_string),
        "path": ctx.path(),
        "params": ctx.params().to_map(),
        "version": ctx.api_version(),
        "handler": handler,
        "request_id": ctx.request_id().map(|id| id.to_string()),
    });
    ctx.json(StatusCode::OK, &body);
}
