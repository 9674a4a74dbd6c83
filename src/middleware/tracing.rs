use std::time::Instant;

use tracing::{field, info, info_span};

use super::{Middleware, Next};
use crate::context::Context;

/// Opens a `request` span around the rest of the chain and records status and latency.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn handle(&self, ctx: &mut Context, next: Next<'_>) {
        let span = info_span!(
            "request",
            method = ?ctx.method(),
            path = %ctx.path(),
            request_id = ?ctx.request_id(),
            trace_id = ctx.trace_id().unwrap_or(""),
            handler = ctx.route().map_or("", |r| r.handler_name()),
            status = field::Empty,
            latency_ms = field::Empty,
        );
        let _guard = span.enter();
        let start = Instant::now();

        next.run(ctx);

        let latency = start.elapsed();
        let status = ctx.response().status.as_u16();
        span.record("status", status);
        span.record("latency_ms", latency.as_millis() as u64);
        info!(
            status,
            latency_us = latency.as_micros() as u64,
            state = ?ctx.chain_state(),
            "Request complete"
        );
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
