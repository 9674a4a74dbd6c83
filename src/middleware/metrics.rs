use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::{ChainState, Middleware, Next};
use crate::context::Context;

/// Request counters kept with atomics.
///
/// Counts every request that passes through, the chains that ended
/// [`ChainState::Aborted`], 5xx responses and cumulative latency.
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    aborted_count: AtomicUsize,
    server_errors: AtomicUsize,
    total_latency_ns: AtomicU64,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of requests observed.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Requests whose chain did not reach completion.
    pub fn aborted_count(&self) -> usize {
        self.aborted_count.load(Ordering::Relaxed)
    }

    pub fn server_errors(&self) -> usize {
        self.server_errors.load(Ordering::Relaxed)
    }

    /// Mean time spent in the rest of the chain; zero before the first request.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }
}

impl Middleware for MetricsMiddleware {
    fn handle(&self, ctx: &mut Context, next: Next<'_>) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        next.run(ctx);

        self.total_latency_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
        // inner links may still be running when the chain stops, so Running counts too
        if ctx.chain_state() != ChainState::Completed || ctx.is_aborted() {
            self.aborted_count.fetch_add(1, Ordering::Relaxed);
        }
        if ctx.response().status.is_server_error() {
            self.server_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn name(&self) -> &str {
        "metrics"
    }
}
