use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use http::StatusCode;
use tracing::error;

use super::{ChainState, Middleware, Next};
use crate::context::Context;
use crate::error::ChainError;

/// Turns a panic anywhere further down the chain into a 500 response.
///
/// Install it first so it wraps every other link.
#[derive(Debug, Default, Clone, Copy)]
pub struct Recovery;

impl Recovery {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Middleware for Recovery {
    fn handle(&self, ctx: &mut Context, next: Next<'_>) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| next.run(ctx)));
        if let Err(payload) = outcome {
            let message = panic_message(payload.as_ref());
            error!(
                request_id = ?ctx.request_id(),
                path = %ctx.path(),
                handler_name = ctx.route().map_or("", |r| r.handler_name()),
                panic_message = %message,
                "Handler panicked - recovered"
            );
            ctx.push_error(ChainError::Panicked(message));
            ctx.response_mut().reset();
            ctx.abort_with(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
            ctx.set_chain_state(ChainState::Aborted);
        }
    }

    fn name(&self) -> &str {
        "recovery"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Chain, SharedMiddleware};
    use crate::router::Handler;
    use std::sync::Arc;

    #[test]
    fn panic_becomes_500() {
        let chain: Vec<SharedMiddleware> = vec![Arc::new(Recovery)];
        let h: Handler = Arc::new(|_ctx: &mut Context| panic!("boom"));
        let mut ctx = Context::new();

        let state = Chain::new(&chain, &h).run(&mut ctx);

        assert_eq!(state, ChainState::Aborted);
        assert_eq!(ctx.response().status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ctx.errors(), [ChainError::Panicked("boom".into())]);
    }

    #[test]
    fn no_panic_passes_through() {
        let chain: Vec<SharedMiddleware> = vec![Arc::new(Recovery)];
        let h: Handler = Arc::new(|ctx: &mut Context| ctx.set_status(StatusCode::CREATED));
        let mut ctx = Context::new();
        assert_eq!(Chain::new(&chain, &h).run(&mut ctx), ChainState::Completed);
        assert_eq!(ctx.response().status, StatusCode::CREATED);
    }
}
