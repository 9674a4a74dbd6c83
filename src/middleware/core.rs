use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::router::Handler;
use crate::server::CancelToken;

/// Lifecycle of one chain execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChainState {
    /// Not dispatched yet.
    #[default]
    Pending,
    /// Middleware are running.
    Running,
    /// Some link stopped the chain before the handler finished.
    Aborted,
    /// The handler ran.
    Completed,
}

/// A link in the chain.
///
/// Call `next.run(ctx)` to continue; code after that call is post-processing
/// and runs once everything inside has returned. Returning without calling
/// `next` stops the chain and leaves it [`ChainState::Aborted`].
///
/// Any `Fn(&mut Context, Next<'_>)` closure is a middleware.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: &mut Context, next: Next<'_>);

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Middleware for F
where
    F: Fn(&mut Context, Next<'_>) + Send + Sync,
{
    fn handle(&self, ctx: &mut Context, next: Next<'_>) {
        self(ctx, next);
    }

    fn name(&self) -> &str {
        "fn"
    }
}

/// Shared middleware handle stored on routes and scopes.
pub type SharedMiddleware = Arc<dyn Middleware>;

/// The remainder of a chain, handed to each middleware.
pub struct Next<'a> {
    rest: &'a [SharedMiddleware],
    handler: &'a Handler,
    check_cancellation: bool,
}

impl<'a> Next<'a> {
    /// Run the next link, or the handler when no middleware remain.
    ///
    /// Nothing runs if the context was aborted or, with cancellation checks on,
    /// the request's token fired or its deadline passed.
    pub fn run(self, ctx: &mut Context) {
        if ctx.is_aborted() {
            ctx.set_chain_state(ChainState::Aborted);
            return;
        }
        if self.check_cancellation {
            if let Some(err) = ctx.cancel_token().and_then(CancelToken::check) {
                debug!(
                    path = %ctx.path(),
                    reason = %err,
                    remaining = self.rest.len(),
                    "Chain stopped by cancellation"
                );
                ctx.push_error(err);
                ctx.abort();
                ctx.set_chain_state(ChainState::Aborted);
                return;
            }
        }
        match self.rest.split_first() {
            Some((middleware, rest)) => middleware.handle(
                ctx,
                Next {
                    rest,
                    handler: self.handler,
                    check_cancellation: self.check_cancellation,
                },
            ),
            None => {
                (self.handler)(ctx);
                ctx.set_chain_state(ChainState::Completed);
            }
        }
    }

    /// Middleware still to run before the handler.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

/// Executes middleware in order around a handler.
///
/// The executor does not catch panics; install [`Recovery`](super::Recovery)
/// as the first link for that.
pub struct Chain<'a> {
    middleware: &'a [SharedMiddleware],
    handler: &'a Handler,
    check_cancellation: bool,
}

impl<'a> Chain<'a> {
    #[must_use]
    pub fn new(middleware: &'a [SharedMiddleware], handler: &'a Handler) -> Self {
        Self {
            middleware,
            handler,
            check_cancellation: true,
        }
    }

    /// Toggle the cancellation check between steps.
    #[must_use]
    pub fn check_cancellation(mut self, enabled: bool) -> Self {
        self.check_cancellation = enabled;
        self
    }

    /// Run the chain and return its final state (also stored on the context).
    pub fn run(&self, ctx: &mut Context) -> ChainState {
        ctx.set_chain_state(ChainState::Running);
        Next {
            rest: self.middleware,
            handler: self.handler,
            check_cancellation: self.check_cancellation,
        }
        .run(ctx);
        if ctx.chain_state() == ChainState::Running {
            ctx.set_chain_state(ChainState::Aborted);
        }
        ctx.chain_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;
    use crate::server::Request;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, name: &'static str) -> SharedMiddleware {
        let log = Arc::clone(log);
        Arc::new(move |ctx: &mut Context, next: Next<'_>| {
            log.lock().unwrap().push(format!("{name}:before"));
            next.run(ctx);
            log.lock().unwrap().push(format!("{name}:after"));
        })
    }

    fn handler(log: &Log) -> Handler {
        let log = Arc::clone(log);
        Arc::new(move |_ctx: &mut Context| log.lock().unwrap().push("handler".into()))
    }

    #[test]
    fn links_wrap_the_handler_in_order() {
        let log: Log = Arc::default();
        let chain = vec![recorder(&log, "a"), recorder(&log, "b")];
        let h = handler(&log);
        let mut ctx = Context::new();
        assert_eq!(Chain::new(&chain, &h).run(&mut ctx), ChainState::Completed);
        assert_eq!(
            *log.lock().unwrap(),
            ["a:before", "b:before", "handler", "b:after", "a:after"]
        );
    }

    #[test]
    fn skipping_next_aborts() {
        let log: Log = Arc::default();
        let gate: SharedMiddleware = Arc::new(|_ctx: &mut Context, _next: Next<'_>| {});
        let chain = vec![recorder(&log, "a"), gate, recorder(&log, "c")];
        let h = handler(&log);
        let mut ctx = Context::new();
        assert_eq!(Chain::new(&chain, &h).run(&mut ctx), ChainState::Aborted);
        assert_eq!(*log.lock().unwrap(), ["a:before", "a:after"]);
    }

    #[test]
    fn cancelled_request_stops_between_steps() {
        let log: Log = Arc::default();
        let token = CancelToken::new();
        let host = token.clone();
        let cancel: SharedMiddleware = Arc::new(move |ctx: &mut Context, next: Next<'_>| {
            host.cancel();
            next.run(ctx);
        });
        let chain = vec![cancel, recorder(&log, "b")];
        let h = handler(&log);
        let mut ctx = Context::new();
        ctx.bind(Request::new(http::Method::GET, "/").with_cancel(token));

        assert_eq!(Chain::new(&chain, &h).run(&mut ctx), ChainState::Aborted);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(ctx.errors(), [ChainError::Cancelled]);
    }

    #[test]
    fn cancellation_check_can_be_disabled() {
        let log: Log = Arc::default();
        let token = CancelToken::new();
        token.cancel();
        let h = handler(&log);
        let mut ctx = Context::new();
        ctx.bind(Request::new(http::Method::GET, "/").with_cancel(token));

        let state = Chain::new(&[], &h).check_cancellation(false).run(&mut ctx);
        assert_eq!(state, ChainState::Completed);
        assert_eq!(*log.lock().unwrap(), ["handler"]);
    }
}
