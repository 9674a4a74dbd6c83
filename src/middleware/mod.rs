//! Middleware chain executor and built-in middleware.
//!
//! A chain is router-level middleware, then group middleware, then route
//! middleware, each in registration order, wrapped around the route handler.
//! [`Chain::run`] drives it and records a [`ChainState`] on the context.

mod core;
mod metrics;
mod recovery;
mod tracing;

pub use self::core::{Chain, ChainState, Middleware, Next, SharedMiddleware};
pub use metrics::MetricsMiddleware;
pub use recovery::Recovery;
pub use self::tracing::TracingMiddleware;
