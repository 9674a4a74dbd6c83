//! Per-request context, parameter storage and the context pool.

mod core;
mod params;
mod pool;

pub use self::core::Context;
pub use params::{ParamVec, Params, MAX_INLINE_PARAMS};
pub use pool::{ContextPool, PoolStats, DEFAULT_POOL_CAPACITY};
