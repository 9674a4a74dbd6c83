//! # Router Module
//!
//! Path matching and route resolution.
//!
//! ## Overview
//!
//! Each route table combines three structures:
//!
//! 1. **Segment trie** (`radix`): literal, `:param` and `*catch-all` edges with
//!    one terminal slot per HTTP method. Lookup prefers literal over parameter
//!    over catch-all and backtracks when a candidate's constraints reject it.
//! 2. **Bloom prefilter** ([`bloom`]): hashes of fully static routes. A request
//!    path that no dynamic route could match and that the filter has never
//!    seen is answered "not found" without walking the trie.
//! 3. **Routes**: handler, constraints and middleware chain per route.
//!
//! The [`Router`] owns one table for unversioned routes plus one per API
//! version. Registration happens during startup; [`Router::freeze`] seals the
//! tables and computes each route's middleware chain.
//!
//! ## Example
//!
//! ```rust
//! use sealroute::context::Context;
//! use sealroute::error::MatchError;
//! use sealroute::router::Router;
//! use http::Method;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = Router::default();
//! router.get("/users/static", |_ctx: &mut Context| {})?;
//! router.get("/users/:id", |_ctx: &mut Context| {})?.where_int("id");
//! router.freeze();
//!
//! let m = router.match_route(Method::GET, "/users/42")?;
//! assert_eq!(m.get_param("id"), Some("42"));
//! assert_eq!(m.route.pattern(), "/users/:id");
//!
//! assert_eq!(router.match_route(Method::GET, "/users/abc").unwrap_err(), MatchError::NotFound);
//! # Ok(())
//! # }
//! ```

pub mod bloom;
mod core;
mod method;
pub(crate) mod radix;
mod route;
mod scope;
mod table;
#[cfg(test)]
mod tests;

pub use self::core::{RouteMatch, Router};
pub use bloom::{BloomFilter, PathHash, DEFAULT_BLOOM_BITS, DEFAULT_BLOOM_HASHES};
pub use method::{Method, MethodSet, UnknownMethod, METHOD_COUNT};
pub use radix::WILDCARD_KEY;
pub use route::{Handler, Route, RouteBuilder, RouteInfo};
pub use scope::Scope;
