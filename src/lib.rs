//! # sealroute
//!
//! **sealroute** is a trie-based HTTP request router with typed parameter
//! constraints, route groups, API versioning, pooled request contexts and an
//! ordered middleware chain. Routes are registered at startup; [`Router::freeze`]
//! then seals the table, and from that point the router is read-only and can be
//! shared across threads.
//!
//! ## Architecture
//!
//! - **[`router`]** - trie matcher, bloom prefilter for static paths, route
//!   tables, groups and versions
//! - **[`constraint`]** - typed predicates on path parameters (`int`, `uuid`, `date`, ...)
//! - **[`versioning`]** - version detection from the path, a header or the query string
//! - **[`context`]** - per-request [`Context`](context::Context) and the pool that recycles it
//! - **[`middleware`]** - the [`Middleware`](middleware::Middleware) trait, the chain
//!   executor and stock middleware (recovery, tracing, metrics)
//! - **[`server`]** - the transport-neutral request and response types and [`Router::serve`]
//! - **[`diagnostics`]** - security-relevant observations raised while serving
//! - **[`runtime_config`]** and **[`logging`]** - configuration from env vars or
//!   files, and `tracing` subscriber setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as Host adapter
//!     participant Router
//!     participant Pool as ContextPool
//!     participant Table as RouteTable
//!     participant Chain as Middleware Chain
//!     participant Handler
//!
//!     Host->>Router: serve(Request, sink)
//!     Router->>Pool: acquire()
//!     Router->>Router: detect version (path, header, query)
//!     Router->>Table: bloom check (static paths only)
//!     Table->>Table: trie lookup + constraints
//!     alt No route
//!         Router->>Chain: router middleware + fallback
//!     else Matched
//!         Router->>Chain: router, group, route middleware
//!         Chain->>Handler: handle(ctx)
//!     end
//!     Router->>Pool: release(ctx)
//!     Router-->>Host: sink.send(Response)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::{Method, StatusCode};
//! use sealroute::context::Context;
//! use sealroute::middleware::Recovery;
//! use sealroute::router::Router;
//! use sealroute::server::{CapturedResponse, Request};
//!
//! let mut router = Router::default();
//! router.use_middleware(Recovery).unwrap();
//! router
//!     .get("/users/:id", |ctx: &mut Context| {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         ctx.text(StatusCode::OK, id);
//!     })
//!     .unwrap()
//!     .where_int("id");
//! router.freeze();
//!
//! let mut out = CapturedResponse::new();
//! router.serve(Request::new(Method::GET, "/users/42"), &mut out);
//! assert_eq!(out.take().unwrap().body_str(), Some("42"));
//! ```

pub mod cli;
pub mod constraint;
pub mod context;
pub mod diagnostics;
pub mod echo;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod versioning;

pub use error::{ChainError, MatchError, RegistrationError};
pub use ids::RequestId;
pub use router::{Method, RouteMatch, Router};
pub use runtime_config::RouterConfig;
