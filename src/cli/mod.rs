//! # CLI Module
//!
//! The `sealroute` binary loads a route manifest (see [`Manifest`]), registers
//! every route with the echo handler and either lists the routes or serves a
//! single request through the router.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! ```bash
//! sealroute routes --manifest routes.toml
//! sealroute routes --manifest routes.yaml --json
//! ```
//!
//! ### `match`
//!
//! ```bash
//! sealroute match --manifest routes.toml GET /users/42
//! sealroute match --manifest routes.toml GET /users --header "X-API-Version: v2"
//! ```
//!
//! Prints the response status, headers and body as JSON.
//!
//! Both commands accept `--config <file>` with a [`RouterConfig`](crate::runtime_config::RouterConfig)
//! in TOML or YAML; without it the config comes from `SEALROUTE_*` environment variables.

mod commands;
mod manifest;


pub use commands::{execute, run_cli, Cli, Commands};
pub use manifest::{parse_constraint, Manifest, ManifestRoute};
