//! Route manifests: a TOML or YAML list of routes the CLI registers with echo handlers.
//!
//! ```toml
//! [[routes]]
//! method = "GET"
//! path = "/users/:id"
//! handler = "get_user"
//! constraints = { id = "int" }
//!
//! [[routes]]
//! method = "GET"
//! path = "/users"
//! version = "v2"
//! group = "/api"
//! ```
//!
//! Constraint values: `int`, `float`, `uuid`, `date`, `datetime`,
//! `enum:a|b|c` and `regex:<pattern>`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context as _, Result};
use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;
use crate::echo::echo_handler;
use crate::router::{Method, RouteBuilder, Router, Scope};
use crate::runtime_config::RouterConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub routes: Vec<ManifestRoute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRoute {
    pub method: Method,
    pub path: String,
    /// Name shown in listings and echoed back; defaults to `METHOD path`.
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Group prefix joined in front of `path`.
    #[serde(default)]
    pub group: Option<String>,
}

impl Manifest {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => {
                toml::from_str(&raw).with_context(|| format!("Invalid TOML in {}", path.display()))
            }
            Some("yaml" | "yml") => serde_yaml::from_str(&raw)
                .with_context(|| format!("Invalid YAML in {}", path.display())),
            _ => bail!("Unsupported manifest format for {} (expected .toml, .yaml or .yml)", path.display()),
        }
    }

    /// Register every route with [`echo_handler`] and freeze the router.
    pub fn build_router(&self, config: RouterConfig) -> Result<Router> {
        let mut router = Router::new(config);
        for entry in &self.routes {
            let mut scope = match entry.version.as_deref() {
                Some(version) => router.version(version),
                None => router.group(""),
            };
            let registered = match entry.group.as_deref() {
                Some(prefix) => register(&mut scope.group(prefix), entry),
                None => register(&mut scope, entry),
            };
            registered.with_context(|| format!("Failed to register {} {}", entry.method, entry.path))?;
        }
        router.freeze();
        Ok(router)
    }
}

fn register(scope: &mut Scope<'_>, entry: &ManifestRoute) -> Result<()> {
    let mut builder = scope.route(entry.method, &entry.path, echo_handler)?;
    builder = match &entry.handler {
        Some(name) => builder.name(name),
        None => {
            let name = format!("{} {}", entry.method, builder.route().pattern());
            builder.name(&name)
        }
    };
    for (param, spec) in &entry.constraints {
        builder = apply_constraint(builder, param, spec)?;
    }
    Ok(())
}

fn apply_constraint<'r>(builder: RouteBuilder<'r>, param: &str, spec: &str) -> Result<RouteBuilder<'r>> {
    if let Some(pattern) = spec.strip_prefix("regex:") {
        return Ok(builder.where_regex(param, pattern)?);
    }
    Ok(builder.constrain(param, parse_constraint(spec)?))
}

/// Parse every constraint form except `regex:`, which needs the parameter name.
pub fn parse_constraint(spec: &str) -> Result<Constraint> {
    if let Some(values) = spec.strip_prefix("enum:") {
        let values: Vec<&str> = values.split('|').filter(|v| !v.is_empty()).collect();
        if values.is_empty() {
            bail!("enum constraint needs at least one value");
        }
        return Ok(Constraint::one_of(values));
    }
    match spec {
        "int" => Ok(Constraint::Int),
        "float" => Ok(Constraint::Float),
        "uuid" => Ok(Constraint::Uuid),
        "date" => Ok(Constraint::Date),
        "datetime" => Ok(Constraint::DateTime),
        other => Err(anyhow!("unknown constraint '{other}'")),
    }
}
