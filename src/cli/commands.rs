use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as _, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

use super::manifest::Manifest;
use crate::logging::{init_logging, LogConfig};
use crate::runtime_config::RouterConfig;
use crate::server::{CapturedResponse, Request, Response};

/// Command-line interface for sealroute
#[derive(Parser, Debug)]
#[command(name = "sealroute")]
#[command(about = "Inspect and exercise a route manifest", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the routes a manifest registers
    Routes {
        /// Route manifest (TOML or YAML)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Router configuration file (TOML or YAML); defaults to SEALROUTE_* env vars
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the listing as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Serve one request through the manifest's routes and print the response
    Match {
        #[arg(short, long)]
        manifest: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// HTTP method
        method: String,

        /// Request target, query string included
        target: String,

        /// Request header as `name:value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

/// Parse the process arguments, set up logging and run the command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_env())?;
    let output = execute(&cli)?;
    println!("{output}");
    Ok(())
}

/// Run a parsed command and return what it prints.
pub fn execute(cli: &Cli) -> Result<String> {
    match &cli.command {
        Commands::Routes {
            manifest,
            config,
            json,
        } => {
            let router = Manifest::from_file(manifest)?.build_router(load_config(config.as_deref())?)?;
            let routes = router.routes();
            if *json {
                return Ok(serde_json::to_string_pretty(&routes)?);
            }
            Ok(routes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Commands::Match {
            manifest,
            config,
            method,
            target,
            headers,
        } => {
            let router = Manifest::from_file(manifest)?.build_router(load_config(config.as_deref())?)?;
            let method = http::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("Invalid HTTP method '{method}'"))?;
            let mut req = Request::new(method, target);
            for header in headers {
                let (name, value) = header
                    .split_once(':')
                    .ok_or_else(|| anyhow!("Header '{header}' is not in name:value form"))?;
                req = req.with_header(name.trim(), value.trim());
            }

            let mut out = CapturedResponse::new();
            router.serve(req, &mut out);
            let response = out
                .take()
                .ok_or_else(|| anyhow!("Router produced no response"))?;
            Ok(serde_json::to_string_pretty(&describe(&response))?)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RouterConfig> {
    match path {
        Some(path) => RouterConfig::from_file(path),
        None => Ok(RouterConfig::from_env()),
    }
}

fn describe(response: &Response) -> Value {
    let headers: Map<String, Value> = response
        .headers
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
        .collect();
    let body = response
        .body_json()
        .or_else(|| response.body_str().map(|s| Value::String(s.to_string())))
        .unwrap_or(Value::Null);
    json!({
        "status": response.status.as_u16(),
        "headers": headers,
        "body": body,
    })
}
