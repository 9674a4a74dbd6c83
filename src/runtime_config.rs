//! # Router Configuration
//!
//! [`RouterConfig`] tunes the prefilter, the context pool, the chain executor,
//! version detection and diagnostics. It can be built in code, read from the
//! environment, or loaded from a TOML or YAML file. Every field has a default,
//! so partial files are fine.
//!
//! ## Environment Variables
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `SEALROUTE_BLOOM_BITS` | `bloom.bits` | `1024` |
//! | `SEALROUTE_BLOOM_HASHES` | `bloom.hashes` | `3` |
//! | `SEALROUTE_BLOOM_ENABLED` | `bloom.enabled` | `true` |
//! | `SEALROUTE_POOL_CAPACITY` | `pool.capacity` | `1024` |
//! | `SEALROUTE_POOL_PREWARM` | `pool.prewarm` | `0` |
//! | `SEALROUTE_CHECK_CANCELLATION` | `chain.check_cancellation` | `true` |
//! | `SEALROUTE_VERSION_STRATEGIES` | `versioning.strategies` | `path,header,query` |
//! | `SEALROUTE_DEFAULT_VERSION` | `versioning.default_version` | unset |
//! | `SEALROUTE_VERSION_HEADER` | `versioning.header` | `X-API-Version` |
//! | `SEALROUTE_VERSION_QUERY_PARAM` | `versioning.query_param` | `version` |
//! | `SEALROUTE_MAX_FORWARDED_HOPS` | `diagnostics.max_forwarded_hops` | `5` |
//!
//! Numeric values accept decimal (`2048`) or hexadecimal (`0x800`).
//! Unparsable values keep the default and log a warning.
//!
//! ## Example File
//!
//! ```toml
//! [bloom]
//! bits = 4096
//!
//! [versioning]
//! strategies = ["header", "path"]
//! default_version = "v1"
//! ```

use std::env;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::DEFAULT_POOL_CAPACITY;
use crate::router::{DEFAULT_BLOOM_BITS, DEFAULT_BLOOM_HASHES};
use crate::versioning::{VersionConfig, VersionStrategy};

/// Default limit on `X-Forwarded-For` hops before a diagnostic is raised.
pub const DEFAULT_MAX_FORWARDED_HOPS: usize = 5;

/// Static-path prefilter sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    pub enabled: bool,
    /// Bit-array length; aim for a few bits per static route.
    pub bits: usize,
    pub hashes: u32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bits: DEFAULT_BLOOM_BITS,
            hashes: DEFAULT_BLOOM_HASHES,
        }
    }
}

/// Context pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Idle contexts kept for reuse.
    pub capacity: usize,
    /// Contexts allocated at startup.
    pub prewarm: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_CAPACITY,
            prewarm: 0,
        }
    }
}

/// Chain executor behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Check the request's cancel token and deadline between middleware steps.
    pub check_cancellation: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            check_cancellation: true,
        }
    }
}

/// Request inspection thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Inspect forwarding and framing headers on every request.
    pub inspect_headers: bool,
    pub max_forwarded_hops: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            inspect_headers: true,
            max_forwarded_hops: DEFAULT_MAX_FORWARDED_HOPS,
        }
    }
}

/// Complete router configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub bloom: BloomConfig,
    pub pool: PoolConfig,
    pub chain: ChainConfig,
    pub versioning: VersionConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl RouterConfig {
    /// Defaults overridden by `SEALROUTE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| env::var(key).ok())
    }

    /// Load a `.toml`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read router config {}", path.display()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => toml::from_str(&raw)
                .with_context(|| format!("Invalid TOML in {}", path.display())),
            Some("yaml" | "yml") => serde_yaml::from_str(&raw)
                .with_context(|| format!("Invalid YAML in {}", path.display())),
            _ => bail!(
                "Unsupported config format for {} (expected .toml, .yaml or .yml)",
                path.display()
            ),
        }
    }

    /// Apply overrides from a key lookup (the process environment in [`RouterConfig::from_env`]).
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str, current: usize| -> usize {
            match lookup(key) {
                Some(val) => parse_number(&val).unwrap_or_else(|| {
                    warn!(key, value = %val, "Ignoring unparsable number");
                    current
                }),
                None => current,
            }
        };
        let flag = |key: &str, current: bool| -> bool {
            match lookup(key) {
                Some(val) => parse_bool(&val).unwrap_or_else(|| {
                    warn!(key, value = %val, "Ignoring unparsable flag");
                    current
                }),
                None => current,
            }
        };

        self.bloom.bits = number("SEALROUTE_BLOOM_BITS", self.bloom.bits);
        self.bloom.hashes = u32::try_from(number("SEALROUTE_BLOOM_HASHES", self.bloom.hashes as usize))
            .unwrap_or(DEFAULT_BLOOM_HASHES);
        self.bloom.enabled = flag("SEALROUTE_BLOOM_ENABLED", self.bloom.enabled);
        self.pool.capacity = number("SEALROUTE_POOL_CAPACITY", self.pool.capacity);
        self.pool.prewarm = number("SEALROUTE_POOL_PREWARM", self.pool.prewarm);
        self.chain.check_cancellation =
            flag("SEALROUTE_CHECK_CANCELLATION", self.chain.check_cancellation);
        self.diagnostics.max_forwarded_hops =
            number("SEALROUTE_MAX_FORWARDED_HOPS", self.diagnostics.max_forwarded_hops);

        if let Some(list) = lookup("SEALROUTE_VERSION_STRATEGIES") {
            let parsed: Result<Vec<VersionStrategy>, String> = list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect();
            match parsed {
                Ok(strategies) => self.versioning.strategies = strategies,
                Err(e) => warn!(value = %list, error = %e, "Ignoring version strategies"),
            }
        }
        if let Some(version) = lookup("SEALROUTE_DEFAULT_VERSION").filter(|v| !v.is_empty()) {
            self.versioning.default_version = Some(version);
        }
        if let Some(header) = lookup("SEALROUTE_VERSION_HEADER").filter(|v| !v.is_empty()) {
            self.versioning.header = header;
        }
        if let Some(param) = lookup("SEALROUTE_VERSION_QUERY_PARAM").filter(|v| !v.is_empty()) {
            self.versioning.query_param = param;
        }
        self
    }
}

/// Decimal or `0x` hexadecimal.
fn parse_number(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.bloom.bits, 1024);
        assert_eq!(config.bloom.hashes, 3);
        assert!(config.bloom.enabled);
        assert_eq!(config.pool.capacity, 1024);
        assert!(config.chain.check_cancellation);
        assert_eq!(config.versioning.header, "X-API-Version");
        assert_eq!(config.diagnostics.max_forwarded_hops, 5);
    }

    #[test]
    fn env_overrides_accept_hex_and_decimal() {
        let config = RouterConfig::default().with_env_overrides(lookup(&[
            ("SEALROUTE_BLOOM_BITS", "0x800"),
            ("SEALROUTE_POOL_CAPACITY", "64"),
            ("SEALROUTE_CHECK_CANCELLATION", "off"),
            ("SEALROUTE_VERSION_STRATEGIES", "header, query"),
            ("SEALROUTE_DEFAULT_VERSION", "v1"),
        ]));
        assert_eq!(config.bloom.bits, 2048);
        assert_eq!(config.pool.capacity, 64);
        assert!(!config.chain.check_cancellation);
        assert_eq!(
            config.versioning.strategies,
            vec![VersionStrategy::Header, VersionStrategy::Query]
        );
        assert_eq!(config.versioning.default_version.as_deref(), Some("v1"));
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = RouterConfig::default().with_env_overrides(lookup(&[
            ("SEALROUTE_BLOOM_HASHES", "many"),
            ("SEALROUTE_BLOOM_ENABLED", "maybe"),
            ("SEALROUTE_VERSION_STRATEGIES", "path,cookie"),
        ]));
        assert_eq!(config.bloom.hashes, 3);
        assert!(config.bloom.enabled);
        assert_eq!(config.versioning.strategies.len(), 3);
    }
}
