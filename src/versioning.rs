//! API version detection.
//!
//! Each registered version owns its own route table. At request time the
//! configured strategies are tried in order and the first one that yields a
//! value decides the version:
//!
//! - [`VersionStrategy::Path`]: first path segment, when it names a registered
//!   version or looks like `v<digits>`. The segment is stripped before routing,
//!   so `/v2/users` is routed as `/users` in version `v2`.
//! - [`VersionStrategy::Header`]: the configured header (`X-API-Version`).
//! - [`VersionStrategy::Query`]: the configured query parameter (`version`).
//!
//! A bare number such as `2` resolves to `v2` when only the prefixed name is registered.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::server::Request;

/// Header consulted by [`VersionStrategy::Header`] unless configured otherwise.
pub const DEFAULT_VERSION_HEADER: &str = "X-API-Version";
/// Query parameter consulted by [`VersionStrategy::Query`] unless configured otherwise.
pub const DEFAULT_VERSION_QUERY_PARAM: &str = "version";

/// Where to look for the requested API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStrategy {
    Path,
    Header,
    Query,
}

impl fmt::Display for VersionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VersionStrategy::Path => "path",
            VersionStrategy::Header => "header",
            VersionStrategy::Query => "query",
        })
    }
}

impl FromStr for VersionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "path" => Ok(VersionStrategy::Path),
            "header" => Ok(VersionStrategy::Header),
            "query" => Ok(VersionStrategy::Query),
            other => Err(format!("unknown version strategy '{other}'")),
        }
    }
}

/// Version detection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionConfig {
    /// Strategies in priority order.
    pub strategies: Vec<VersionStrategy>,
    pub header: String,
    pub query_param: String,
    /// Version used when no strategy detects one.
    pub default_version: Option<String>,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            strategies: vec![
                VersionStrategy::Path,
                VersionStrategy::Header,
                VersionStrategy::Query,
            ],
            header: DEFAULT_VERSION_HEADER.to_string(),
            query_param: DEFAULT_VERSION_QUERY_PARAM.to_string(),
            default_version: None,
        }
    }
}

/// A version found on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedVersion<'r> {
    /// Version name as it should be looked up.
    pub name: Cow<'r, str>,
    pub source: VersionStrategy,
    /// Path to route within the version (prefix stripped for the path strategy).
    pub path: &'r str,
}

impl VersionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn strategies(mut self, strategies: impl IntoIterator<Item = VersionStrategy>) -> Self {
        self.strategies = strategies.into_iter().collect();
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>) -> Self {
        self.header = name.into();
        self
    }

    #[must_use]
    pub fn query_param(mut self, name: impl Into<String>) -> Self {
        self.query_param = name.into();
        self
    }

    #[must_use]
    pub fn default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = Some(version.into());
        self
    }

    /// Run the strategies in order and return the first detected version.
    pub fn detect<'r>(
        &self,
        req: &'r Request,
        is_registered: &dyn Fn(&str) -> bool,
    ) -> Option<DetectedVersion<'r>> {
        let path = req.path();
        self.strategies.iter().find_map(|strategy| {
            let (raw, routed): (Cow<'r, str>, &'r str) = match strategy {
                VersionStrategy::Path => {
                    let (segment, rest) = split_first_segment(path)?;
                    if !is_registered(segment) && !looks_like_version(segment) {
                        return None;
                    }
                    (Cow::Borrowed(segment), rest)
                }
                VersionStrategy::Header => {
                    let value = req.header(&self.header)?.trim();
                    (Cow::Borrowed(value), path)
                }
                VersionStrategy::Query => {
                    let value = req.query_param(&self.query_param)?;
                    (Cow::Owned(value.trim().to_string()), path)
                }
            };
            if raw.is_empty() {
                return None;
            }
            Some(DetectedVersion {
                name: canonical_name(raw, is_registered),
                source: *strategy,
                path: routed,
            })
        })
    }
}

/// `v<digits>`, case-insensitive.
fn looks_like_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .or_else(|| segment.strip_prefix('V'))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// `/v1/users` -> (`v1`, `/users`); `/v1` -> (`v1`, `/`).
fn split_first_segment(path: &str) -> Option<(&str, &str)> {
    let body = path.strip_prefix('/')?;
    match body.find('/') {
        Some(idx) => Some((&body[..idx], &body[idx..])),
        None if !body.is_empty() => Some((body, "/")),
        None => None,
    }
}

fn canonical_name<'r>(raw: Cow<'r, str>, is_registered: &dyn Fn(&str) -> bool) -> Cow<'r, str> {
    if !is_registered(&*raw) && raw.bytes().all(|b| b.is_ascii_digit()) {
        let prefixed = format!("v{raw}");
        if is_registered(&prefixed) {
            return Cow::Owned(prefixed);
        }
    }
    raw
}
