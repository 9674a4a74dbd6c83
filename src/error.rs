//! Error types returned by registration, matching and chain execution.
//!
//! Registration errors are returned synchronously from the registration call that
//! caused them. Matching errors are values, never panics; the hosting layer (or a
//! fallback handler) turns them into responses.

use std::fmt;

use crate::router::{Method, MethodSet};

/// Error returned while building the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The new route would make the trie ambiguous.
    Conflict {
        /// Method of the route being registered
        method: Method,
        /// Full pattern of the route being registered
        pattern: String,
        /// What it collides with
        reason: String,
    },
    /// Registration attempted after [`Router::freeze`](crate::router::Router::freeze).
    ///
    /// The route table is left untouched.
    AlreadyFrozen {
        method: Method,
        pattern: String,
    },
    /// Router-wide middleware, fallback or version added after freeze.
    AlreadyFrozenSetting { setting: String },
    /// The pattern is malformed (missing leading `/`, empty segment, misplaced wildcard).
    InvalidPattern {
        pattern: String,
        reason: String,
    },
    /// A constraint could not be built (for example an invalid regex).
    InvalidConstraint {
        param: String,
        reason: String,
    },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::Conflict {
                method,
                pattern,
                reason,
            } => write!(f, "route conflict for {method} {pattern}: {reason}"),
            RegistrationError::AlreadyFrozen { method, pattern } => write!(
                f,
                "router already frozen: cannot register {method} {pattern} after freeze()"
            ),
            RegistrationError::AlreadyFrozenSetting { setting } => write!(
                f,
                "router already frozen: cannot change {setting} after freeze()"
            ),
            RegistrationError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid route pattern '{pattern}': {reason}")
            }
            RegistrationError::InvalidConstraint { param, reason } => {
                write!(f, "invalid constraint on parameter '{param}': {reason}")
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Why a request could not be resolved to a route.
///
/// A failed parameter constraint is folded into [`MatchError::NotFound`]: the
/// constraint is part of the pattern, so the pattern did not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// No route matches the path.
    NotFound,
    /// The path exists but not for this method.
    MethodNotAllowed {
        /// Methods that would have matched, for the `Allow` header
        allowed: MethodSet,
    },
    /// A version was detected on the request but no such version is registered.
    UnknownVersion { version: String },
}

impl MatchError {
    /// HTTP status code the default responder uses for this error.
    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        match self {
            MatchError::NotFound => http::StatusCode::NOT_FOUND,
            MatchError::MethodNotAllowed { .. } => http::StatusCode::METHOD_NOT_ALLOWED,
            MatchError::UnknownVersion { .. } => http::StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::NotFound => f.write_str("Not Found"),
            MatchError::MethodNotAllowed { allowed } => {
                write!(f, "Method Not Allowed (allowed: {allowed})")
            }
            MatchError::UnknownVersion { version } => {
                write!(f, "unknown API version '{version}'")
            }
        }
    }
}

impl std::error::Error for MatchError {}

/// Errors recorded on a [`Context`](crate::context::Context) while its chain runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The request's cancel token fired between chain steps.
    Cancelled,
    /// The request's deadline passed between chain steps.
    DeadlineExceeded,
    /// A middleware or handler panicked and [`Recovery`](crate::middleware::Recovery) caught it.
    Panicked(String),
    /// Error reported by a handler or middleware.
    Handler(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::Cancelled => f.write_str("request cancelled"),
            ChainError::DeadlineExceeded => f.write_str("request deadline exceeded"),
            ChainError::Panicked(msg) => write!(f, "handler panicked: {msg}"),
            ChainError::Handler(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ChainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_error_statuses() {
        assert_eq!(MatchError::NotFound.status(), http::StatusCode::NOT_FOUND);
        let allowed: MethodSet = [Method::Get].into_iter().collect();
        assert_eq!(
            MatchError::MethodNotAllowed { allowed }.status(),
            http::StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            MatchError::UnknownVersion {
                version: "v9".into()
            }
            .status(),
            http::StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn frozen_error_mentions_route() {
        let err = RegistrationError::AlreadyFrozen {
            method: Method::Get,
            pattern: "/late".into(),
        };
        assert!(err.to_string().contains("GET /late"));
    }
}
