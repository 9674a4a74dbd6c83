//! # Constraint Engine
//!
//! Typed predicates attached to route parameters. A constraint is evaluated while
//! matching: if any constraint on a candidate route rejects its parameter, the
//! candidate does not match and the trie keeps looking (ultimately yielding
//! [`MatchError::NotFound`](crate::error::MatchError::NotFound)).
//!
//! All predicates are pure and deterministic.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RegistrationError;

static INT_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^-?[0-9]+$").ok());

static FLOAT_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$").ok());

static UUID_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").ok()
});

static DATE_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").ok());

fn shape_matches(re: &Lazy<Option<Regex>>, value: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(value))
}

/// A typed validation predicate for one path parameter.
#[derive(Clone)]
pub enum Constraint {
    /// Optional minus sign followed by digits, within the platform integer range.
    Int,
    /// Decimal number with optional exponent.
    Float,
    /// Canonical 8-4-4-4-12 hex UUID, any case.
    Uuid,
    /// `YYYY-MM-DD` naming a real calendar day.
    Date,
    /// RFC 3339 timestamp.
    DateTime,
    /// Exact, case-sensitive membership in a fixed set.
    Enum(Arc<[String]>),
    /// Full-segment match against a user pattern (anchored at compile time).
    Regex(Regex),
}

impl Constraint {
    /// Build an enum constraint from its allowed values.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Constraint::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Compile a regex constraint, anchoring it so it must match the whole segment.
    pub fn regex(param: &str, pattern: &str) -> Result<Self, RegistrationError> {
        Regex::new(&format!("^(?:{pattern})$"))
            .map(Constraint::Regex)
            .map_err(|e| RegistrationError::InvalidConstraint {
                param: param.to_string(),
                reason: e.to_string(),
            })
    }

    /// Evaluate the predicate against a raw parameter value.
    #[must_use]
    pub fn validate(&self, raw: &str) -> bool {
        match self {
            Constraint::Int => shape_matches(&INT_RE, raw) && raw.parse::<isize>().is_ok(),
            Constraint::Float => shape_matches(&FLOAT_RE, raw),
            Constraint::Uuid => shape_matches(&UUID_RE, raw),
            Constraint::Date => {
                shape_matches(&DATE_RE, raw) && NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
            }
            Constraint::DateTime => DateTime::parse_from_rfc3339(raw).is_ok(),
            Constraint::Enum(values) => values.iter().any(|v| v == raw),
            Constraint::Regex(re) => re.is_match(raw),
        }
    }

    /// Short name used in logs and route listings.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::Int => "int",
            Constraint::Float => "float",
            Constraint::Uuid => "uuid",
            Constraint::Date => "date",
            Constraint::DateTime => "datetime",
            Constraint::Enum(_) => "enum",
            Constraint::Regex(_) => "regex",
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Enum(values) => f.debug_tuple("Enum").field(values).finish(),
            Constraint::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// A constraint bound to the parameter it checks.
#[derive(Debug, Clone)]
pub struct ParamConstraint {
    pub param: Arc<str>,
    pub constraint: Constraint,
}

/// Check every constraint against the extracted parameters, in registration order.
///
/// Returns the first constraint that rejected its parameter, or `None` when all pass.
/// A constraint whose parameter is absent rejects.
pub(crate) fn first_rejection<'c, 'p>(
    constraints: &'c [ParamConstraint],
    lookup: impl Fn(&str) -> Option<&'p str>,
) -> Option<&'c ParamConstraint> {
    constraints.iter().find(|c| match lookup(&c.param) {
        Some(value) => !c.constraint.validate(value),
        None => true,
    })
}
