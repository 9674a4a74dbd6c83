//! Structured diagnostic events.
//!
//! The router reports suspicious input and risky configuration through an
//! optional [`DiagnosticSink`]. Emission is fire-and-forget: sinks must return
//! quickly and never fail the request. With no sink configured, events are
//! logged with `tracing::warn!` by [`TracingSink`].

use std::fmt;
use std::sync::Arc;

use http::HeaderMap;
use tracing::warn;

/// Something worth telling an operator about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// `X-Forwarded-For` carries more hops than allowed, or a hop is not an IP address.
    SuspiciousProxyChain {
        hops: usize,
        max_hops: usize,
        chain: String,
    },
    /// CR/LF removed from a response header value set through the context.
    HeaderInjectionSanitized { header: String },
    /// A route was registered with more parameters than fit inline.
    HighParamCount {
        method: String,
        pattern: String,
        params: usize,
    },
    /// The request carries contradictory or malformed framing headers.
    InvalidProtocolHeader { header: String, reason: String },
}

impl DiagnosticEvent {
    /// Stable event name for log fields and metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DiagnosticEvent::SuspiciousProxyChain { .. } => "suspicious_proxy_chain",
            DiagnosticEvent::HeaderInjectionSanitized { .. } => "header_injection_sanitized",
            DiagnosticEvent::HighParamCount { .. } => "high_param_count",
            DiagnosticEvent::InvalidProtocolHeader { .. } => "invalid_protocol_header",
        }
    }
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticEvent::SuspiciousProxyChain {
                hops,
                max_hops,
                chain,
            } => write!(
                f,
                "suspicious X-Forwarded-For chain ({hops} hops, max {max_hops}): {chain}"
            ),
            DiagnosticEvent::HeaderInjectionSanitized { header } => {
                write!(f, "stripped CR/LF from response header '{header}'")
            }
            DiagnosticEvent::HighParamCount {
                method,
                pattern,
                params,
            } => write!(f, "route {method} {pattern} declares {params} parameters"),
            DiagnosticEvent::InvalidProtocolHeader { header, reason } => {
                write!(f, "invalid '{header}' header: {reason}")
            }
        }
    }
}

/// Receiver for diagnostic events.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: &DiagnosticEvent);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&DiagnosticEvent) + Send + Sync,
{
    fn emit(&self, event: &DiagnosticEvent) {
        self(event);
    }
}

/// Default sink: one `warn!` per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: &DiagnosticEvent) {
        warn!(kind = event.kind(), event = %event, "Router diagnostic");
    }
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn DiagnosticSink>;

/// Inspect forwarding and framing headers of an inbound request.
pub(crate) fn inspect_request_headers(headers: &HeaderMap, max_hops: usize, sink: &dyn DiagnosticSink) {
    let forwarded: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .collect();
    if !forwarded.is_empty() {
        let unparsable = forwarded
            .iter()
            .any(|hop| hop.parse::<std::net::IpAddr>().is_err());
        if forwarded.len() > max_hops || unparsable {
            sink.emit(&DiagnosticEvent::SuspiciousProxyChain {
                hops: forwarded.len(),
                max_hops,
                chain: forwarded.join(", "),
            });
        }
    }

    let content_length = headers.get(http::header::CONTENT_LENGTH);
    if let Some(value) = content_length {
        let numeric = value
            .to_str()
            .ok()
            .is_some_and(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()));
        if !numeric {
            sink.emit(&DiagnosticEvent::InvalidProtocolHeader {
                header: "content-length".into(),
                reason: "value is not a non-negative integer".into(),
            });
        }
    }
    if content_length.is_some() && headers.contains_key(http::header::TRANSFER_ENCODING) {
        sink.emit(&DiagnosticEvent::InvalidProtocolHeader {
            header: "transfer-encoding".into(),
            reason: "sent together with content-length".into(),
        });
    }
}

/// Remove CR and LF from a header value. Returns `true` when something was stripped.
pub(crate) fn sanitize_header_value(value: &mut String) -> bool {
    let before = value.len();
    value.retain(|c| c != '\r' && c != '\n');
    value.len() != before
}
