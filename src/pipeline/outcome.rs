//! Terminal results of the filter chain.

use std::fmt;
use std::time::Duration;
use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Why the chain refused a request before it reached a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    RateLimited,
    CircuitOpen,
}

impl RejectionKind {
    pub fn status(&self) -> StatusCode {
        match self {
            RejectionKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RejectionKind::CircuitOpen => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RejectionKind::RateLimited => "rate limited",
            RejectionKind::CircuitOpen => "circuit open",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RejectionKind::RateLimited => "rate_limited",
            RejectionKind::CircuitOpen => "circuit_open",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A request refused by the limiter or the breaker. Never forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} for service {service}")]
pub struct Rejection {
    pub kind: RejectionKind,
    pub service: String,
}

impl Rejection {
    pub fn rate_limited(service: impl Into<String>) -> Self {
        Self { kind: RejectionKind::RateLimited, service: service.into() }
    }

    pub fn circuit_open(service: impl Into<String>) -> Self {
        Self { kind: RejectionKind::CircuitOpen, service: service.into() }
    }
}

/// Result of one forwarding attempt, fed back into the breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardOutcome {
    pub service: String,
    pub instance_id: String,
    pub success: bool,
    pub latency: Duration,
}
