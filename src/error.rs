//! Gateway error taxonomy.
//!
//! # Design Decisions
//! - Limiter/breaker denials are NOT errors here; they are `pipeline::Rejection`
//! - Forward failures reach the caller as responses, after being recorded
//! - Every variant renders as the `{code, msg, data}` envelope

use std::time::Duration;
use axum::http::StatusCode;
use thiserror::Error;

use crate::pipeline::forward::ForwardError;

/// Errors raised while resolving or forwarding a request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No instance list is registered for the service (misconfiguration).
    #[error("unknown service: {0}")]
    UnknownService(String),

    /// The service is registered but currently has no instances.
    #[error("no available instances for service: {0}")]
    EmptyPool(String),

    /// The forwarding call failed at the transport level.
    #[error("forwarding to {instance} ({service}) failed: {source}")]
    ForwardFailure {
        service: String,
        instance: String,
        #[source]
        source: ForwardError,
    },

    /// The forwarding call did not complete within the deadline.
    #[error("forwarding to {instance} ({service}) timed out after {timeout:?}")]
    ForwardTimeout {
        service: String,
        instance: String,
        timeout: Duration,
    },

    /// The inbound body could not be buffered for forwarding.
    #[error("request body rejected: {0}")]
    RequestBody(String),
}

impl GatewayError {
    /// HTTP status surfaced to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::UnknownService(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::EmptyPool(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::ForwardFailure { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::ForwardTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::RequestBody(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Short message placed in the response envelope.
    pub fn public_message(&self) -> &'static str {
        match self {
            GatewayError::UnknownService(_) => "unknown service",
            GatewayError::EmptyPool(_) => "no available instances",
            GatewayError::ForwardFailure { .. } => "upstream request failed",
            GatewayError::ForwardTimeout { .. } => "upstream request timed out",
            GatewayError::RequestBody(_) => "request body rejected",
        }
    }
}
