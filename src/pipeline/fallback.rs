//! Degraded responses for rejected requests.

use axum::response::Response;

use crate::http::response::envelope;
use crate::pipeline::outcome::{Rejection, RejectionKind};

/// Maps rejections to the user-visible fallback response.
///
/// | kind         | status | msg            |
/// |--------------|--------|----------------|
/// | RateLimited  | 429    | "rate limited" |
/// | CircuitOpen  | 503    | "circuit open" |
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResponder;

impl FallbackResponder {
    pub fn respond(rejection: &Rejection) -> Response {
        Self::for_kind(rejection.kind)
    }

    pub fn for_kind(kind: RejectionKind) -> Response {
        envelope(kind.status(), kind.message())
    }

    /// Body served by the manual fallback endpoint.
    pub fn circuit_open() -> Response {
        Self::for_kind(RejectionKind::CircuitOpen)
    }
}
