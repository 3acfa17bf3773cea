//! Response envelope and error-to-response mapping.
//!
//! Every response produced by the gateway itself (rejections, fallbacks,
//! errors) uses the same JSON envelope: `{"code": .., "msg": .., "data": null}`.
//! Backend responses pass through untouched.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::pipeline::{ChainError, FallbackResponder};

/// JSON body of gateway-generated responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    pub code: u16,
    pub msg: String,
    pub data: Option<serde_json::Value>,
}

impl ApiEnvelope {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            msg: msg.into(),
            data: None,
        }
    }
}

/// Build a response with the envelope body and a matching status.
pub fn envelope(status: StatusCode, msg: &str) -> Response {
    (status, Json(ApiEnvelope::new(status, msg))).into_response()
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        envelope(self.status(), self.public_message())
    }
}

impl IntoResponse for ChainError {
    fn into_response(self) -> Response {
        match self {
            ChainError::Rejected(rejection) => FallbackResponder::respond(&rejection),
            ChainError::Gateway(error) => error.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiEnvelope::new(StatusCode::BAD_GATEWAY, "upstream request failed")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"code": 502, "msg": "upstream request failed", "data": null})
        );
    }

    #[test]
    fn test_gateway_error_response_status() {
        let response = GatewayError::EmptyPool("search".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
