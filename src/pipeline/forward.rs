//! Outbound forwarding to a chosen instance.
//!
//! # Design Decisions
//! - The chain depends on the `Forwarder` trait, not on the HTTP client
//! - Bodies are buffered in both directions so the deadline covers the whole exchange
//! - Hop-by-hop headers are stripped in both directions

use std::future::Future;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Request},
    response::Response,
};
use thiserror::Error;

use crate::load_balancer::ServiceInstance;

/// Inbound request with its body already buffered.
pub type GatewayRequest = Request<Bytes>;

const HOP_BY_HOP: [header::HeaderName; 6] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Why a forwarding call failed.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream address: {0}")]
    InvalidTarget(#[from] url::ParseError),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Transport used by the filter chain to reach an instance.
pub trait Forwarder: Send + Sync + 'static {
    fn forward(
        &self,
        instance: &ServiceInstance,
        request: GatewayRequest,
    ) -> impl Future<Output = Result<Response, ForwardError>> + Send;
}

/// `reqwest`-backed forwarder.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
}

impl HttpForwarder {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Forwarder for HttpForwarder {
    async fn forward(
        &self,
        instance: &ServiceInstance,
        request: GatewayRequest,
    ) -> Result<Response, ForwardError> {
        let mut url = instance.uri()?;
        url.set_path(request.uri().path());
        url.set_query(request.uri().query());

        let (parts, body) = request.into_parts();
        let mut headers = parts.headers;
        headers.remove(header::HOST);
        strip_hop_by_hop(&mut headers);

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);
        let body = upstream.bytes().await?;

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}
