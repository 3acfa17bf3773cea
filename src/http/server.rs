//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the filter chain and instance registry from config
//! - Create Axum Router with proxy and fallback handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Apply instance updates pushed by the config watcher
//! - Serve until the shutdown signal fires

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::watcher::InstanceUpdate;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response::envelope;
use crate::load_balancer::{InstanceRegistry, RoundRobinSelector};
use crate::observability::metrics;
use crate::pipeline::{FallbackResponder, FilterChain, Forwarder, HttpForwarder};
use crate::resilience::CircuitBreaker;
use crate::routing::Router as RouteTable;
use crate::security::RateLimiter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub chain: Arc<FilterChain<HttpForwarder>>,
    pub max_body_bytes: usize,
    pub admin_api_key: Arc<str>,
}

/// Build the pipeline for `config`: registers every configured instance
/// list and applies the per-service policy overrides.
pub fn build_chain<F: Forwarder>(config: &GatewayConfig, forwarder: F) -> FilterChain<F> {
    let registry = Arc::new(InstanceRegistry::new());
    let mut rate_limiter = RateLimiter::new(config.rate_limit.policy());
    let mut breaker = CircuitBreaker::new(config.circuit_breaker.policy());

    for service in &config.services {
        registry.register(&service.name, service.instances.clone());
        if let Some(rate_limit) = &service.rate_limit {
            rate_limiter = rate_limiter.with_policy(&service.name, rate_limit.policy());
        }
        if let Some(circuit_breaker) = &service.circuit_breaker {
            breaker = breaker.with_policy(&service.name, circuit_breaker.policy());
        }
    }

    FilterChain::new(
        Arc::new(rate_limiter),
        Arc::new(breaker),
        Arc::new(RoundRobinSelector::new(registry)),
        forwarder,
        config.chain_settings(),
    )
}

/// Replace instance lists from the discovery feed.
///
/// Services missing from the update are deregistered.
pub fn apply_instance_update(registry: &InstanceRegistry, update: &InstanceUpdate) {
    for name in registry.service_names() {
        if !update.contains(&name) && registry.deregister(&name) {
            tracing::info!(service = %name, "Service removed");
        }
    }
    for (service, instances) in &update.services {
        registry.register(service, instances.clone());
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let chain = build_chain(config, HttpForwarder::new()?);

        let state = AppState {
            routes: Arc::new(RouteTable::from_config(config.routes.clone())),
            chain: Arc::new(chain),
            max_body_bytes: config.forwarding.max_body_bytes,
            admin_api_key: Arc::from(config.admin.api_key.as_str()),
        };

        let router = Self::build_router(config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/fallback", get(fallback_handler))
            .route("/fallback/{service}", get(service_fallback_handler))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Shared state, also served by the admin API.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires, applying instance updates
    /// received on `instance_updates` meanwhile.
    pub async fn run(
        self,
        listener: TcpListener,
        mut instance_updates: mpsc::UnboundedReceiver<InstanceUpdate>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let registry = self.state.chain.selector().registry().clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = instance_updates.recv() => match update {
                        Some(update) => apply_instance_update(&registry, &update),
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Resolves the route, buffers the body and runs the filter chain.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();

    let Some(route) = state.routes.match_request(&parts) else {
        tracing::warn!(
            request_id = %parts.request_id(),
            path = %parts.uri.path(),
            "No route matched"
        );
        metrics::record_request("none", StatusCode::NOT_FOUND.as_u16());
        return envelope(StatusCode::NOT_FOUND, "no matching route");
    };

    tracing::debug!(
        request_id = %parts.request_id(),
        method = %parts.method,
        path = %parts.uri.path(),
        route = %route.name,
        service = %route.service,
        "Proxying request"
    );

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = GatewayError::RequestBody(e.to_string());
            tracing::warn!(request_id = %parts.request_id(), error = %err, "Request body rejected");
            metrics::record_request(&route.service, err.status().as_u16());
            return err.into_response();
        }
    };

    parts.uri = route.rewrite_uri(&parts.uri);

    let response = match state
        .chain
        .handle(Request::from_parts(parts, body), &route.service)
        .await
    {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    metrics::record_request(&route.service, response.status().as_u16());
    response
}

/// Forced-degradation endpoint, independent of breaker state.
async fn fallback_handler() -> Response {
    FallbackResponder::circuit_open()
}

async fn service_fallback_handler(Path(service): Path<String>) -> Response {
    tracing::debug!(service = %service, "Serving forced fallback");
    FallbackResponder::circuit_open()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::http::ApiEnvelope;
    use crate::load_balancer::ServiceInstance;
    use tower::ServiceExt;

    const CONFIG: &str = r#"
        [rate_limit]
        capacity = 1
        refill_period_ms = 60000

        [[services]]
        name = "search-service"

        [[services.instances]]
        id = "search-1"
        host = "127.0.0.1"
        port = 1

        [[routes]]
        name = "search"
        path_prefix = "/search"
        service = "search-service"
    "#;

    async fn read_envelope(response: Response) -> ApiEnvelope {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_fallback_endpoints() {
        let server = HttpServer::new(&parse_config(CONFIG).unwrap()).unwrap();

        for uri in ["/fallback", "/fallback/search-service"] {
            let response = server
                .router
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
            assert!(response.headers().contains_key("x-request-id"));
            assert_eq!(read_envelope(response).await.msg, "circuit open");
        }
    }

    #[tokio::test]
    async fn test_unmatched_route_is_404() {
        let server = HttpServer::new(&parse_config(CONFIG).unwrap()).unwrap();
        let response = server
            .router
            .oneshot(Request::builder().uri("/docs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_envelope(response).await.code, 404);
    }

    #[tokio::test]
    async fn test_second_request_rate_limited() {
        let server = HttpServer::new(&parse_config(CONFIG).unwrap()).unwrap();

        // Port 1 refuses the first request; the second never reaches it.
        let first = server
            .router
            .clone()
            .oneshot(Request::builder().uri("/search/a").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::BAD_GATEWAY);

        let second = server
            .router
            .oneshot(Request::builder().uri("/search/a").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(read_envelope(second).await.msg, "rate limited");
    }

    #[test]
    fn test_apply_instance_update() {
        let mut config = parse_config(CONFIG).unwrap();
        let registry = InstanceRegistry::new();
        registry.register("legacy", vec![ServiceInstance::new("old", "127.0.0.1", 9)]);

        config.services[0].instances.push(ServiceInstance::new("search-2", "127.0.0.1", 2));
        apply_instance_update(&registry, &InstanceUpdate::from_config(&config));

        assert_eq!(registry.instances_for("search-service").unwrap().len(), 2);
        assert!(registry.instances_for("legacy").is_err());
    }
}
