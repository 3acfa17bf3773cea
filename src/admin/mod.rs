//! Admin API: read-only view of per-service pipeline state.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};
use crate::http::server::AppState;
use self::auth::admin_auth_middleware;
use self::handlers::*;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/services", get(get_services))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::{parse_config, GatewayConfig};
    use crate::http::HttpServer;

    fn admin_router() -> Router {
        let config: GatewayConfig = parse_config(
            r#"
            [admin]
            api_key = "secret"

            [[services]]
            name = "search-service"

            [[services.instances]]
            id = "search-1"
            host = "127.0.0.1"
            port = 7700
            "#,
        )
        .unwrap();
        let server = HttpServer::new(&config).unwrap();
        setup_admin_router(server.state().clone())
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let response = admin_router()
            .oneshot(
                Request::builder()
                    .uri("/admin/status")
                    .header("Authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_lists_services() {
        let response = admin_router()
            .oneshot(
                Request::builder()
                    .uri("/admin/services")
                    .header("Authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let services: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(services[0]["name"], "search-service");
        assert_eq!(services[0]["instances"][0]["port"], 7700);
        assert!(services[0]["circuit_breaker"].is_null());
    }
}
