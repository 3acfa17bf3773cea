use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::load_balancer::ServiceInstance;
use crate::resilience::{BreakerMode, BreakerSnapshot};
use crate::security::RateLimitSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub services: usize,
    pub open_circuits: usize,
}

/// Per-service view; limiter and breaker are absent until first traffic.
#[derive(Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub instances: Vec<ServiceInstance>,
    pub rate_limit: Option<RateLimitSnapshot>,
    pub circuit_breaker: Option<BreakerSnapshot>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let names = state.chain.selector().registry().service_names();
    let open_circuits = names
        .iter()
        .filter(|name| state.chain.breaker().mode(name) != BreakerMode::Closed)
        .count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        services: names.len(),
        open_circuits,
    })
}

pub async fn get_services(State(state): State<AppState>) -> Json<Vec<ServiceStatus>> {
    let registry = state.chain.selector().registry();

    let statuses = registry
        .service_names()
        .into_iter()
        .map(|name| ServiceStatus {
            instances: registry
                .instances_for(&name)
                .map(|instances| instances.to_vec())
                .unwrap_or_default(),
            rate_limit: state.chain.rate_limiter().snapshot(&name),
            circuit_breaker: state.chain.breaker().snapshot(&name),
            name,
        })
        .collect();

    Json(statuses)
}
