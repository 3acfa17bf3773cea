//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference declared services)
//! - Validate value ranges (ratios, capacities, durations)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::{CircuitBreakerConfig, GatewayConfig, RateLimitConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("service `{0}` is declared more than once")]
    DuplicateService(String),

    #[error("service `{service}` has duplicate instance id `{instance}`")]
    DuplicateInstance { service: String, instance: String },

    #[error("route `{route}` references undeclared service `{service}`")]
    UnknownRouteService { route: String, service: String },

    #[error("{scope}: {field} {reason}")]
    OutOfRange {
        scope: String,
        field: &'static str,
        reason: &'static str,
    },
}

fn out_of_range(scope: &str, field: &'static str, reason: &'static str) -> ValidationError {
    ValidationError::OutOfRange {
        scope: scope.to_string(),
        field,
        reason,
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_rate_limit("rate_limit", &config.rate_limit, &mut errors);
    check_breaker("circuit_breaker", &config.circuit_breaker, &mut errors);

    if config.forwarding.timeout_ms == 0 {
        errors.push(out_of_range("forwarding", "timeout_ms", "must be > 0"));
    }
    if config.forwarding.max_body_bytes == 0 {
        errors.push(out_of_range("forwarding", "max_body_bytes", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(out_of_range("timeouts", "request_secs", "must be > 0"));
    } else if config.forwarding.timeout_ms >= config.timeouts.request_secs.saturating_mul(1000) {
        // The request timeout would fire before the forward deadline.
        errors.push(out_of_range(
            "forwarding",
            "timeout_ms",
            "must be shorter than timeouts.request_secs",
        ));
    }

    let mut names = HashSet::new();
    for service in &config.services {
        if service.name.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceName);
            continue;
        }
        if !names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        let mut ids = HashSet::new();
        for instance in &service.instances {
            if !ids.insert(instance.id.as_str()) {
                errors.push(ValidationError::DuplicateInstance {
                    service: service.name.clone(),
                    instance: instance.id.clone(),
                });
            }
        }

        let scope = format!("services.{}", service.name);
        if let Some(rate_limit) = &service.rate_limit {
            check_rate_limit(&scope, rate_limit, &mut errors);
        }
        if let Some(breaker) = &service.circuit_breaker {
            check_breaker(&scope, breaker, &mut errors);
        }
    }

    for route in &config.routes {
        if !names.contains(route.service.as_str()) {
            errors.push(ValidationError::UnknownRouteService {
                route: route.name.clone(),
                service: route.service.clone(),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn check_rate_limit(scope: &str, config: &RateLimitConfig, errors: &mut Vec<ValidationError>) {
    if config.capacity == 0 {
        errors.push(out_of_range(scope, "capacity", "must be > 0"));
    }
    if config.refill_period_ms == 0 {
        errors.push(out_of_range(scope, "refill_period_ms", "must be > 0"));
    }
}

fn check_breaker(scope: &str, config: &CircuitBreakerConfig, errors: &mut Vec<ValidationError>) {
    let ratio = config.failure_threshold_ratio;
    if !(ratio > 0.0 && ratio <= 1.0) {
        errors.push(out_of_range(scope, "failure_threshold_ratio", "must be in (0, 1]"));
    }
    if config.minimum_sample_size == 0 {
        errors.push(out_of_range(scope, "minimum_sample_size", "must be > 0"));
    }
    if config.evaluation_window_ms == 0 {
        errors.push(out_of_range(scope, "evaluation_window_ms", "must be > 0"));
    }
    if config.half_open_probe_limit == 0 {
        errors.push(out_of_range(scope, "half_open_probe_limit", "must be > 0"));
    }
    if config.half_open_successes_to_close == 0 {
        errors.push(out_of_range(scope, "half_open_successes_to_close", "must be > 0"));
    }
}
