//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::load_balancer::ServiceInstance;
use crate::pipeline::ChainSettings;
use crate::resilience::CircuitBreakerPolicy;
use crate::security::RateLimitPolicy;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Logical services and their static instance lists.
    pub services: Vec<ServiceConfig>,

    /// Route definitions mapping requests to services.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Forwarding behaviour.
    pub forwarding: ForwardingConfig,

    /// Default rate limit for every service.
    pub rate_limit: RateLimitConfig,

    /// Default circuit breaker for every service.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

impl GatewayConfig {
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn chain_settings(&self) -> ChainSettings {
        ChainSettings {
            forward_timeout: Duration::from_millis(self.forwarding.timeout_ms),
            record_server_errors: self.forwarding.record_server_errors,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// One logical service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Logical service name routes refer to (e.g., "search-service").
    pub name: String,

    /// Instances in round-robin order.
    #[serde(default)]
    pub instances: Vec<ServiceInstance>,

    /// Overrides the default rate limit.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,

    /// Overrides the default circuit breaker.
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

/// Route configuration mapping requests to a logical service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Host header to match (exact match).
    #[serde(default)]
    pub host: Option<String>,

    /// Path prefix to match.
    #[serde(default)]
    pub path_prefix: Option<String>,

    /// Logical service to forward to.
    pub service: String,

    /// Remove the matched prefix before forwarding.
    #[serde(default)]
    pub strip_prefix: bool,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout enforced by the HTTP layer, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Deadline of one forwarding call in milliseconds (clamped to 60s).
    pub timeout_ms: u64,

    /// Count upstream 5xx responses as circuit breaker failures.
    pub record_server_errors: bool,

    /// Maximum buffered request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            record_server_errors: true,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Fixed-window rate limit.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Permits per window.
    pub capacity: u32,

    /// Window length in milliseconds.
    pub refill_period_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            refill_period_ms: 1000,
        }
    }
}

impl RateLimitConfig {
    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            capacity: self.capacity,
            refill_period: Duration::from_millis(self.refill_period_ms),
        }
    }
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failure ratio (0, 1] that opens the circuit.
    pub failure_threshold_ratio: f64,

    /// Minimum outcomes in the window before the ratio is evaluated.
    pub minimum_sample_size: u32,

    /// Length of the evaluation window in milliseconds.
    pub evaluation_window_ms: u64,

    /// Cool-down before the first probe, in milliseconds.
    pub open_duration_ms: u64,

    /// Concurrent probes allowed while half-open.
    pub half_open_probe_limit: u32,

    /// Consecutive probe successes needed to close.
    pub half_open_successes_to_close: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold_ratio: 0.5,
            minimum_sample_size: 10,
            evaluation_window_ms: 60_000,
            open_duration_ms: 10_000,
            half_open_probe_limit: 3,
            half_open_successes_to_close: 3,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn policy(&self) -> CircuitBreakerPolicy {
        CircuitBreakerPolicy {
            failure_threshold_ratio: self.failure_threshold_ratio,
            minimum_sample_size: self.minimum_sample_size,
            evaluation_window: Duration::from_millis(self.evaluation_window_ms),
            open_duration: Duration::from_millis(self.open_duration_ms),
            half_open_probe_limit: self.half_open_probe_limit,
            half_open_successes_to_close: self.half_open_successes_to_close,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
