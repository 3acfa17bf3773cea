//! Ordered traffic-control pipeline.
//!
//! ```text
//! request for service S
//!     → rate limit (RateLimiter, S)          ─ denied → Rejection::RateLimited
//!     → circuit breaker (CircuitBreaker, S)  ─ open   → Rejection::CircuitOpen
//!     → select instance (RoundRobinSelector, S)
//!     → forward with deadline
//!     → ForwardOutcome → CircuitBreaker(S)
//! ```
//!
//! The limiter runs before the breaker so requests shed for load never
//! count as backend failures.

use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::response::Response;
use thiserror::Error;

use crate::error::GatewayError;
use crate::load_balancer::RoundRobinSelector;
use crate::observability::metrics;
use crate::pipeline::forward::{Forwarder, GatewayRequest};
use crate::pipeline::outcome::{ForwardOutcome, Rejection};
use crate::resilience::{timeouts, Admission, CircuitBreaker};
use crate::security::rate_limit::RateLimiter;

/// Error half of [`FilterChain::handle`].
#[derive(Debug, Error)]
pub enum ChainError {
    /// Refused before reaching a backend.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// Resolution or forwarding failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Tunables of the forwarding stage.
#[derive(Debug, Clone, Copy)]
pub struct ChainSettings {
    pub forward_timeout: Duration,
    /// Count upstream 5xx responses as breaker failures.
    pub record_server_errors: bool,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            forward_timeout: Duration::from_secs(10),
            record_server_errors: true,
        }
    }
}

/// Breaker admission for one request.
///
/// Must be settled with [`CallPermit::complete`] or [`CallPermit::release`].
/// Dropping it unsettled (the caller gave up mid-forward) reports a failure.
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    service: &'a str,
    admission: Admission,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, service: &'a str, admission: Admission) -> Self {
        Self { breaker, service, admission, settled: false }
    }

    /// Whether this request was admitted while Half-Open.
    pub fn is_trial(&self) -> bool {
        self.admission.is_trial()
    }

    /// Feed the forwarding outcome back into the breaker.
    pub fn complete(mut self, outcome: &ForwardOutcome) {
        self.settled = true;
        self.breaker.report_outcome(self.service, self.admission, outcome.success);
    }

    /// Give the admission back without recording an outcome.
    pub fn release(mut self) {
        self.settled = true;
        self.breaker.release_probe(self.service, self.admission);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(service = %self.service, "Forward abandoned, recording failure");
            self.breaker.report_outcome(self.service, self.admission, false);
        }
    }
}

/// Rate limit → circuit breaker → select → forward.
#[derive(Debug)]
pub struct FilterChain<F> {
    rate_limiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreaker>,
    selector: Arc<RoundRobinSelector>,
    forwarder: F,
    settings: ChainSettings,
}

impl<F: Forwarder> FilterChain<F> {
    pub fn new(
        rate_limiter: Arc<RateLimiter>,
        breaker: Arc<CircuitBreaker>,
        selector: Arc<RoundRobinSelector>,
        forwarder: F,
        settings: ChainSettings,
    ) -> Self {
        Self {
            rate_limiter,
            breaker,
            selector,
            forwarder,
            settings: ChainSettings {
                forward_timeout: timeouts::bounded(settings.forward_timeout),
                ..settings
            },
        }
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn selector(&self) -> &Arc<RoundRobinSelector> {
        &self.selector
    }

    /// Run the admission stages for `service`, in order.
    pub fn admit<'a>(&'a self, service: &'a str) -> Result<CallPermit<'a>, Rejection> {
        if !self.rate_limiter.try_acquire(service) {
            return Err(self.reject(Rejection::rate_limited(service)));
        }
        match self.breaker.allow_request(service) {
            Some(admission) => Ok(CallPermit::new(&self.breaker, service, admission)),
            None => Err(self.reject(Rejection::circuit_open(service))),
        }
    }

    /// Send `request` to an instance of `service` unless a stage refuses it.
    pub async fn handle(&self, request: GatewayRequest, service: &str) -> Result<Response, ChainError> {
        let permit = self.admit(service)?;

        let instance = match self.selector.select(service) {
            Ok(instance) => instance,
            Err(e) => {
                tracing::warn!(service = %service, error = %e, "Instance selection failed");
                permit.release();
                return Err(e.into());
            }
        };

        let started = Instant::now();
        let forwarded = timeouts::with_deadline(
            self.settings.forward_timeout,
            self.forwarder.forward(&instance, request),
        )
        .await;
        let latency = started.elapsed();

        let (success, result) = match forwarded {
            Some(Ok(response)) => {
                let server_error = response.status().is_server_error();
                (!(server_error && self.settings.record_server_errors), Ok(response))
            }
            Some(Err(source)) => (
                false,
                Err(GatewayError::ForwardFailure {
                    service: service.to_string(),
                    instance: instance.id.clone(),
                    source,
                }),
            ),
            None => (
                false,
                Err(GatewayError::ForwardTimeout {
                    service: service.to_string(),
                    instance: instance.id.clone(),
                    timeout: self.settings.forward_timeout,
                }),
            ),
        };

        let outcome = ForwardOutcome {
            service: service.to_string(),
            instance_id: instance.id,
            success,
            latency,
        };
        permit.complete(&outcome);
        metrics::record_forward(&outcome.service, &outcome.instance_id, outcome.latency);

        match &result {
            Ok(response) => tracing::debug!(
                service = %service,
                instance = %outcome.instance_id,
                status = %response.status(),
                latency_ms = latency.as_millis() as u64,
                "Forwarded"
            ),
            Err(e) => tracing::warn!(
                service = %service,
                instance = %outcome.instance_id,
                latency_ms = latency.as_millis() as u64,
                error = %e,
                "Forward failed"
            ),
        }

        result.map_err(ChainError::from)
    }

    fn reject(&self, rejection: Rejection) -> Rejection {
        tracing::debug!(service = %rejection.service, kind = %rejection.kind, "Request rejected");
        metrics::record_rejection(&rejection.service, rejection.kind.label());
        rejection
    }
}
