//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request admitted by the rate limiter:
//!     → circuit_breaker.rs (fail fast while the service is unhealthy)
//!     → timeouts.rs (bounded deadline around the forwarding call)
//!     → circuit_breaker.rs (outcome fed back, drives state transitions)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every forward has a deadline
//! - No internal retries; retry policy belongs to the caller
//! - Circuit breaker prevents cascading failures

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{Admission, BreakerMode, BreakerSnapshot, CircuitBreaker, CircuitBreakerPolicy};
