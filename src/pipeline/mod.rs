//! Traffic-control pipeline.
//!
//! # Data Flow
//! ```text
//! (request, service) from the routing layer
//!     → chain.rs (rate limit → circuit breaker → select → forward)
//!         ├─ Rejection  → fallback.rs (429 / 503 envelope)
//!         ├─ Response   → returned as-is (backend status preserved)
//!         └─ GatewayError → error envelope (500 / 502 / 503 / 504)
//! ```
//!
//! # Design Decisions
//! - Stage order is fixed in code, not configured
//! - Rejections are values, never panics or retried internally
//! - The chain itself reports every forward outcome to the breaker

pub mod chain;
pub mod fallback;
pub mod forward;
pub mod outcome;

pub use chain::{CallPermit, ChainError, ChainSettings, FilterChain};
pub use fallback::FallbackResponder;
pub use forward::{ForwardError, Forwarder, GatewayRequest, HttpForwarder};
pub use outcome::{ForwardOutcome, Rejection, RejectionKind};
