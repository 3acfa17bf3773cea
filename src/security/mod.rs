//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request resolved to service S:
//!     → rate_limit.rs (fixed-window quota of S)
//!     → Pass to circuit breaker
//! ```
//!
//! # Design Decisions
//! - Quotas are per logical service, not per client
//! - Fail closed: an exhausted window rejects until it resets

pub mod rate_limit;

pub use rate_limit::{RateLimitPolicy, RateLimitSnapshot, RateLimiter};
