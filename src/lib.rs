//! Traffic-control gateway library.
//!
//! Rate limiting, circuit breaking and round-robin instance selection
//! composed as an ordered filter chain in front of a clustered backend.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod pipeline;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{FilterChain, Rejection};
