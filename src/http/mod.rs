//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → [routing resolves the logical service]
//!     → [pipeline: rate limit → breaker → select → forward]
//!     → response.rs (JSON envelope for errors and rejections)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::ApiEnvelope;
pub use server::{build_chain, AppState, HttpServer};
