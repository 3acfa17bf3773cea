//! Routing subsystem.
//!
//! Resolves an inbound request to the logical service the pipeline
//! protects; it never picks an instance.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched Route (service name, uri rewrite) or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Sort by priority
//!     → Compile matchers
//!     → Freeze as immutable Router
//! ```

pub mod matcher;
pub mod router;

pub use router::{Route, Router};
