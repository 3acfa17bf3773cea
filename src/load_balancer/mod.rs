//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Discovery feed / config reload
//!     → registry.rs (replace instance list for a service)
//!
//! Request for logical service S
//!     → round_robin.rs (next counter value for S)
//!     → registry.rs (current instance list for S)
//!     → index = counter mod len
//!     → ServiceInstance or UnknownService / EmptyPool
//! ```
//!
//! # Design Decisions
//! - Instances are plain immutable records
//! - One counter per service; the atomic increment is the unit of selection
//! - Registry updates never reset counters

pub mod instance;
pub mod registry;
pub mod round_robin;

pub use instance::ServiceInstance;
pub use registry::InstanceRegistry;
pub use round_robin::RoundRobinSelector;
