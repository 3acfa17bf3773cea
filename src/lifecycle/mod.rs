//! Lifecycle management.
//!
//! ```text
//! Ctrl+C → Shutdown::trigger → every subscriber (gateway, admin, watcher)
//!     → stop accepting → drain in-flight requests → exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
