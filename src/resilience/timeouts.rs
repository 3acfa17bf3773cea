//! Timeout enforcement for the forwarding call.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Every forward has a deadline, clamped to `MAX_FORWARD_TIMEOUT`
//! - Timeout errors are distinct from transport errors (504 vs 502)

use std::future::Future;
use std::time::Duration;
use tokio::time;

/// Lower bound for a forward deadline.
pub const MIN_FORWARD_TIMEOUT: Duration = Duration::from_millis(1);

/// Upper bound for a forward deadline.
pub const MAX_FORWARD_TIMEOUT: Duration = Duration::from_secs(60);

/// Clamp a configured deadline into the supported range.
pub fn bounded(requested: Duration) -> Duration {
    requested.clamp(MIN_FORWARD_TIMEOUT, MAX_FORWARD_TIMEOUT)
}

/// Run `fut` with a deadline; `None` means it timed out and was dropped.
pub async fn with_deadline<F: Future>(deadline: Duration, fut: F) -> Option<F::Output> {
    time::timeout(bounded(deadline), fut).await.ok()
}
