//! Round-robin load balancing strategy.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use dashmap::DashMap;

use crate::error::GatewayError;
use crate::load_balancer::{instance::ServiceInstance, registry::InstanceRegistry};

/// Round-robin selector.
/// Stores one counter per service to rotate through its instances.
#[derive(Debug)]
pub struct RoundRobinSelector {
    registry: Arc<InstanceRegistry>,
    counters: DashMap<String, AtomicUsize>,
}

impl RoundRobinSelector {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        Self {
            registry,
            counters: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    /// Pick the next instance of `service`.
    pub fn select(&self, service: &str) -> Result<ServiceInstance, GatewayError> {
        let instances = self.registry.instances_for(service)?;
        if instances.is_empty() {
            return Err(GatewayError::EmptyPool(service.to_string()));
        }

        let ticket = self.next_ticket(service);
        Ok(instances[ticket % instances.len()].clone())
    }

    /// Unique, monotonically increasing value per call for `service`.
    fn next_ticket(&self, service: &str) -> usize {
        if let Some(counter) = self.counters.get(service) {
            return counter.fetch_add(1, Ordering::Relaxed);
        }
        self.counters
            .entry(service.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed)
    }
}
