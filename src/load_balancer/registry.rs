//! Instance registry.
//!
//! # Responsibilities
//! - Map logical service names to their ordered instance lists
//! - Replace a service's list wholesale when discovery pushes an update
//!
//! # Design Decisions
//! - Copy-on-write snapshot behind `ArcSwap`: readers never lock and see
//!   either the fully-old or fully-new list
//! - List order is the round-robin cycle order

use std::collections::HashMap;
use std::sync::Arc;
use arc_swap::ArcSwap;

use crate::error::GatewayError;
use crate::load_balancer::instance::ServiceInstance;

type Snapshot = HashMap<String, Arc<[ServiceInstance]>>;

/// Registry of backend instances keyed by logical service name.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    services: ArcSwap<Snapshot>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full instance list of `service`.
    pub fn register(&self, service: &str, instances: Vec<ServiceInstance>) {
        let instances: Arc<[ServiceInstance]> = instances.into();
        let count = instances.len();
        self.services.rcu(|current| {
            let mut next = Snapshot::clone(current);
            next.insert(service.to_string(), instances.clone());
            next
        });
        tracing::info!(service = %service, instances = count, "Instance list registered");
    }

    /// Remove a service entirely; later lookups fail with `UnknownService`.
    pub fn deregister(&self, service: &str) -> bool {
        let mut removed = false;
        self.services.rcu(|current| {
            let mut next = Snapshot::clone(current);
            removed = next.remove(service).is_some();
            next
        });
        removed
    }

    /// Current instance list of `service`.
    pub fn instances_for(&self, service: &str) -> Result<Arc<[ServiceInstance]>, GatewayError> {
        self.services
            .load()
            .get(service)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownService(service.to_string()))
    }

    /// Names of all registered services, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.load().keys().cloned().collect();
        names.sort();
        names
    }
}
