//! Per-order leases
//!
//! The orchestrator acquires a scoped lease before transitioning an order
//! into `checking`/`pre_auth_pending`, guaranteeing at most one in-flight
//! workflow operation per order. The lease releases on drop, including every
//! error path, so a crashed attempt cannot permanently wedge an order.

use std::sync::Arc;

use dashmap::DashMap;
use meridian_domain::OrderId;

/// Registry of orders with an operation currently in flight
#[derive(Clone, Default)]
pub struct LeaseRegistry {
    inflight: Arc<DashMap<OrderId, ()>>,
}

impl LeaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to acquire the lease for an order.
    ///
    /// Returns `None` when another operation already holds it; the caller
    /// rejects the duplicate rather than queueing behind it.
    pub fn try_acquire(&self, order_id: OrderId) -> Option<OrderLease> {
        match self.inflight.entry(order_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(());
                Some(OrderLease { registry: Arc::clone(&self.inflight), order_id })
            }
        }
    }

    pub fn is_held(&self, order_id: OrderId) -> bool {
        self.inflight.contains_key(&order_id)
    }
}

/// Scoped lease on one order; released unconditionally on drop
pub struct OrderLease {
    registry: Arc<DashMap<OrderId, ()>>,
    order_id: OrderId,
}

impl OrderLease {
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }
}

impl Drop for OrderLease {
    fn drop(&mut self) {
        self.registry.remove(&self.order_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected_while_held() {
        let registry = LeaseRegistry::new();

        let lease = registry.try_acquire(7).expect("first acquire");
        assert!(registry.is_held(7));
        assert!(registry.try_acquire(7).is_none());

        // a different order is unaffected
        assert!(registry.try_acquire(8).is_some());

        drop(lease);
        assert!(!registry.is_held(7));
        assert!(registry.try_acquire(7).is_some());
    }

    #[test]
    fn lease_releases_on_panic_unwind() {
        let registry = LeaseRegistry::new();
        let registry_clone = registry.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _lease = registry_clone.try_acquire(3).expect("acquire");
            panic!("simulated failure mid-operation");
        }));

        assert!(result.is_err());
        assert!(!registry.is_held(3));
    }
}
