//! Resource budget: an explicit atomic counter, not ambient global state.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide response budget.
///
/// Decremented by action cost on dispatch, restored to capacity on a fixed
/// replenish interval. Compare-exchange keeps concurrent charges from ever
/// driving it negative.
pub struct ResourceBudget {
    available: AtomicU64,
    capacity: u64,
}

impl ResourceBudget {
    pub fn new(capacity: u64) -> Self {
        Self {
            available: AtomicU64::new(capacity),
            capacity,
        }
    }

    /// Attempt to charge `cost` units. Returns whether the charge fit.
    pub fn try_charge(&self, cost: u64) -> bool {
        if cost == 0 {
            return true;
        }
        let mut current = self.available.load(Ordering::Acquire);
        loop {
            if current < cost {
                return false;
            }
            match self.available.compare_exchange_weak(
                current,
                current - cost,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Charge as much of `cost` as remains. Used for the Alert exemption:
    /// an alert is never blocked by budget, it just drains what is left.
    pub fn charge_saturating(&self, cost: u64) {
        let mut current = self.available.load(Ordering::Acquire);
        loop {
            let next = current.saturating_sub(cost);
            match self.available.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Restore to capacity (never beyond).
    pub fn replenish(&self) {
        self.available.store(self.capacity, Ordering::Release);
    }

    pub fn available(&self) -> u64 {
        self.available.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_charge_and_replenish() {
        let budget = ResourceBudget::new(10);

        assert!(budget.try_charge(6));
        assert_eq!(budget.available(), 4);
        assert!(!budget.try_charge(5));
        assert_eq!(budget.available(), 4);

        budget.replenish();
        assert_eq!(budget.available(), 10);
    }

    #[test]
    fn test_zero_cost_always_fits() {
        let budget = ResourceBudget::new(0);
        assert!(budget.try_charge(0));
    }

    #[test]
    fn test_saturating_charge_floors_at_zero() {
        let budget = ResourceBudget::new(3);
        budget.charge_saturating(10);
        assert_eq!(budget.available(), 0);
    }

    #[test]
    fn test_replenish_never_exceeds_capacity() {
        let budget = ResourceBudget::new(10);
        budget.replenish();
        budget.replenish();
        assert_eq!(budget.available(), 10);
    }

    #[test]
    fn test_concurrent_charges_never_go_negative() {
        let budget = Arc::new(ResourceBudget::new(100));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let budget = Arc::clone(&budget);
            handles.push(thread::spawn(move || {
                let mut charged = 0u64;
                for _ in 0..100 {
                    if budget.try_charge(3) {
                        charged += 3;
                    }
                }
                charged
            }));
        }

        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // Exactly the successful charges left the budget.
        assert_eq!(budget.available(), 100 - total.min(100));
        assert!(total <= 100);
    }
}
