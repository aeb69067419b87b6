//! Outcome ledger: completed dispatches, bounded, for idempotency.

use parking_lot::Mutex;
use shared_types::{ActionId, Outcome};
use std::collections::{HashMap, VecDeque};

/// Records the terminal outcome of each dispatched action.
///
/// A `Success`/`PartiallyApplied` entry makes a later re-dispatch of the
/// same action id a no-op (the recorded outcome is returned instead of
/// re-applying side effects). `Failed` entries allow a retry under the same
/// idempotency key.
#[derive(Default)]
pub struct OutcomeLedger {
    outcomes: Mutex<HashMap<ActionId, Outcome>>,
    insertion_order: Mutex<VecDeque<ActionId>>,
    retention: usize,
}

impl OutcomeLedger {
    pub fn new(retention: usize) -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            insertion_order: Mutex::new(VecDeque::new()),
            retention: retention.max(1),
        }
    }

    /// The recorded outcome that makes a re-dispatch unnecessary, if any.
    pub fn applied_outcome(&self, id: ActionId) -> Option<Outcome> {
        self.outcomes
            .lock()
            .get(&id)
            .filter(|outcome| !matches!(outcome, Outcome::Failed(_)))
            .cloned()
    }

    pub fn record(&self, id: ActionId, outcome: Outcome) {
        let mut outcomes = self.outcomes.lock();
        let mut order = self.insertion_order.lock();

        if outcomes.insert(id, outcome).is_none() {
            order.push_back(id);
            while order.len() > self.retention {
                if let Some(evicted) = order.pop_front() {
                    outcomes.remove(&evicted);
                }
            }
        }
    }

    pub fn get(&self, id: ActionId) -> Option<Outcome> {
        self.outcomes.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.lock().is_empty()
    }
}
