//! Active operations of one connection.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio_util::sync::CancellationToken;

/// Operation id to cancellation handle.
///
/// Every terminal path (stop, natural completion, teardown) goes through a
/// map removal; whichever removes the entry first owns the terminal message.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: DashMap<String, CancellationToken>,
}

impl OperationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a handle built by `factory` unless `operation_id` is present.
    ///
    /// `factory` only runs when the slot is vacant. Returns whether the
    /// handle was stored.
    pub fn insert_with<F>(&self, operation_id: &str, factory: F) -> bool
    where
        F: FnOnce(&str) -> CancellationToken,
    {
        match self.operations.entry(operation_id.to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let _ = slot.insert(factory(operation_id));
                true
            }
        }
    }

    /// Whether `operation_id` is active.
    pub fn contains(&self, operation_id: &str) -> bool {
        self.operations.contains_key(operation_id)
    }

    /// Remove and cancel. Returns `false` if another path removed it first.
    pub fn cancel(&self, operation_id: &str) -> bool {
        match self.operations.remove(operation_id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove without cancelling. Returns `false` if another path removed it
    /// first.
    pub fn remove(&self, operation_id: &str) -> bool {
        self.operations.remove(operation_id).is_some()
    }

    /// Cancel and remove every operation. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        self.operations.retain(|_, token| {
            token.cancel();
            cancelled += 1;
            false
        });
        cancelled
    }

    /// Number of active operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operation is active.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Active operation ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.operations.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
