//! Atomically swappable policy set.
//!
//! Evaluators take a [`PolicyStore::snapshot`] and evaluate against it; a
//! concurrent [`PolicyStore::replace`] publishes a whole new set and never
//! affects a snapshot already taken.

use std::sync::{Arc, PoisonError, RwLock};

use crate::policy::PolicySet;

/// Shared holder of the active [`PolicySet`].
#[derive(Debug, Default)]
pub struct PolicyStore {
    current: RwLock<Arc<PolicySet>>,
}

impl PolicyStore {
    pub fn new(policies: PolicySet) -> Self {
        Self {
            current: RwLock::new(Arc::new(policies)),
        }
    }

    /// The set active right now.
    pub fn snapshot(&self) -> Arc<PolicySet> {
        // The guarded value is a single Arc, so a poisoned lock still holds a
        // complete set.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish a new set, returning the one it replaces.
    pub fn replace(&self, policies: PolicySet) -> Arc<PolicySet> {
        let next = Arc::new(policies);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *guard, next);
        tracing::info!(
            previous = previous.len(),
            current = guard.len(),
            "Replaced active policy set"
        );
        previous
    }
}

impl From<PolicySet> for PolicyStore {
    fn from(policies: PolicySet) -> Self {
        Self::new(policies)
    }
}
