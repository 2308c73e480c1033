//! Committed state

use crate::state::StateCache;
use crate::working_set::WorkingSet;
use std::sync::Arc;

/// Owner of the committed state. Hands out working sets over a shared,
/// immutable view and folds committed working sets back in.
#[derive(Debug, Default)]
pub struct StateFactory {
    committed: Arc<StateCache>,
    height: u64,
}

impl StateFactory {
    /// Create an empty state factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Height of the last committed working set
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Open a working set over the current committed state
    pub fn new_working_set(&self) -> WorkingSet {
        WorkingSet::new(Arc::clone(&self.committed), self.height)
    }

    /// Commit a working set; later working sets observe its changes
    pub fn commit(&mut self, working_set: WorkingSet) {
        let height = working_set.height();
        let delta = working_set.into_delta();
        tracing::debug!(
            height,
            accounts = delta.account_count(),
            slots = delta.storage_count(),
            "committing working set"
        );
        Arc::make_mut(&mut self.committed).apply(delta);
        self.height = height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StateReader;
    use fugue_primitives::{Address, U256};

    #[test]
    fn test_commit_is_visible_to_new_working_sets() {
        let mut factory = StateFactory::new();
        let alice = Address::from_bytes([0xa1; 20]);

        let mut ws = factory.new_working_set();
        ws.load_or_create_account(&alice, U256::from(500u64)).unwrap();
        factory.commit(ws);

        let view = factory.new_working_set();
        assert_eq!(view.balance(&alice), U256::from(500u64));
    }

    #[test]
    fn test_dropped_working_set_leaves_state_untouched() {
        let factory = StateFactory::new();
        let alice = Address::from_bytes([0xa1; 20]);

        {
            let mut ws = factory.new_working_set();
            ws.load_or_create_account(&alice, U256::from(500u64)).unwrap();
        }

        assert!(!factory.new_working_set().exists(&alice));
    }

    #[test]
    fn test_commit_advances_height() {
        let mut factory = StateFactory::new();
        let mut ws = factory.new_working_set();
        ws.set_height(4);
        factory.commit(ws);
        assert_eq!(factory.height(), 4);
    }
}
