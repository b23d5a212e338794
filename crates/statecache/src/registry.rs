use std::collections::HashMap;
use std::fmt;

use crate::encoder::PassKind;
use crate::error::StateError;
use crate::pool::{PoolStats, RecordPool};
use crate::record::PassState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(u64);

impl PassId {
    pub fn from_raw(raw: u64) -> Self {
        PassId(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pass#{}", self.0)
    }
}

#[derive(Debug)]
struct ActivePass {
    kind: PassKind,
    state: PassState,
}

/// Maps active passes to the record tracking their bound state.
#[derive(Debug)]
pub(crate) struct PassRegistry {
    active: HashMap<PassId, ActivePass>,
    pool: RecordPool,
    next_id: u64,
}

impl PassRegistry {
    pub fn new(pool: RecordPool) -> Self {
        Self {
            active: HashMap::new(),
            pool,
            next_id: 1,
        }
    }

    pub fn begin(&mut self, kind: PassKind) -> PassId {
        let id = PassId(self.next_id);
        self.next_id += 1;
        let state = self.pool.acquire();
        self.active.insert(id, ActivePass { kind, state });
        id
    }

    pub fn state_mut(&mut self, id: PassId) -> Result<&mut PassState, StateError> {
        self.active
            .get_mut(&id)
            .map(|pass| &mut pass.state)
            .ok_or(StateError::UnknownPass(id))
    }

    pub fn kind(&self, id: PassId) -> Option<PassKind> {
        self.active.get(&id).map(|pass| pass.kind)
    }

    pub fn reset_for_bundles(&mut self, id: PassId) -> Result<(), StateError> {
        self.state_mut(id)?.reset_for_bundles();
        Ok(())
    }

    pub fn end(&mut self, id: PassId) -> Result<(), StateError> {
        let pass = self.active.remove(&id).ok_or(StateError::UnknownPass(id))?;
        self.pool.release(pass.state);
        Ok(())
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}
