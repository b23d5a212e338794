use serde::Serialize;

use crate::record::PassState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Records waiting in the free list.
    pub idle: usize,
    /// Records allocated over the pool's lifetime.
    pub allocated: usize,
}

/// Free list of pass records, used in stack order.
#[derive(Debug)]
pub(crate) struct RecordPool {
    free: Vec<PassState>,
    max_idle: usize,
    allocated: usize,
}

impl RecordPool {
    pub fn new(preallocate: usize, max_idle: usize) -> Self {
        let count = preallocate.min(max_idle);
        Self {
            free: (0..count).map(|_| PassState::default()).collect(),
            max_idle,
            allocated: count,
        }
    }

    pub fn acquire(&mut self) -> PassState {
        match self.free.pop() {
            Some(mut state) => {
                state.reset();
                state
            }
            None => {
                self.allocated += 1;
                PassState::default()
            }
        }
    }

    pub fn release(&mut self, mut state: PassState) {
        state.reset();
        if self.free.len() < self.max_idle {
            self.free.push(state);
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.free.len(),
            allocated: self.allocated,
        }
    }
}
