use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::config::TrackerConfig;
use crate::counters::{CallKind, RedundantCallCounters, RedundantCalls};
use crate::encoder::PassEncoder;
use crate::error::StateError;
use crate::layouts::LayoutIndex;
use crate::pass::TrackedPass;
use crate::pool::{PoolStats, RecordPool};
use crate::record::PassState;
use crate::registry::{PassId, PassRegistry};

/// Shared bookkeeping for every tracked pass: the pass registry and its
/// record pool, the layout metadata index, and the redundant-call counters.
///
/// Registry and index sit behind separate locks and are never held at the
/// same time, so passes recorded on different threads only contend for the
/// duration of a single comparison.
#[derive(Debug)]
pub struct StateTracker {
    config: TrackerConfig,
    passes: Mutex<PassRegistry>,
    layouts: RwLock<LayoutIndex>,
    counters: RedundantCallCounters,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl StateTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let pool = RecordPool::new(config.pool.preallocate, config.pool.max_idle);
        Self {
            config,
            passes: Mutex::new(PassRegistry::new(pool)),
            layouts: RwLock::new(LayoutIndex::default()),
            counters: RedundantCallCounters::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Registers a freshly begun pass and wraps its encoder.
    pub fn begin_pass<E: PassEncoder>(self: &Arc<Self>, encoder: E) -> TrackedPass<E> {
        let id = self.passes.lock().begin(E::KIND);
        debug!(pass = %id, kind = %E::KIND, "began tracked pass");
        TrackedPass::new(encoder, id, Arc::clone(self))
    }

    /// Takes ownership of a created bind group layout and remembers how many
    /// dynamic offsets it declares.
    pub fn register_bind_group_layout<L: Send + Sync + 'static>(
        &self,
        layout: L,
        dynamic_offsets: u32,
    ) -> Arc<L> {
        let layout = Arc::new(layout);
        let mut layouts = self.layouts.write();
        layouts.insert_layout(&layout, dynamic_offsets);
        let (tracked, bind_groups) = layouts.len();
        trace!(dynamic_offsets, tracked, bind_groups, "registered bind group layout");
        layout
    }

    /// Takes ownership of a created bind group and attaches the dynamic offset
    /// count of the layout it was created from, when that layout is known.
    pub fn register_bind_group<G: Send + Sync + 'static, L: ?Sized>(
        &self,
        group: G,
        layout: &Arc<L>,
    ) -> Arc<G> {
        let group = Arc::new(group);
        let count = self.layouts.write().insert_bind_group(&group, layout);
        if count.is_none() {
            trace!("bind group created from an untracked layout");
        }
        group
    }

    pub fn layout_dynamic_offset_count<L: ?Sized>(&self, layout: &Arc<L>) -> Option<u32> {
        self.layouts.read().layout_count(layout)
    }

    pub fn dynamic_offset_count<G: ?Sized>(&self, group: &Arc<G>) -> Option<u32> {
        self.layouts.read().bind_group_count(group)
    }

    /// Returns the elision counts gathered since the previous call and resets
    /// them to zero.
    pub fn get_and_reset_redundant_call_info(&self) -> RedundantCalls {
        self.counters.get_and_reset()
    }

    pub fn redundant_calls(&self) -> RedundantCalls {
        self.counters.snapshot()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.passes.lock().pool_stats()
    }

    pub fn active_passes(&self) -> usize {
        self.passes.lock().active_len()
    }

    /// Runs `apply` against the pass record. Returns whether the call must be
    /// forwarded to the encoder.
    pub(crate) fn record<F>(&self, id: PassId, kind: CallKind, apply: F) -> Result<bool, StateError>
    where
        F: FnOnce(&mut PassState) -> Result<bool, StateError>,
    {
        let changed = {
            let mut passes = self.passes.lock();
            apply(passes.state_mut(id)?)?
        };
        if changed {
            return Ok(true);
        }
        self.counters.increment(kind);
        trace!(pass = %id, call = %kind, elided = self.config.elide, "redundant call");
        Ok(!self.config.elide)
    }

    pub(crate) fn reset_for_bundles(&self, id: PassId) -> Result<(), StateError> {
        self.passes.lock().reset_for_bundles(id)
    }

    pub(crate) fn end_pass(&self, id: PassId) -> Result<(), StateError> {
        let mut passes = self.passes.lock();
        let kind = passes.kind(id);
        passes.end(id)?;
        drop(passes);
        debug!(pass = %id, kind = ?kind, "released pass record");
        Ok(())
    }
}
