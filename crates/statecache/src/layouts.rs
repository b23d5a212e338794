//! Dynamic offset counts captured when layouts and bind groups are created.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::handle::address_of;

const MIN_PRUNE_LEN: usize = 64;

/// Non-owning map from object identity to a dynamic offset count.
///
/// Entries hold `Weak` references: objects are never kept alive by the index,
/// and a live entry pins the allocation so its address cannot be handed to a
/// different object.
#[derive(Debug)]
struct IdentityCounts {
    entries: HashMap<usize, (Weak<dyn Any + Send + Sync>, u32)>,
    prune_at: usize,
}

impl Default for IdentityCounts {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            prune_at: MIN_PRUNE_LEN,
        }
    }
}

impl IdentityCounts {
    fn insert<T: Send + Sync + 'static>(&mut self, object: &Arc<T>, count: u32) {
        if self.entries.len() >= self.prune_at {
            self.prune();
        }
        let weak: Weak<T> = Arc::downgrade(object);
        let weak: Weak<dyn Any + Send + Sync> = weak;
        self.entries.insert(address_of(&**object), (weak, count));
    }

    fn get<T: ?Sized>(&self, object: &T) -> Option<u32> {
        self.entries
            .get(&address_of(object))
            .filter(|(weak, _)| weak.strong_count() > 0)
            .map(|(_, count)| *count)
    }

    fn prune(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|_, (weak, _)| weak.strong_count() > 0);
        self.prune_at = (self.entries.len() * 2).max(MIN_PRUNE_LEN);
        tracing::trace!(
            removed = before - self.entries.len(),
            remaining = self.entries.len(),
            "pruned dead layout index entries"
        );
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Default)]
pub(crate) struct LayoutIndex {
    layouts: IdentityCounts,
    bind_groups: IdentityCounts,
}

impl LayoutIndex {
    pub fn insert_layout<L: Send + Sync + 'static>(&mut self, layout: &Arc<L>, count: u32) {
        self.layouts.insert(layout, count);
    }

    pub fn layout_count<L: ?Sized>(&self, layout: &Arc<L>) -> Option<u32> {
        self.layouts.get(&**layout)
    }

    /// Records `group` with its layout's count. Returns the count attached,
    /// `None` when the layout was never seen (e.g. an implicit pipeline layout).
    pub fn insert_bind_group<G: Send + Sync + 'static, L: ?Sized>(
        &mut self,
        group: &Arc<G>,
        layout: &Arc<L>,
    ) -> Option<u32> {
        let count = self.layouts.get(&**layout)?;
        self.bind_groups.insert(group, count);
        Some(count)
    }

    pub fn bind_group_count<G: ?Sized>(&self, group: &Arc<G>) -> Option<u32> {
        self.bind_groups.get(&**group)
    }

    pub fn len(&self) -> (usize, usize) {
        (self.layouts.len(), self.bind_groups.len())
    }
}
