//! Snapshot of everything a single pass has bound so far.

use std::sync::Arc;

use crate::encoder::{BlendConstant, DynamicOffsets, IndexFormat, ScissorRect, SubRange, Viewport};
use crate::equality;
use crate::error::StateError;
use crate::handle::HandleRef;

#[derive(Debug, Clone)]
pub(crate) struct BoundOffsets {
    /// Owned copy of the offsets over the effective length.
    pub values: Vec<u32>,
    /// Present when the offsets were supplied in packed form.
    pub sub_range: Option<SubRange>,
}

#[derive(Debug, Clone)]
pub(crate) struct BoundBindGroup {
    pub handle: HandleRef,
    pub offsets: Option<BoundOffsets>,
}

#[derive(Debug, Clone)]
pub(crate) struct BoundBuffer {
    pub handle: HandleRef,
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct BoundIndexBuffer {
    pub buffer: BoundBuffer,
    pub format: IndexFormat,
}

/// Every `apply_*` method returns `Ok(true)` when the request changed the
/// record (and must reach the encoder) and `Ok(false)` when it was redundant.
#[derive(Debug, Default)]
pub(crate) struct PassState {
    pipeline: Option<HandleRef>,
    bind_groups: Vec<Option<BoundBindGroup>>,
    vertex_buffers: Vec<Option<BoundBuffer>>,
    index_buffer: Option<BoundIndexBuffer>,
    viewport: Option<Viewport>,
    scissor: Option<ScissorRect>,
    blend_constant: [f64; 4],
    stencil_reference: u32,
}

/// Bind group and vertex buffer slots a pass record tracks, each indexed
/// below this bound.
pub const MAX_SLOTS: u32 = 32;

fn slot_index(slot: u32) -> Result<usize, StateError> {
    if slot >= MAX_SLOTS {
        return Err(StateError::SlotOutOfRange {
            slot,
            max: MAX_SLOTS,
        });
    }
    Ok(slot as usize)
}

fn slot_mut<T>(slots: &mut Vec<Option<T>>, index: usize) -> &mut Option<T> {
    if slots.len() <= index {
        slots.resize_with(index + 1, || None);
    }
    &mut slots[index]
}

impl PassState {
    /// Clears draw-level state; viewport, scissor, blend constant and stencil
    /// reference survive because executing bundles leaves them untouched.
    pub fn reset_for_bundles(&mut self) {
        self.pipeline = None;
        self.bind_groups.clear();
        self.vertex_buffers.clear();
        self.index_buffer = None;
    }

    pub fn reset(&mut self) {
        self.reset_for_bundles();
        self.viewport = None;
        self.scissor = None;
        self.blend_constant = [0.0; 4];
        self.stencil_reference = 0;
    }

    pub fn apply_pipeline<P: Send + Sync + 'static>(&mut self, pipeline: &Arc<P>) -> bool {
        if equality::same_pipeline(self.pipeline.as_ref(), &**pipeline) {
            return false;
        }
        self.pipeline = Some(HandleRef::new(pipeline));
        true
    }

    pub fn apply_bind_group<G: Send + Sync + 'static>(
        &mut self,
        slot: u32,
        group: &Arc<G>,
        offsets: Option<&DynamicOffsets<'_>>,
        declared: Option<u32>,
    ) -> Result<bool, StateError> {
        let index = slot_index(slot)?;
        let bound = self.bind_groups.get(index).and_then(Option::as_ref);
        if equality::same_bind_group(bound, slot, &**group, offsets, declared)? {
            return Ok(false);
        }

        let window = match offsets {
            Some(offsets) => {
                let count = equality::declared_offsets(slot, declared, offsets)?;
                Some((offsets.window(count)?, offsets.sub_range()))
            }
            None => None,
        };

        let entry = slot_mut(&mut self.bind_groups, index);
        let offsets = window.map(|(window, sub_range)| {
            // Reuse the slot's previous allocation for the copied offsets.
            let mut values = entry
                .take()
                .and_then(|previous| previous.offsets)
                .map(|previous| previous.values)
                .unwrap_or_default();
            values.clear();
            values.extend(window.iter());
            BoundOffsets { values, sub_range }
        });
        *entry = Some(BoundBindGroup {
            handle: HandleRef::new(group),
            offsets,
        });
        Ok(true)
    }

    pub fn apply_vertex_buffer<B: Send + Sync + 'static>(
        &mut self,
        slot: u32,
        buffer: &Arc<B>,
        buffer_size: u64,
        offset: Option<u64>,
        size: Option<u64>,
    ) -> Result<bool, StateError> {
        let index = slot_index(slot)?;
        let (offset, size) = equality::resolve_range(buffer_size, offset, size)?;
        let bound = self.vertex_buffers.get(index).and_then(Option::as_ref);
        if equality::same_vertex_buffer(bound, &**buffer, offset, size) {
            return Ok(false);
        }
        *slot_mut(&mut self.vertex_buffers, index) = Some(BoundBuffer {
            handle: HandleRef::new(buffer),
            offset,
            size,
        });
        Ok(true)
    }

    pub fn apply_index_buffer<B: Send + Sync + 'static>(
        &mut self,
        buffer: &Arc<B>,
        buffer_size: u64,
        format: IndexFormat,
        offset: Option<u64>,
        size: Option<u64>,
    ) -> Result<bool, StateError> {
        let (offset, size) = equality::resolve_range(buffer_size, offset, size)?;
        if equality::same_index_buffer(self.index_buffer.as_ref(), &**buffer, format, offset, size)
        {
            return Ok(false);
        }
        self.index_buffer = Some(BoundIndexBuffer {
            buffer: BoundBuffer {
                handle: HandleRef::new(buffer),
                offset,
                size,
            },
            format,
        });
        Ok(true)
    }

    pub fn apply_viewport(&mut self, viewport: Viewport) -> bool {
        if equality::same_viewport(self.viewport, viewport) {
            return false;
        }
        self.viewport = Some(viewport);
        true
    }

    pub fn apply_scissor(&mut self, rect: ScissorRect) -> bool {
        if equality::same_scissor(self.scissor, rect) {
            return false;
        }
        self.scissor = Some(rect);
        true
    }

    pub fn apply_blend_constant(&mut self, color: &BlendConstant) -> bool {
        if equality::same_blend_constant(self.blend_constant, color) {
            return false;
        }
        self.blend_constant = color.components();
        true
    }

    pub fn apply_stencil_reference(&mut self, reference: u32) -> bool {
        if equality::same_stencil_reference(self.stencil_reference, reference) {
            return false;
        }
        self.stencil_reference = reference;
        true
    }
}
