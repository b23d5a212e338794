//! Interception layer wrapped around a pass encoder.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::counters::CallKind;
use crate::encoder::{
    BlendConstant, DynamicOffsets, IndexFormat, PassEncoder, RenderEncoder, ScissorRect, Viewport,
};
use crate::error::StateError;
use crate::registry::PassId;
use crate::tracker::StateTracker;

/// A pass encoder whose state-setting calls are filtered through the pass
/// record. Redundant calls are counted and, unless the tracker runs in
/// count-only mode, never reach the wrapped encoder.
///
/// Dropping a pass without calling [`TrackedPass::end`] releases its record
/// but does not forward `end` to the encoder.
pub struct TrackedPass<E: PassEncoder> {
    encoder: Option<E>,
    id: PassId,
    tracker: Arc<StateTracker>,
}

impl<E: PassEncoder> fmt::Debug for TrackedPass<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedPass")
            .field("id", &self.id)
            .field("kind", &E::KIND)
            .field("ended", &self.encoder.is_none())
            .finish()
    }
}

impl<E: PassEncoder> TrackedPass<E> {
    pub(crate) fn new(encoder: E, id: PassId, tracker: Arc<StateTracker>) -> Self {
        Self {
            encoder: Some(encoder),
            id,
            tracker,
        }
    }

    pub fn id(&self) -> PassId {
        self.id
    }

    pub fn tracker(&self) -> &Arc<StateTracker> {
        &self.tracker
    }

    /// The wrapped encoder, for calls the tracker does not intercept.
    pub fn encoder_mut(&mut self) -> Result<&mut E, StateError> {
        self.encoder.as_mut().ok_or(StateError::UnknownPass(self.id))
    }

    pub fn set_pipeline(&mut self, pipeline: &Arc<E::Pipeline>) -> Result<(), StateError> {
        let forward = self.tracker.record(self.id, CallKind::SetPipeline, |state| {
            Ok(state.apply_pipeline(pipeline))
        })?;
        if forward {
            self.encoder_mut()?.set_pipeline(pipeline);
        }
        Ok(())
    }

    pub fn set_bind_group(
        &mut self,
        index: u32,
        bind_group: &Arc<E::BindGroup>,
        offsets: Option<DynamicOffsets<'_>>,
    ) -> Result<(), StateError> {
        // Malformed offsets fail here, before the record can change.
        let words = offsets.as_ref().map(DynamicOffsets::words).transpose()?;
        let declared = self.tracker.dynamic_offset_count(bind_group);
        let forward = self.tracker.record(self.id, CallKind::SetBindGroup, |state| {
            state.apply_bind_group(index, bind_group, offsets.as_ref(), declared)
        })?;
        if forward {
            self.encoder_mut()?
                .set_bind_group(index, bind_group, words.as_deref());
        }
        Ok(())
    }

    /// Releases the pass record and ends the wrapped encoder.
    pub fn end(mut self) -> Result<(), StateError> {
        let released = self.tracker.end_pass(self.id);
        if let Some(encoder) = self.encoder.take() {
            encoder.end();
        }
        released
    }
}

impl<E: RenderEncoder> TrackedPass<E> {
    pub fn set_vertex_buffer(
        &mut self,
        slot: u32,
        buffer: &Arc<E::Buffer>,
        offset: Option<u64>,
        size: Option<u64>,
    ) -> Result<(), StateError> {
        let buffer_size = E::buffer_size(buffer);
        let forward = self.tracker.record(self.id, CallKind::SetVertexBuffer, |state| {
            state.apply_vertex_buffer(slot, buffer, buffer_size, offset, size)
        })?;
        if forward {
            self.encoder_mut()?
                .set_vertex_buffer(slot, buffer, offset, size);
        }
        Ok(())
    }

    pub fn set_index_buffer(
        &mut self,
        buffer: &Arc<E::Buffer>,
        format: IndexFormat,
        offset: Option<u64>,
        size: Option<u64>,
    ) -> Result<(), StateError> {
        let buffer_size = E::buffer_size(buffer);
        let forward = self.tracker.record(self.id, CallKind::SetIndexBuffer, |state| {
            state.apply_index_buffer(buffer, buffer_size, format, offset, size)
        })?;
        if forward {
            self.encoder_mut()?
                .set_index_buffer(buffer, format, offset, size);
        }
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), StateError> {
        let forward = self.tracker.record(self.id, CallKind::SetViewport, |state| {
            Ok(state.apply_viewport(viewport))
        })?;
        if forward {
            self.encoder_mut()?.set_viewport(viewport);
        }
        Ok(())
    }

    pub fn set_scissor_rect(&mut self, rect: ScissorRect) -> Result<(), StateError> {
        let forward = self.tracker.record(self.id, CallKind::SetScissorRect, |state| {
            Ok(state.apply_scissor(rect))
        })?;
        if forward {
            self.encoder_mut()?.set_scissor_rect(rect);
        }
        Ok(())
    }

    pub fn set_blend_constant(&mut self, color: impl Into<BlendConstant>) -> Result<(), StateError> {
        let color = color.into();
        let forward = self.tracker.record(self.id, CallKind::SetBlendConstant, |state| {
            Ok(state.apply_blend_constant(&color))
        })?;
        if forward {
            self.encoder_mut()?.set_blend_constant(color);
        }
        Ok(())
    }

    pub fn set_stencil_reference(&mut self, reference: u32) -> Result<(), StateError> {
        let forward = self.tracker.record(self.id, CallKind::SetStencilReference, |state| {
            Ok(state.apply_stencil_reference(reference))
        })?;
        if forward {
            self.encoder_mut()?.set_stencil_reference(reference);
        }
        Ok(())
    }

    /// Always forwarded. Bundles clobber pipeline and resource bindings, so
    /// those parts of the record are cleared first.
    pub fn execute_bundles(&mut self, bundles: &[&E::Bundle]) -> Result<(), StateError> {
        self.tracker.reset_for_bundles(self.id)?;
        self.encoder_mut()?.execute_bundles(bundles);
        Ok(())
    }
}

impl<E: PassEncoder> Drop for TrackedPass<E> {
    fn drop(&mut self) {
        if self.encoder.take().is_some() && self.tracker.end_pass(self.id).is_ok() {
            debug!(pass = %self.id, "tracked pass dropped without end, record released");
        }
    }
}
