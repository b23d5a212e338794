//! Recording encoder that performs no GPU work.
//!
//! Every call that reaches it is appended to a shared [`CallLog`], which makes
//! it the backend for trace replay and for exercising the tracker in tests.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::counters::CallKind;
use crate::encoder::{
    BlendConstant, IndexFormat, PassEncoder, PassKind, RenderEncoder, ScissorRect, Viewport,
};

/// Stand-in for any host object: pipelines, bind groups, layouts, buffers
/// and bundles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullResource {
    label: String,
    size: u64,
}

impl NullResource {
    pub fn new(label: impl Into<String>) -> Self {
        Self::buffer(label, 0)
    }

    pub fn buffer(label: impl Into<String>, size: u64) -> Self {
        Self {
            label: label.into(),
            size,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", content = "args", rename_all = "camelCase")]
pub enum RecordedCall {
    SetPipeline {
        pipeline: String,
    },
    SetBindGroup {
        index: u32,
        bind_group: String,
        offsets: Option<Vec<u32>>,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: String,
        offset: Option<u64>,
        size: Option<u64>,
    },
    SetIndexBuffer {
        buffer: String,
        format: IndexFormat,
        offset: Option<u64>,
        size: Option<u64>,
    },
    SetViewport(Viewport),
    SetScissorRect(ScissorRect),
    SetBlendConstant(BlendConstant),
    SetStencilReference(u32),
    ExecuteBundles(Vec<String>),
    End,
}

impl RecordedCall {
    /// Counter bucket of a state-setting call; `None` for bundles and `end`.
    pub fn kind(&self) -> Option<CallKind> {
        match self {
            RecordedCall::SetPipeline { .. } => Some(CallKind::SetPipeline),
            RecordedCall::SetBindGroup { .. } => Some(CallKind::SetBindGroup),
            RecordedCall::SetVertexBuffer { .. } => Some(CallKind::SetVertexBuffer),
            RecordedCall::SetIndexBuffer { .. } => Some(CallKind::SetIndexBuffer),
            RecordedCall::SetViewport(_) => Some(CallKind::SetViewport),
            RecordedCall::SetScissorRect(_) => Some(CallKind::SetScissorRect),
            RecordedCall::SetBlendConstant(_) => Some(CallKind::SetBlendConstant),
            RecordedCall::SetStencilReference(_) => Some(CallKind::SetStencilReference),
            RecordedCall::ExecuteBundles(_) | RecordedCall::End => None,
        }
    }
}

/// Shared, append-only list of calls that reached a recording encoder.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<RecordedCall>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: RecordedCall) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.0.lock().clone()
    }

    pub fn take(&self) -> Vec<RecordedCall> {
        std::mem::take(&mut *self.0.lock())
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Number of forwarded calls of the given kind.
    pub fn forwarded(&self, kind: CallKind) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|call| call.kind() == Some(kind))
            .count()
    }
}

pub trait RecordingKind {
    const KIND: PassKind;
}

#[derive(Debug)]
pub enum Render {}

#[derive(Debug)]
pub enum Compute {}

impl RecordingKind for Render {
    const KIND: PassKind = PassKind::Render;
}

impl RecordingKind for Compute {
    const KIND: PassKind = PassKind::Compute;
}

#[derive(Debug)]
pub struct RecordingEncoder<K> {
    log: CallLog,
    kind: PhantomData<K>,
}

pub type RecordingRenderEncoder = RecordingEncoder<Render>;
pub type RecordingComputeEncoder = RecordingEncoder<Compute>;

impl<K: RecordingKind> RecordingEncoder<K> {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            kind: PhantomData,
        }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

impl<K: RecordingKind> PassEncoder for RecordingEncoder<K> {
    type Pipeline = NullResource;
    type BindGroup = NullResource;

    const KIND: PassKind = K::KIND;

    fn set_pipeline(&mut self, pipeline: &NullResource) {
        self.log.push(RecordedCall::SetPipeline {
            pipeline: pipeline.label.clone(),
        });
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &NullResource, offsets: Option<&[u32]>) {
        self.log.push(RecordedCall::SetBindGroup {
            index,
            bind_group: bind_group.label.clone(),
            offsets: offsets.map(<[u32]>::to_vec),
        });
    }

    fn end(self) {
        self.log.push(RecordedCall::End);
    }
}

impl RenderEncoder for RecordingEncoder<Render> {
    type Buffer = NullResource;
    type Bundle = NullResource;

    fn buffer_size(buffer: &NullResource) -> u64 {
        buffer.size
    }

    fn set_vertex_buffer(
        &mut self,
        slot: u32,
        buffer: &NullResource,
        offset: Option<u64>,
        size: Option<u64>,
    ) {
        self.log.push(RecordedCall::SetVertexBuffer {
            slot,
            buffer: buffer.label.clone(),
            offset,
            size,
        });
    }

    fn set_index_buffer(
        &mut self,
        buffer: &NullResource,
        format: IndexFormat,
        offset: Option<u64>,
        size: Option<u64>,
    ) {
        self.log.push(RecordedCall::SetIndexBuffer {
            buffer: buffer.label.clone(),
            format,
            offset,
            size,
        });
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.log.push(RecordedCall::SetViewport(viewport));
    }

    fn set_scissor_rect(&mut self, rect: ScissorRect) {
        self.log.push(RecordedCall::SetScissorRect(rect));
    }

    fn set_blend_constant(&mut self, color: BlendConstant) {
        self.log.push(RecordedCall::SetBlendConstant(color));
    }

    fn set_stencil_reference(&mut self, reference: u32) {
        self.log.push(RecordedCall::SetStencilReference(reference));
    }

    fn execute_bundles(&mut self, bundles: &[&NullResource]) {
        let labels = bundles.iter().map(|bundle| bundle.label.clone()).collect();
        self.log.push(RecordedCall::ExecuteBundles(labels));
    }
}
