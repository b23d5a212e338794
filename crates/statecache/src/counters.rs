use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// State-setting entry points whose redundant calls are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    SetPipeline,
    SetVertexBuffer,
    SetIndexBuffer,
    SetBindGroup,
    SetViewport,
    SetScissorRect,
    SetBlendConstant,
    SetStencilReference,
}

impl CallKind {
    pub const ALL: [CallKind; 8] = [
        CallKind::SetPipeline,
        CallKind::SetVertexBuffer,
        CallKind::SetIndexBuffer,
        CallKind::SetBindGroup,
        CallKind::SetViewport,
        CallKind::SetScissorRect,
        CallKind::SetBlendConstant,
        CallKind::SetStencilReference,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CallKind::SetPipeline => "setPipeline",
            CallKind::SetVertexBuffer => "setVertexBuffer",
            CallKind::SetIndexBuffer => "setIndexBuffer",
            CallKind::SetBindGroup => "setBindGroup",
            CallKind::SetViewport => "setViewport",
            CallKind::SetScissorRect => "setScissorRect",
            CallKind::SetBlendConstant => "setBlendConstant",
            CallKind::SetStencilReference => "setStencilReference",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of elided-call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedundantCalls {
    pub set_pipeline: u64,
    pub set_vertex_buffer: u64,
    pub set_index_buffer: u64,
    pub set_bind_group: u64,
    pub set_viewport: u64,
    pub set_scissor_rect: u64,
    pub set_blend_constant: u64,
    pub set_stencil_reference: u64,
}

impl RedundantCalls {
    pub fn get(&self, kind: CallKind) -> u64 {
        match kind {
            CallKind::SetPipeline => self.set_pipeline,
            CallKind::SetVertexBuffer => self.set_vertex_buffer,
            CallKind::SetIndexBuffer => self.set_index_buffer,
            CallKind::SetBindGroup => self.set_bind_group,
            CallKind::SetViewport => self.set_viewport,
            CallKind::SetScissorRect => self.set_scissor_rect,
            CallKind::SetBlendConstant => self.set_blend_constant,
            CallKind::SetStencilReference => self.set_stencil_reference,
        }
    }

    fn slot_mut(&mut self, kind: CallKind) -> &mut u64 {
        match kind {
            CallKind::SetPipeline => &mut self.set_pipeline,
            CallKind::SetVertexBuffer => &mut self.set_vertex_buffer,
            CallKind::SetIndexBuffer => &mut self.set_index_buffer,
            CallKind::SetBindGroup => &mut self.set_bind_group,
            CallKind::SetViewport => &mut self.set_viewport,
            CallKind::SetScissorRect => &mut self.set_scissor_rect,
            CallKind::SetBlendConstant => &mut self.set_blend_constant,
            CallKind::SetStencilReference => &mut self.set_stencil_reference,
        }
    }

    pub fn total(&self) -> u64 {
        CallKind::ALL.iter().map(|&kind| self.get(kind)).sum()
    }

    /// Vertex buffer, index buffer and bind group elisions, the calls that
    /// carry resource bindings.
    pub fn resource_total(&self) -> u64 {
        self.set_vertex_buffer + self.set_index_buffer + self.set_bind_group
    }

    pub fn accumulate(&mut self, other: &RedundantCalls) {
        for kind in CallKind::ALL {
            *self.slot_mut(kind) += other.get(kind);
        }
    }
}

/// Process-wide elision counters, cheap to bump from the recording thread.
#[derive(Debug, Default)]
pub struct RedundantCallCounters {
    counts: [AtomicU64; 8],
}

impl RedundantCallCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(kind: CallKind) -> usize {
        match kind {
            CallKind::SetPipeline => 0,
            CallKind::SetVertexBuffer => 1,
            CallKind::SetIndexBuffer => 2,
            CallKind::SetBindGroup => 3,
            CallKind::SetViewport => 4,
            CallKind::SetScissorRect => 5,
            CallKind::SetBlendConstant => 6,
            CallKind::SetStencilReference => 7,
        }
    }

    pub fn increment(&self, kind: CallKind) {
        self.counts[Self::index(kind)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RedundantCalls {
        let mut calls = RedundantCalls::default();
        for kind in CallKind::ALL {
            *calls.slot_mut(kind) = self.counts[Self::index(kind)].load(Ordering::Relaxed);
        }
        calls
    }

    /// Returns the current counts and zeroes them. Each counter is swapped
    /// atomically, so an increment racing the reset lands in exactly one
    /// snapshot.
    pub fn get_and_reset(&self) -> RedundantCalls {
        let mut calls = RedundantCalls::default();
        for kind in CallKind::ALL {
            *calls.slot_mut(kind) = self.counts[Self::index(kind)].swap(0, Ordering::Relaxed);
        }
        calls
    }
}
