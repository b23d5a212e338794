use std::sync::Arc;

use statecache::{
    BlendConstant, IndexFormat, PassEncoder, PassKind, RenderEncoder, ScissorRect, StateTracker,
    TrackedPass, Viewport,
};

/// `wgpu::RenderPass` behind the encoder traits.
pub struct WgpuRenderPass<'e>(pub wgpu::RenderPass<'e>);

/// `wgpu::ComputePass` behind the encoder traits.
pub struct WgpuComputePass<'e>(pub wgpu::ComputePass<'e>);

pub fn begin_render_pass<'e>(
    tracker: &Arc<StateTracker>,
    encoder: &'e mut wgpu::CommandEncoder,
    desc: &wgpu::RenderPassDescriptor<'_>,
) -> TrackedPass<WgpuRenderPass<'e>> {
    tracker.begin_pass(WgpuRenderPass(encoder.begin_render_pass(desc)))
}

pub fn begin_compute_pass<'e>(
    tracker: &Arc<StateTracker>,
    encoder: &'e mut wgpu::CommandEncoder,
    desc: &wgpu::ComputePassDescriptor<'_>,
) -> TrackedPass<WgpuComputePass<'e>> {
    tracker.begin_pass(WgpuComputePass(encoder.begin_compute_pass(desc)))
}

fn buffer_slice(buffer: &wgpu::Buffer, offset: Option<u64>, size: Option<u64>) -> wgpu::BufferSlice<'_> {
    let offset = offset.unwrap_or(0);
    match size {
        Some(size) => buffer.slice(offset..offset.saturating_add(size)),
        None => buffer.slice(offset..),
    }
}

fn index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
        IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
    }
}

fn color(constant: BlendConstant) -> wgpu::Color {
    let [r, g, b, a] = constant.components();
    wgpu::Color { r, g, b, a }
}

impl PassEncoder for WgpuRenderPass<'_> {
    type Pipeline = wgpu::RenderPipeline;
    type BindGroup = wgpu::BindGroup;

    const KIND: PassKind = PassKind::Render;

    fn set_pipeline(&mut self, pipeline: &wgpu::RenderPipeline) {
        self.0.set_pipeline(pipeline);
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &wgpu::BindGroup, offsets: Option<&[u32]>) {
        self.0.set_bind_group(index, bind_group, offsets.unwrap_or_default());
    }

    fn end(self) {
        drop(self.0);
    }
}

impl RenderEncoder for WgpuRenderPass<'_> {
    type Buffer = wgpu::Buffer;
    type Bundle = wgpu::RenderBundle;

    fn buffer_size(buffer: &wgpu::Buffer) -> u64 {
        buffer.size()
    }

    fn set_vertex_buffer(
        &mut self,
        slot: u32,
        buffer: &wgpu::Buffer,
        offset: Option<u64>,
        size: Option<u64>,
    ) {
        self.0
            .set_vertex_buffer(slot, buffer_slice(buffer, offset, size));
    }

    fn set_index_buffer(
        &mut self,
        buffer: &wgpu::Buffer,
        format: IndexFormat,
        offset: Option<u64>,
        size: Option<u64>,
    ) {
        self.0
            .set_index_buffer(buffer_slice(buffer, offset, size), index_format(format));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.0.set_viewport(
            viewport.x,
            viewport.y,
            viewport.width,
            viewport.height,
            viewport.min_depth,
            viewport.max_depth,
        );
    }

    fn set_scissor_rect(&mut self, rect: ScissorRect) {
        self.0
            .set_scissor_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn set_blend_constant(&mut self, constant: BlendConstant) {
        self.0.set_blend_constant(color(constant));
    }

    fn set_stencil_reference(&mut self, reference: u32) {
        self.0.set_stencil_reference(reference);
    }

    fn execute_bundles(&mut self, bundles: &[&wgpu::RenderBundle]) {
        self.0.execute_bundles(bundles.iter().copied());
    }
}

impl PassEncoder for WgpuComputePass<'_> {
    type Pipeline = wgpu::ComputePipeline;
    type BindGroup = wgpu::BindGroup;

    const KIND: PassKind = PassKind::Compute;

    fn set_pipeline(&mut self, pipeline: &wgpu::ComputePipeline) {
        self.0.set_pipeline(pipeline);
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &wgpu::BindGroup, offsets: Option<&[u32]>) {
        self.0.set_bind_group(index, bind_group, offsets.unwrap_or_default());
    }

    fn end(self) {
        drop(self.0);
    }
}
