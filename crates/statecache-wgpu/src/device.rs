use std::sync::Arc;

use statecache::StateTracker;

/// Number of buffer bindings in a layout that take a dynamic offset.
pub fn dynamic_offset_count(entries: &[wgpu::BindGroupLayoutEntry]) -> u32 {
    entries
        .iter()
        .filter(|entry| {
            matches!(
                entry.ty,
                wgpu::BindingType::Buffer {
                    has_dynamic_offset: true,
                    ..
                }
            )
        })
        .count() as u32
}

/// Device wrapper that records each created layout's dynamic offset count
/// and hands created objects out as `Arc`s so tracked passes can compare
/// them by identity.
#[derive(Debug, Clone)]
pub struct TrackedDevice {
    device: wgpu::Device,
    tracker: Arc<StateTracker>,
}

impl TrackedDevice {
    pub fn new(device: wgpu::Device, tracker: Arc<StateTracker>) -> Self {
        Self { device, tracker }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn tracker(&self) -> &Arc<StateTracker> {
        &self.tracker
    }

    pub fn create_bind_group_layout(
        &self,
        desc: &wgpu::BindGroupLayoutDescriptor<'_>,
    ) -> Arc<wgpu::BindGroupLayout> {
        let count = dynamic_offset_count(desc.entries);
        let layout = self.device.create_bind_group_layout(desc);
        tracing::debug!(label = ?desc.label, dynamic_offsets = count, "created bind group layout");
        self.tracker.register_bind_group_layout(layout, count)
    }

    /// Bind groups whose layout did not come from
    /// [`TrackedDevice::create_bind_group_layout`] can only be bound without
    /// dynamic offsets.
    pub fn create_bind_group(
        &self,
        label: Option<&str>,
        layout: &Arc<wgpu::BindGroupLayout>,
        entries: &[wgpu::BindGroupEntry<'_>],
    ) -> Arc<wgpu::BindGroup> {
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label,
            layout: &**layout,
            entries,
        });
        self.tracker.register_bind_group(group, layout)
    }
}
