//! [`statecache`] adapter for `wgpu` render and compute passes.
//!
//! ```ignore
//! let device = TrackedDevice::new(device, tracker.clone());
//! let layout = device.create_bind_group_layout(&layout_desc);
//! let group = device.create_bind_group(Some("per-draw"), &layout, &entries);
//!
//! let mut pass = begin_render_pass(&tracker, &mut encoder, &pass_desc);
//! pass.set_pipeline(&pipeline)?;
//! pass.set_bind_group(0, &group, None)?;
//! pass.end()?;
//! ```

mod device;
mod pass;

pub use device::{dynamic_offset_count, TrackedDevice};
pub use pass::{begin_compute_pass, begin_render_pass, WgpuComputePass, WgpuRenderPass};
