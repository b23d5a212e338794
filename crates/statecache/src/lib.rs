//! Redundant state-setting elision for GPU pass recording.
//!
//! A [`StateTracker`] wraps pass encoders in [`TrackedPass`]es. Each tracked
//! pass keeps a record of the pipeline, bindings and fixed-function state it
//! has set so far; calls that would set a value already in effect are
//! counted and dropped instead of reaching the encoder.

mod config;
mod counters;
mod encoder;
mod equality;
mod error;
mod handle;
mod layouts;
mod null;
mod pass;
mod pool;
mod record;
mod registry;
mod report;
mod tracker;

pub use config::{ConfigError, PoolConfig, ReportConfig, TrackerConfig};
pub use counters::{CallKind, RedundantCallCounters, RedundantCalls};
pub use encoder::{
    BlendConstant, Color, DynamicOffsets, IndexFormat, PassEncoder, PassKind, RenderEncoder,
    ScissorRect, SubRange, Viewport,
};
pub use error::StateError;
pub use null::{
    CallLog, Compute, NullResource, RecordedCall, RecordingComputeEncoder, RecordingEncoder,
    RecordingKind, RecordingRenderEncoder, Render,
};
pub use pass::TrackedPass;
pub use pool::PoolStats;
pub use record::MAX_SLOTS;
pub use registry::PassId;
pub use report::{FrameReport, FrameReporter};
pub use tracker::StateTracker;
