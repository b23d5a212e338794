//! JSON trace format: declared resources followed by frames of passes.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use statecache::{BlendConstant, IndexFormat, PassKind, ScissorRect, Viewport};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Trace {
    #[serde(default)]
    pub resources: Resources,
    pub frames: Vec<Frame>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Resources {
    pub buffers: Vec<BufferDecl>,
    pub layouts: Vec<LayoutDecl>,
    pub bind_groups: Vec<BindGroupDecl>,
    pub pipelines: Vec<String>,
    pub bundles: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferDecl {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutDecl {
    pub name: String,
    #[serde(default)]
    pub dynamic_offsets: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindGroupDecl {
    pub name: String,
    /// Omitted for bind groups created from a pipeline's implicit layout.
    #[serde(default)]
    pub layout: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Frame {
    pub passes: Vec<Pass>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pass {
    pub kind: PassKind,
    #[serde(default)]
    pub commands: Vec<Command>,
    /// `false` abandons the pass without ending it.
    #[serde(default = "default_end")]
    pub end: bool,
}

fn default_end() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    SetPipeline {
        pipeline: String,
    },
    /// `start`/`length` select the packed form of the offsets.
    SetBindGroup {
        index: u32,
        bind_group: String,
        offsets: Option<Vec<u32>>,
        start: Option<usize>,
        length: Option<usize>,
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
    SetBlendConstant {
        color: BlendConstant,
    },
    SetStencilReference {
        reference: u32,
    },
    ExecuteBundles {
        bundles: Vec<String>,
    },
}

impl Command {
    pub fn op(&self) -> &'static str {
        match self {
            Command::SetPipeline { .. } => "set_pipeline",
            Command::SetBindGroup { .. } => "set_bind_group",
            Command::SetVertexBuffer { .. } => "set_vertex_buffer",
            Command::SetIndexBuffer { .. } => "set_index_buffer",
            Command::SetViewport(_) => "set_viewport",
            Command::SetScissorRect(_) => "set_scissor_rect",
            Command::SetBlendConstant { .. } => "set_blend_constant",
            Command::SetStencilReference { .. } => "set_stencil_reference",
            Command::ExecuteBundles { .. } => "execute_bundles",
        }
    }
}

impl Trace {
    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("failed to parse trace")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read trace {}", path.display()))?;
        Self::from_json_str(&contents).with_context(|| format!("in {}", path.display()))
    }
}
