//! Capability interface of the underlying pass encoder.
//!
//! The tracker never talks to a graphics API directly. A backend supplies an
//! implementation of [`PassEncoder`] (and [`RenderEncoder`] for render
//! passes) and [`crate::TrackedPass`] forwards every non-redundant call to it.
//! Dynamic offsets arrive as the decoded words the caller designated.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassKind {
    Render,
    Compute,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::Render => f.write_str("render"),
            PassKind::Compute => f.write_str("compute"),
        }
    }
}

/// State-setting entry points shared by render and compute passes.
pub trait PassEncoder {
    type Pipeline: Send + Sync + 'static;
    type BindGroup: Send + Sync + 'static;

    const KIND: PassKind;

    fn set_pipeline(&mut self, pipeline: &Self::Pipeline);

    fn set_bind_group(&mut self, index: u32, bind_group: &Self::BindGroup, offsets: Option<&[u32]>);

    fn end(self)
    where
        Self: Sized;
}

/// Entry points only render passes expose.
pub trait RenderEncoder: PassEncoder {
    type Buffer: Send + Sync + 'static;
    type Bundle;

    /// Byte length of `buffer`, used to resolve an omitted `size` argument.
    fn buffer_size(buffer: &Self::Buffer) -> u64;

    fn set_vertex_buffer(
        &mut self,
        slot: u32,
        buffer: &Self::Buffer,
        offset: Option<u64>,
        size: Option<u64>,
    );

    fn set_index_buffer(
        &mut self,
        buffer: &Self::Buffer,
        format: IndexFormat,
        offset: Option<u64>,
        size: Option<u64>,
    );

    fn set_viewport(&mut self, viewport: Viewport);

    fn set_scissor_rect(&mut self, rect: ScissorRect);

    fn set_blend_constant(&mut self, color: BlendConstant);

    fn set_stencil_reference(&mut self, reference: u32);

    fn execute_bundles(&mut self, bundles: &[&Self::Bundle]);
}

/// Dynamic offsets as supplied to `set_bind_group`.
///
/// `Packed` is a view over native-endian `u32` words stored as bytes, with the
/// element index the offsets start at and an optional element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicOffsets<'a> {
    List(&'a [u32]),
    Packed {
        data: &'a [u8],
        start: usize,
        length: Option<usize>,
    },
}

/// `(start, length)` arguments of the packed offsets form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRange {
    pub start: usize,
    pub length: Option<usize>,
}

/// Offsets selected for comparison once the declared count is known.
#[derive(Debug, Clone, Copy)]
pub(crate) enum OffsetWindow<'a> {
    Words(&'a [u32]),
    Bytes(&'a [u8]),
}

impl<'a> DynamicOffsets<'a> {
    /// True when the container holds no values at all.
    pub fn is_empty(&self) -> bool {
        match self {
            DynamicOffsets::List(values) => values.is_empty(),
            DynamicOffsets::Packed { data, .. } => data.is_empty(),
        }
    }

    pub fn sub_range(&self) -> Option<SubRange> {
        match *self {
            DynamicOffsets::List(_) => None,
            DynamicOffsets::Packed { start, length, .. } => Some(SubRange { start, length }),
        }
    }

    /// Number of offsets that take part in equality for a layout declaring
    /// `declared` dynamic offsets.
    pub fn effective_len(&self, declared: u32) -> usize {
        let declared = declared as usize;
        match self {
            DynamicOffsets::List(_) => declared,
            DynamicOffsets::Packed { length, .. } => length.map_or(declared, |len| len.min(declared)),
        }
    }

    pub(crate) fn window(&self, declared: u32) -> Result<OffsetWindow<'a>, StateError> {
        let needed = self.effective_len(declared);
        match *self {
            DynamicOffsets::List(values) => {
                if values.len() < needed {
                    return Err(StateError::OffsetsOutOfRange {
                        start: 0,
                        needed,
                        available: values.len(),
                    });
                }
                Ok(OffsetWindow::Words(&values[..needed]))
            }
            DynamicOffsets::Packed {
                data,
                start,
                length,
            } => {
                let words = packed_words(data)?;
                // The caller's own sub-range must fit even past the declared count.
                if let Some(length) = length {
                    if start.checked_add(length).map_or(true, |end| end > words) {
                        return Err(StateError::OffsetsOutOfRange {
                            start,
                            needed: length,
                            available: words,
                        });
                    }
                }
                if start.checked_add(needed).map_or(true, |end| end > words) {
                    return Err(StateError::OffsetsOutOfRange {
                        start,
                        needed,
                        available: words,
                    });
                }
                Ok(OffsetWindow::Bytes(&data[start * 4..(start + needed) * 4]))
            }
        }
    }

    /// The values the caller designated, independent of any layout.
    ///
    /// The list form is returned as-is; the packed form is decoded from
    /// `start` to `start + length` (or to the end of the view).
    pub fn words(&self) -> Result<Cow<'a, [u32]>, StateError> {
        match *self {
            DynamicOffsets::List(values) => Ok(Cow::Borrowed(values)),
            DynamicOffsets::Packed {
                data,
                start,
                length,
            } => {
                let words = packed_words(data)?;
                let end = match length {
                    Some(len) => start.checked_add(len),
                    None => Some(words),
                };
                match end {
                    Some(end) if start <= end && end <= words => Ok(Cow::Owned(
                        data[start * 4..end * 4]
                            .chunks_exact(4)
                            .map(bytemuck::pod_read_unaligned::<u32>)
                            .collect(),
                    )),
                    _ => Err(StateError::OffsetsOutOfRange {
                        start,
                        needed: length.unwrap_or(0),
                        available: words,
                    }),
                }
            }
        }
    }
}

fn packed_words(data: &[u8]) -> Result<usize, StateError> {
    if data.len() % 4 != 0 {
        return Err(StateError::MisalignedOffsets(data.len()));
    }
    Ok(data.len() / 4)
}

impl<'a> OffsetWindow<'a> {
    pub(crate) fn len(&self) -> usize {
        match self {
            OffsetWindow::Words(values) => values.len(),
            OffsetWindow::Bytes(bytes) => bytes.len() / 4,
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = u32> + 'a {
        let (words, bytes): (&'a [u32], &'a [u8]) = match *self {
            OffsetWindow::Words(values) => (values, &[]),
            OffsetWindow::Bytes(bytes) => (&[], bytes),
        };
        words.iter().copied().chain(
            bytes
                .chunks_exact(4)
                .map(bytemuck::pod_read_unaligned::<u32>),
        )
    }

    pub(crate) fn matches(&self, recorded: &[u32]) -> bool {
        self.len() == recorded.len() && self.iter().zip(recorded).all(|(a, &b)| a == b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth,
            max_depth,
        }
    }

    pub(crate) fn to_bits(self) -> [u32; 6] {
        [
            self.x.to_bits(),
            self.y.to_bits(),
            self.width.to_bits(),
            self.height.to_bits(),
            self.min_depth.to_bits(),
            self.max_depth.to_bits(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

/// Blend constant in either of the two argument shapes hosts accept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlendConstant {
    Components([f64; 4]),
    Color(Color),
}

impl BlendConstant {
    pub fn components(&self) -> [f64; 4] {
        match *self {
            BlendConstant::Components(components) => components,
            BlendConstant::Color(Color { r, g, b, a }) => [r, g, b, a],
        }
    }
}

impl From<[f64; 4]> for BlendConstant {
    fn from(components: [f64; 4]) -> Self {
        BlendConstant::Components(components)
    }
}

impl From<Color> for BlendConstant {
    fn from(color: Color) -> Self {
        BlendConstant::Color(color)
    }
}
