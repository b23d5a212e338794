//! Equality rules deciding whether a state-setting request would leave the
//! bound state unchanged.
//!
//! Every rule compares a normalized request against what the pass record last
//! committed. A rule never answers "equal" for a slot that was never set.

use crate::encoder::{BlendConstant, DynamicOffsets, IndexFormat, ScissorRect, Viewport};
use crate::error::StateError;
use crate::handle::HandleRef;
use crate::record::{BoundBindGroup, BoundBuffer, BoundIndexBuffer};

pub(crate) fn same_pipeline<P: ?Sized>(bound: Option<&HandleRef>, pipeline: &P) -> bool {
    bound.is_some_and(|handle| handle.is(pipeline))
}

/// Count of dynamic offsets to compare for a bind group at `slot`.
///
/// A bind group without a known count may only be bound with an empty (or
/// absent) offsets container.
pub(crate) fn declared_offsets(
    slot: u32,
    declared: Option<u32>,
    offsets: &DynamicOffsets<'_>,
) -> Result<u32, StateError> {
    match declared {
        Some(count) => Ok(count),
        None if offsets.is_empty() => Ok(0),
        None => Err(StateError::UnknownDynamicOffsetCount { slot }),
    }
}

pub(crate) fn same_bind_group<G: ?Sized>(
    bound: Option<&BoundBindGroup>,
    slot: u32,
    group: &G,
    offsets: Option<&DynamicOffsets<'_>>,
    declared: Option<u32>,
) -> Result<bool, StateError> {
    let Some(bound) = bound else {
        return Ok(false);
    };
    if !bound.handle.is(group) {
        return Ok(false);
    }
    match (bound.offsets.as_ref(), offsets) {
        (None, None) => Ok(true),
        (None, Some(_)) | (Some(_), None) => Ok(false),
        (Some(recorded), Some(requested)) => {
            // Sub-range arguments are compared raw, but only between two
            // packed-form calls; switching forms compares by value alone.
            if let (Some(before), Some(now)) = (recorded.sub_range, requested.sub_range()) {
                if before != now {
                    return Ok(false);
                }
            }
            let declared = declared_offsets(slot, declared, requested)?;
            let window = requested.window(declared)?;
            Ok(window.matches(&recorded.values))
        }
    }
}

/// Resolves omitted `offset`/`size` arguments of a buffer binding.
pub(crate) fn resolve_range(
    buffer_size: u64,
    offset: Option<u64>,
    size: Option<u64>,
) -> Result<(u64, u64), StateError> {
    let offset = offset.unwrap_or(0);
    let size = match size {
        Some(size) => size,
        None => buffer_size
            .checked_sub(offset)
            .ok_or(StateError::OffsetBeyondBuffer {
                offset,
                size: buffer_size,
            })?,
    };
    Ok((offset, size))
}

pub(crate) fn same_vertex_buffer<B: ?Sized>(
    bound: Option<&BoundBuffer>,
    buffer: &B,
    offset: u64,
    size: u64,
) -> bool {
    bound.is_some_and(|bound| bound.handle.is(buffer) && bound.offset == offset && bound.size == size)
}

pub(crate) fn same_index_buffer<B: ?Sized>(
    bound: Option<&BoundIndexBuffer>,
    buffer: &B,
    format: IndexFormat,
    offset: u64,
    size: u64,
) -> bool {
    bound.is_some_and(|bound| {
        bound.format == format && same_vertex_buffer(Some(&bound.buffer), buffer, offset, size)
    })
}

pub(crate) fn same_viewport(bound: Option<Viewport>, viewport: Viewport) -> bool {
    bound.is_some_and(|bound| bound.to_bits() == viewport.to_bits())
}

pub(crate) fn same_scissor(bound: Option<ScissorRect>, rect: ScissorRect) -> bool {
    bound == Some(rect)
}

pub(crate) fn same_blend_constant(bound: [f64; 4], color: &BlendConstant) -> bool {
    bound
        .iter()
        .zip(color.components())
        .all(|(a, b)| a.to_bits() == b.to_bits())
}

pub(crate) fn same_stencil_reference(bound: u32, reference: u32) -> bool {
    bound == reference
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::encoder::{Color, SubRange};
    use crate::record::BoundOffsets;

    fn packed(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    fn bound_group(
        group: &Arc<&'static str>,
        values: Option<Vec<u32>>,
        sub_range: Option<SubRange>,
    ) -> BoundBindGroup {
        BoundBindGroup {
            handle: HandleRef::new(group),
            offsets: values.map(|values| BoundOffsets { values, sub_range }),
        }
    }

    #[test]
    fn pipeline_never_matches_unset_slot() {
        let pipeline = Arc::new(1u32);
        assert!(!same_pipeline(None, &*pipeline));
        let bound = HandleRef::new(&pipeline);
        assert!(same_pipeline(Some(&bound), &*pipeline));
        assert!(!same_pipeline(Some(&bound), &*Arc::new(1u32)));
    }

    #[test]
    fn bind_group_without_offsets_matches_identity_only() {
        let group = Arc::new("bg0");
        let other = Arc::new("bg0");
        let bound = bound_group(&group, None, None);
        assert!(same_bind_group(Some(&bound), 0, &*group, None, None).unwrap());
        assert!(!same_bind_group(Some(&bound), 0, &*other, None, None).unwrap());
    }

    #[test]
    fn offsets_presence_must_agree() {
        let group = Arc::new("bg");
        let without = bound_group(&group, None, None);
        let with = bound_group(&group, Some(vec![0, 0]), None);
        let offsets = DynamicOffsets::List(&[0, 0]);
        assert!(!same_bind_group(Some(&without), 0, &*group, Some(&offsets), Some(2)).unwrap());
        assert!(!same_bind_group(Some(&with), 0, &*group, None, Some(2)).unwrap());
    }

    #[test]
    fn offsets_compare_by_value() {
        let group = Arc::new("bg");
        let bound = bound_group(&group, Some(vec![0, 0]), None);
        let same = DynamicOffsets::List(&[0, 0]);
        let moved = DynamicOffsets::List(&[256, 0]);
        assert!(same_bind_group(Some(&bound), 0, &*group, Some(&same), Some(2)).unwrap());
        assert!(!same_bind_group(Some(&bound), 0, &*group, Some(&moved), Some(2)).unwrap());
    }

    #[test]
    fn packed_form_matches_list_form() {
        let group = Arc::new("bg");
        let bound = bound_group(&group, Some(vec![512, 1024]), None);
        let data = packed(&[7, 7, 512, 1024]);
        let offsets = DynamicOffsets::Packed {
            data: &data,
            start: 2,
            length: Some(2),
        };
        assert!(same_bind_group(Some(&bound), 0, &*group, Some(&offsets), Some(2)).unwrap());
    }

    #[test]
    fn packed_sub_ranges_compare_raw() {
        let group = Arc::new("bg");
        let bound = bound_group(
            &group,
            Some(vec![4]),
            Some(SubRange {
                start: 0,
                length: Some(1),
            }),
        );
        let data = packed(&[4, 4]);
        let shifted = DynamicOffsets::Packed {
            data: &data,
            start: 1,
            length: Some(1),
        };
        assert!(!same_bind_group(Some(&bound), 0, &*group, Some(&shifted), Some(1)).unwrap());
    }

    #[test]
    fn explicit_length_clamps_to_declared_count() {
        let group = Arc::new("bg");
        let bound = bound_group(&group, Some(vec![8]), None);
        let data = packed(&[8, 99]);
        let offsets = DynamicOffsets::Packed {
            data: &data,
            start: 0,
            length: Some(2),
        };
        assert!(same_bind_group(Some(&bound), 0, &*group, Some(&offsets), Some(1)).unwrap());
    }

    #[test]
    fn unknown_count_with_offsets_is_an_invariant_violation() {
        let group = Arc::new("bg");
        let bound = bound_group(&group, Some(vec![0]), None);
        let offsets = DynamicOffsets::List(&[0]);
        let err = same_bind_group(Some(&bound), 3, &*group, Some(&offsets), None).unwrap_err();
        assert_eq!(err, StateError::UnknownDynamicOffsetCount { slot: 3 });
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn unknown_count_with_empty_offsets_is_allowed() {
        let group = Arc::new("bg");
        let bound = bound_group(&group, Some(Vec::new()), None);
        let offsets = DynamicOffsets::List(&[]);
        assert!(same_bind_group(Some(&bound), 0, &*group, Some(&offsets), None).unwrap());
    }

    #[test]
    fn short_offsets_fail_instead_of_partially_comparing() {
        let group = Arc::new("bg");
        let bound = bound_group(&group, Some(vec![0, 0]), None);
        let offsets = DynamicOffsets::List(&[0]);
        let err = same_bind_group(Some(&bound), 0, &*group, Some(&offsets), Some(2)).unwrap_err();
        assert!(matches!(err, StateError::OffsetsOutOfRange { needed: 2, .. }));
    }

    #[test]
    fn packed_length_beyond_data_fails_before_comparing() {
        let group = Arc::new("bg");
        let bound = bound_group(&group, Some(vec![1, 2]), None);
        let data = packed(&[1, 2]);
        let offsets = DynamicOffsets::Packed {
            data: &data,
            start: 0,
            length: Some(3),
        };
        let err = same_bind_group(Some(&bound), 0, &*group, Some(&offsets), Some(2)).unwrap_err();
        assert_eq!(
            err,
            StateError::OffsetsOutOfRange {
                start: 0,
                needed: 3,
                available: 2
            }
        );
    }

    #[test]
    fn omitted_range_resolves_to_rest_of_buffer() {
        assert_eq!(resolve_range(128, None, None).unwrap(), (0, 128));
        assert_eq!(resolve_range(128, Some(32), None).unwrap(), (32, 96));
        assert_eq!(resolve_range(128, Some(32), Some(16)).unwrap(), (32, 16));
        assert_eq!(
            resolve_range(128, Some(256), None).unwrap_err(),
            StateError::OffsetBeyondBuffer {
                offset: 256,
                size: 128
            }
        );
    }

    #[test]
    fn index_buffer_format_participates() {
        let buffer = Arc::new(128u64);
        let bound = BoundIndexBuffer {
            buffer: BoundBuffer {
                handle: HandleRef::new(&buffer),
                offset: 0,
                size: 128,
            },
            format: IndexFormat::Uint16,
        };
        assert!(same_index_buffer(Some(&bound), &*buffer, IndexFormat::Uint16, 0, 128));
        assert!(!same_index_buffer(Some(&bound), &*buffer, IndexFormat::Uint32, 0, 128));
    }

    #[test]
    fn viewport_is_bit_exact() {
        let bound = Viewport::new(1.0, 1.0, 0.0, 0.0, 0.5, 1.0);
        assert!(same_viewport(Some(bound), bound));
        assert!(!same_viewport(
            Some(bound),
            Viewport::new(1.0, 1.0, 0.0, 0.0, 0.6, 1.0)
        ));
        assert!(!same_viewport(
            Some(Viewport::new(0.0, 0.0, 1.0, 1.0, 0.0, 1.0)),
            Viewport::new(-0.0, 0.0, 1.0, 1.0, 0.0, 1.0)
        ));
        assert!(!same_viewport(None, bound));
    }

    #[test]
    fn blend_constant_ignores_argument_shape() {
        let bound = [1.0, 1.0, 0.0, 1.0];
        assert!(same_blend_constant(bound, &BlendConstant::from([1.0, 1.0, 0.0, 1.0])));
        assert!(same_blend_constant(
            bound,
            &BlendConstant::from(Color {
                r: 1.0,
                g: 1.0,
                b: 0.0,
                a: 1.0
            })
        ));
        assert!(!same_blend_constant(bound, &BlendConstant::from([1.0, 0.0, 1.0, 1.0])));
    }
}
