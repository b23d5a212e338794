use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use statecache::{
    CallLog, DynamicOffsets, NullResource, PassEncoder, PassKind, PoolStats,
    RecordingComputeEncoder, RecordingRenderEncoder, RedundantCalls, StateTracker, TrackedPass,
    TrackerConfig,
};
use tracing::debug;

use crate::trace::{Command, Pass, Resources, Trace};

/// Named resources of a trace, registered with the tracker.
#[derive(Debug, Default)]
struct ResourceTable {
    buffers: HashMap<String, Arc<NullResource>>,
    layouts: HashMap<String, Arc<NullResource>>,
    bind_groups: HashMap<String, Arc<NullResource>>,
    pipelines: HashMap<String, Arc<NullResource>>,
    bundles: HashMap<String, NullResource>,
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, what: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {what} '{name}'"))
}

impl ResourceTable {
    fn build(tracker: &StateTracker, resources: &Resources) -> Result<Self> {
        let mut table = ResourceTable::default();
        for buffer in &resources.buffers {
            table.buffers.insert(
                buffer.name.clone(),
                Arc::new(NullResource::buffer(&buffer.name, buffer.size)),
            );
        }
        for layout in &resources.layouts {
            let handle = tracker
                .register_bind_group_layout(NullResource::new(&layout.name), layout.dynamic_offsets);
            table.layouts.insert(layout.name.clone(), handle);
        }
        for group in &resources.bind_groups {
            let handle = match &group.layout {
                Some(layout) => {
                    let layout = lookup(&table.layouts, "layout", layout)
                        .with_context(|| format!("bind group '{}'", group.name))?;
                    tracker.register_bind_group(NullResource::new(&group.name), layout)
                }
                None => {
                    let implicit =
                        Arc::new(NullResource::new(format!("{} (implicit layout)", group.name)));
                    tracker.register_bind_group(NullResource::new(&group.name), &implicit)
                }
            };
            table.bind_groups.insert(group.name.clone(), handle);
        }
        for name in &resources.pipelines {
            table
                .pipelines
                .insert(name.clone(), Arc::new(NullResource::new(name)));
        }
        for name in &resources.bundles {
            table.bundles.insert(name.clone(), NullResource::new(name));
        }
        Ok(table)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSummary {
    pub frame: usize,
    pub passes: usize,
    /// State-setting calls that reached the encoder.
    pub forwarded: usize,
    pub redundant: RedundantCalls,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    pub elide: bool,
    pub frames: Vec<FrameSummary>,
    pub forwarded: usize,
    pub redundant: RedundantCalls,
    pub pool: PoolStats,
}

pub fn replay(trace: &Trace, config: TrackerConfig) -> Result<ReplaySummary> {
    let elide = config.elide;
    let tracker = Arc::new(StateTracker::new(config));
    let table = ResourceTable::build(&tracker, &trace.resources)?;

    let mut frames = Vec::with_capacity(trace.frames.len());
    let mut redundant = RedundantCalls::default();
    let mut forwarded = 0;
    for (index, frame) in trace.frames.iter().enumerate() {
        let mut frame_forwarded = 0;
        for (pass_index, pass) in frame.passes.iter().enumerate() {
            frame_forwarded += replay_pass(&tracker, &table, pass)
                .with_context(|| format!("frame {index}, pass {pass_index}"))?;
        }
        let calls = tracker.get_and_reset_redundant_call_info();
        debug!(frame = index, forwarded = frame_forwarded, elided = calls.total(), "replayed frame");
        redundant.accumulate(&calls);
        forwarded += frame_forwarded;
        frames.push(FrameSummary {
            frame: index,
            passes: frame.passes.len(),
            forwarded: frame_forwarded,
            redundant: calls,
        });
    }

    Ok(ReplaySummary {
        elide,
        frames,
        forwarded,
        redundant,
        pool: tracker.pool_stats(),
    })
}

fn replay_pass(tracker: &Arc<StateTracker>, table: &ResourceTable, pass: &Pass) -> Result<usize> {
    let log = CallLog::new();
    match pass.kind {
        PassKind::Render => {
            let mut tracked = tracker.begin_pass(RecordingRenderEncoder::new(log.clone()));
            for (index, command) in pass.commands.iter().enumerate() {
                apply_render(&mut tracked, table, command)
                    .with_context(|| format!("command {index} ({})", command.op()))?;
            }
            finish(tracked, pass.end)?;
        }
        PassKind::Compute => {
            let mut tracked = tracker.begin_pass(RecordingComputeEncoder::new(log.clone()));
            for (index, command) in pass.commands.iter().enumerate() {
                let applied = apply_shared(&mut tracked, table, command)
                    .with_context(|| format!("command {index} ({})", command.op()))?;
                if !applied {
                    bail!("command {index} ({}) is not valid in a compute pass", command.op());
                }
            }
            finish(tracked, pass.end)?;
        }
    }
    Ok(log.calls().iter().filter(|call| call.kind().is_some()).count())
}

fn finish<E: PassEncoder>(pass: TrackedPass<E>, end: bool) -> Result<()> {
    if end {
        pass.end()?;
    } else {
        debug!(pass = %pass.id(), "abandoning pass without end");
    }
    Ok(())
}

/// Commands valid in both pass kinds. Returns `false` for render-only ones.
fn apply_shared<E>(pass: &mut TrackedPass<E>, table: &ResourceTable, command: &Command) -> Result<bool>
where
    E: PassEncoder<Pipeline = NullResource, BindGroup = NullResource>,
{
    match command {
        Command::SetPipeline { pipeline } => {
            pass.set_pipeline(lookup(&table.pipelines, "pipeline", pipeline)?)?;
        }
        Command::SetBindGroup {
            index,
            bind_group,
            offsets,
            start,
            length,
        } => {
            let group = lookup(&table.bind_groups, "bind group", bind_group)?;
            let packed: Option<Vec<u8>> = match offsets {
                Some(values) if start.is_some() || length.is_some() => {
                    Some(values.iter().flat_map(|value| value.to_ne_bytes()).collect())
                }
                _ => None,
            };
            let offsets = match (&packed, offsets) {
                (Some(data), _) => Some(DynamicOffsets::Packed {
                    data,
                    start: start.unwrap_or(0),
                    length: *length,
                }),
                (None, Some(values)) => Some(DynamicOffsets::List(values)),
                (None, None) => None,
            };
            pass.set_bind_group(*index, group, offsets)?;
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn apply_render(
    pass: &mut TrackedPass<RecordingRenderEncoder>,
    table: &ResourceTable,
    command: &Command,
) -> Result<()> {
    if apply_shared(pass, table, command)? {
        return Ok(());
    }
    match command {
        Command::SetVertexBuffer {
            slot,
            buffer,
            offset,
            size,
        } => {
            let buffer = lookup(&table.buffers, "buffer", buffer)?;
            pass.set_vertex_buffer(*slot, buffer, *offset, *size)?;
        }
        Command::SetIndexBuffer {
            buffer,
            format,
            offset,
            size,
        } => {
            let buffer = lookup(&table.buffers, "buffer", buffer)?;
            pass.set_index_buffer(buffer, *format, *offset, *size)?;
        }
        Command::SetViewport(viewport) => pass.set_viewport(*viewport)?,
        Command::SetScissorRect(rect) => pass.set_scissor_rect(*rect)?,
        Command::SetBlendConstant { color } => pass.set_blend_constant(*color)?,
        Command::SetStencilReference { reference } => pass.set_stencil_reference(*reference)?,
        Command::ExecuteBundles { bundles } => {
            let bundles = bundles
                .iter()
                .map(|name| lookup(&table.bundles, "bundle", name))
                .collect::<Result<Vec<_>>>()?;
            pass.execute_bundles(&bundles)?;
        }
        Command::SetPipeline { .. } | Command::SetBindGroup { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(json: &str) -> Trace {
        Trace::from_json_str(json).unwrap()
    }

    const TWO_FRAMES: &str = r#"{
        "resources": {
            "buffers": [{ "name": "vb", "size": 64 }, { "name": "ib", "size": 32 }],
            "layouts": [{ "name": "dyn", "dynamic_offsets": 1 }],
            "bind_groups": [{ "name": "g", "layout": "dyn" }],
            "pipelines": ["p"],
            "bundles": ["b"]
        },
        "frames": [
            { "passes": [{ "kind": "render", "commands": [
                { "op": "set_pipeline", "pipeline": "p" },
                { "op": "set_pipeline", "pipeline": "p" },
                { "op": "set_vertex_buffer", "slot": 0, "buffer": "vb" },
                { "op": "set_vertex_buffer", "slot": 0, "buffer": "vb", "offset": 0, "size": 64 },
                { "op": "set_bind_group", "index": 0, "bind_group": "g", "offsets": [128] },
                { "op": "set_bind_group", "index": 0, "bind_group": "g", "offsets": [0, 128], "start": 1 },
                { "op": "set_stencil_reference", "reference": 2 },
                { "op": "execute_bundles", "bundles": ["b"] },
                { "op": "set_index_buffer", "buffer": "ib", "format": "uint16" },
                { "op": "set_stencil_reference", "reference": 2 }
            ]}]},
            { "passes": [{ "kind": "render", "commands": [
                { "op": "set_pipeline", "pipeline": "p" }
            ]}, { "kind": "compute", "commands": [
                { "op": "set_pipeline", "pipeline": "p" },
                { "op": "set_pipeline", "pipeline": "p" }
            ]}]}
        ]
    }"#;

    #[test]
    fn replays_frames_and_counts_per_frame() {
        let summary = replay(&trace(TWO_FRAMES), TrackerConfig::default()).unwrap();

        let first = &summary.frames[0];
        assert_eq!(first.redundant.set_pipeline, 1);
        assert_eq!(first.redundant.set_vertex_buffer, 1);
        assert_eq!(first.redundant.set_bind_group, 1);
        assert_eq!(first.redundant.set_stencil_reference, 1);
        assert_eq!(first.redundant.resource_total(), 2);
        assert_eq!(first.forwarded, 5);

        let second = &summary.frames[1];
        assert_eq!(second.passes, 2);
        assert_eq!(second.forwarded, 2);
        assert_eq!(second.redundant.set_pipeline, 1);

        assert_eq!(summary.forwarded, 7);
        assert_eq!(summary.redundant.total(), 5);
        assert!(summary.elide);
    }

    #[test]
    fn count_only_forwards_everything() {
        let summary = replay(&trace(TWO_FRAMES), TrackerConfig::count_only()).unwrap();
        assert_eq!(summary.forwarded, 12);
        assert_eq!(summary.redundant.total(), 5);
        assert!(!summary.elide);
    }

    #[test]
    fn render_commands_are_rejected_in_compute_passes() {
        let json = r#"{ "frames": [{ "passes": [{ "kind": "compute", "commands": [
            { "op": "set_stencil_reference", "reference": 1 }
        ]}]}]}"#;
        let err = replay(&trace(json), TrackerConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("not valid in a compute pass"));
    }

    #[test]
    fn unknown_resources_are_reported() {
        let json = r#"{ "frames": [{ "passes": [{ "kind": "render", "commands": [
            { "op": "set_pipeline", "pipeline": "missing" }
        ]}]}]}"#;
        let err = replay(&trace(json), TrackerConfig::default()).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("unknown pipeline 'missing'"), "{message}");
        assert!(message.contains("frame 0, pass 0"), "{message}");
    }

    #[test]
    fn offsets_on_implicit_layout_fail() {
        let json = r#"{
            "resources": { "bind_groups": [{ "name": "auto" }] },
            "frames": [{ "passes": [{ "kind": "render", "commands": [
                { "op": "set_bind_group", "index": 0, "bind_group": "auto", "offsets": [0] }
            ]}]}]
        }"#;
        let err = replay(&trace(json), TrackerConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("dynamic offset count is unknown"));
    }

    #[test]
    fn out_of_range_slot_is_an_error() {
        let json = r#"{
            "resources": { "buffers": [{ "name": "vb", "size": 16 }] },
            "frames": [{ "passes": [{ "kind": "render", "commands": [
                { "op": "set_vertex_buffer", "slot": 4294967295, "buffer": "vb" }
            ]}]}]
        }"#;
        let err = replay(&trace(json), TrackerConfig::default()).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("slot 4294967295 is out of range"), "{message}");
    }

    #[test]
    fn packed_length_past_offsets_is_an_error() {
        let json = r#"{
            "resources": {
                "layouts": [{ "name": "dyn", "dynamic_offsets": 2 }],
                "bind_groups": [{ "name": "g", "layout": "dyn" }]
            },
            "frames": [{ "passes": [{ "kind": "render", "commands": [
                { "op": "set_bind_group", "index": 0, "bind_group": "g", "offsets": [1, 2], "length": 3 }
            ]}]}]
        }"#;
        let err = replay(&trace(json), TrackerConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("dynamic offsets out of range"));
    }

    #[test]
    fn abandoned_passes_return_their_records() {
        let json = r#"{ "frames": [{ "passes": [
            { "kind": "render", "end": false },
            { "kind": "compute", "end": false }
        ]}]}"#;
        let summary = replay(&trace(json), TrackerConfig::default()).unwrap();
        assert_eq!(summary.pool.idle, 4);
        assert_eq!(summary.pool.allocated, 4);
    }
}
