use std::sync::Arc;
use std::thread;

use statecache::{
    BlendConstant, CallKind, CallLog, Color, DynamicOffsets, IndexFormat, NullResource,
    RecordingComputeEncoder, RecordingRenderEncoder, RedundantCalls, ScissorRect, StateTracker,
    Viewport,
};

struct Scene {
    tracker: Arc<StateTracker>,
    pipeline: Arc<NullResource>,
    group: Arc<NullResource>,
    dynamic_group: Arc<NullResource>,
    vertices: Arc<NullResource>,
    indices: Arc<NullResource>,
}

impl Scene {
    fn new() -> Self {
        let tracker = Arc::new(StateTracker::default());
        let static_layout = tracker.register_bind_group_layout(NullResource::new("static"), 0);
        let dynamic_layout = tracker.register_bind_group_layout(NullResource::new("dynamic"), 2);
        let group = tracker.register_bind_group(NullResource::new("group"), &static_layout);
        let dynamic_group =
            tracker.register_bind_group(NullResource::new("dynamic group"), &dynamic_layout);
        Self {
            tracker,
            pipeline: Arc::new(NullResource::new("pipeline")),
            group,
            dynamic_group,
            vertices: Arc::new(NullResource::buffer("vertices", 1024)),
            indices: Arc::new(NullResource::buffer("indices", 512)),
        }
    }
}

#[test]
fn n_identical_pipelines_forward_once() {
    let scene = Scene::new();
    let log = CallLog::new();
    let mut pass = scene
        .tracker
        .begin_pass(RecordingRenderEncoder::new(log.clone()));
    for _ in 0..5 {
        pass.set_pipeline(&scene.pipeline).unwrap();
    }
    pass.end().unwrap();

    assert_eq!(log.forwarded(CallKind::SetPipeline), 1);
    assert_eq!(
        scene.tracker.get_and_reset_redundant_call_info().set_pipeline,
        4
    );
}

#[test]
fn bind_group_identity_and_offsets() {
    let scene = Scene::new();
    let implicit = Arc::new(NullResource::new("implicit"));
    let other = scene
        .tracker
        .register_bind_group(NullResource::new("other"), &implicit);
    let log = CallLog::new();
    let mut pass = scene
        .tracker
        .begin_pass(RecordingRenderEncoder::new(log.clone()));

    pass.set_bind_group(0, &scene.group, None).unwrap();
    pass.set_bind_group(0, &scene.group, None).unwrap();
    pass.set_bind_group(0, &other, None).unwrap();
    assert_eq!(log.forwarded(CallKind::SetBindGroup), 2);

    pass.set_bind_group(1, &scene.dynamic_group, Some(DynamicOffsets::List(&[0, 0])))
        .unwrap();
    pass.set_bind_group(1, &scene.dynamic_group, Some(DynamicOffsets::List(&[0, 0])))
        .unwrap();
    pass.set_bind_group(1, &scene.dynamic_group, Some(DynamicOffsets::List(&[256, 0])))
        .unwrap();
    assert_eq!(log.forwarded(CallKind::SetBindGroup), 4);

    let words = [9u32, 256, 0, 9];
    pass.set_bind_group(
        1,
        &scene.dynamic_group,
        Some(DynamicOffsets::Packed {
            data: bytemuck::cast_slice(&words),
            start: 1,
            length: Some(2),
        }),
    )
    .unwrap();
    assert_eq!(log.forwarded(CallKind::SetBindGroup), 4);

    let calls = scene.tracker.get_and_reset_redundant_call_info();
    assert_eq!(calls.set_bind_group, 3);
}

#[test]
fn explicit_full_range_equals_default_range() {
    let scene = Scene::new();
    let log = CallLog::new();
    let mut pass = scene
        .tracker
        .begin_pass(RecordingRenderEncoder::new(log.clone()));

    pass.set_vertex_buffer(0, &scene.vertices, Some(0), Some(1024))
        .unwrap();
    pass.set_vertex_buffer(0, &scene.vertices, None, None).unwrap();
    pass.set_index_buffer(&scene.indices, IndexFormat::Uint32, None, None)
        .unwrap();
    pass.set_index_buffer(&scene.indices, IndexFormat::Uint32, Some(0), Some(512))
        .unwrap();

    assert_eq!(log.len(), 2);
}

#[test]
fn viewport_changes_by_single_component() {
    let scene = Scene::new();
    let log = CallLog::new();
    let mut pass = scene
        .tracker
        .begin_pass(RecordingRenderEncoder::new(log.clone()));

    let viewport = Viewport::new(0.0, 0.0, 800.0, 600.0, 0.5, 1.0);
    pass.set_viewport(viewport).unwrap();
    pass.set_viewport(viewport).unwrap();
    pass.set_viewport(Viewport {
        min_depth: 0.6,
        ..viewport
    })
    .unwrap();

    assert_eq!(log.forwarded(CallKind::SetViewport), 2);
}

#[test]
fn blend_constant_argument_shapes_are_interchangeable() {
    let scene = Scene::new();
    let log = CallLog::new();
    let mut pass = scene
        .tracker
        .begin_pass(RecordingRenderEncoder::new(log.clone()));

    pass.set_blend_constant(BlendConstant::Components([1.0, 1.0, 0.0, 1.0]))
        .unwrap();
    pass.set_blend_constant(Color {
        r: 1.0,
        g: 1.0,
        b: 0.0,
        a: 1.0,
    })
    .unwrap();

    assert_eq!(log.forwarded(CallKind::SetBlendConstant), 1);
}

#[test]
fn bundles_invalidate_bindings_but_not_fixed_function_state() {
    let scene = Scene::new();
    let log = CallLog::new();
    let mut pass = scene
        .tracker
        .begin_pass(RecordingRenderEncoder::new(log.clone()));
    let bundle = NullResource::new("bundle");
    let viewport = Viewport::new(0.0, 0.0, 64.0, 64.0, 0.0, 1.0);
    let scissor = ScissorRect::new(0, 0, 32, 32);

    let record = |pass: &mut statecache::TrackedPass<RecordingRenderEncoder>| {
        pass.set_pipeline(&scene.pipeline).unwrap();
        pass.set_bind_group(0, &scene.group, None).unwrap();
        pass.set_vertex_buffer(0, &scene.vertices, None, None).unwrap();
        pass.set_index_buffer(&scene.indices, IndexFormat::Uint16, None, None)
            .unwrap();
        pass.set_viewport(viewport).unwrap();
        pass.set_scissor_rect(scissor).unwrap();
        pass.set_blend_constant([0.25, 0.25, 0.25, 1.0]).unwrap();
        pass.set_stencil_reference(1).unwrap();
    };

    record(&mut pass);
    pass.execute_bundles(&[&bundle]).unwrap();
    record(&mut pass);
    pass.end().unwrap();

    let calls = scene.tracker.get_and_reset_redundant_call_info();
    assert_eq!(calls.resource_total(), 0);
    assert_eq!(calls.set_pipeline, 0);
    assert_eq!(calls.set_viewport, 1);
    assert_eq!(calls.set_scissor_rect, 1);
    assert_eq!(calls.set_blend_constant, 1);
    assert_eq!(calls.set_stencil_reference, 1);
}

#[test]
fn new_pass_starts_unbound() {
    let scene = Scene::new();
    let first = CallLog::new();
    let mut pass = scene
        .tracker
        .begin_pass(RecordingRenderEncoder::new(first.clone()));
    pass.set_pipeline(&scene.pipeline).unwrap();
    pass.set_viewport(Viewport::new(0.0, 0.0, 1.0, 1.0, 0.0, 1.0))
        .unwrap();
    pass.end().unwrap();

    let second = CallLog::new();
    let mut pass = scene
        .tracker
        .begin_pass(RecordingRenderEncoder::new(second.clone()));
    pass.set_pipeline(&scene.pipeline).unwrap();
    pass.set_viewport(Viewport::new(0.0, 0.0, 1.0, 1.0, 0.0, 1.0))
        .unwrap();
    pass.end().unwrap();

    assert_eq!(second.forwarded(CallKind::SetPipeline), 1);
    assert_eq!(second.forwarded(CallKind::SetViewport), 1);
    assert_eq!(
        scene.tracker.get_and_reset_redundant_call_info(),
        RedundantCalls::default()
    );
}

#[test]
fn get_and_reset_is_idempotent() {
    let scene = Scene::new();
    let mut pass = scene
        .tracker
        .begin_pass(RecordingRenderEncoder::new(CallLog::new()));
    pass.set_stencil_reference(0).unwrap();
    pass.end().unwrap();

    assert_eq!(
        scene.tracker.get_and_reset_redundant_call_info().total(),
        1
    );
    assert_eq!(
        scene.tracker.get_and_reset_redundant_call_info(),
        RedundantCalls::default()
    );
}

#[test]
fn passes_on_separate_threads_keep_separate_records() {
    let scene = Arc::new(Scene::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let scene = Arc::clone(&scene);
            thread::spawn(move || {
                let log = CallLog::new();
                let mut pass = scene
                    .tracker
                    .begin_pass(RecordingComputeEncoder::new(log.clone()));
                for _ in 0..10 {
                    pass.set_pipeline(&scene.pipeline).unwrap();
                    pass.set_bind_group(0, &scene.group, None).unwrap();
                }
                pass.end().unwrap();
                log.forwarded(CallKind::SetPipeline)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1);
    }
    let calls = scene.tracker.get_and_reset_redundant_call_info();
    assert_eq!(calls.set_pipeline, 36);
    assert_eq!(calls.set_bind_group, 36);
    assert_eq!(scene.tracker.active_passes(), 0);
}
