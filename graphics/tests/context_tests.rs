//! Integration tests for the graphics context.
//!
//! These tests run the public declaration and frame APIs against the
//! recording dummy backend and check the commands it received.
//!
//! # Test Categories
//!
//! - **Render Target Tests**: attachment validation and created objects
//! - **Effect Switching Tests**: the active-effect state machine
//! - **Frame Loop Tests**: frame slots, submission and presentation
//! - **Resize Tests**: out-of-date swapchains and window size changes
//! - **Failure Tests**: bounded waits and device loss
//! - **Material Tests**: batching, culling and indirect draws
//!
//! ```bash
//! cargo test -p prism-graphics --test context_tests
//! ```

mod common;

use std::time::Duration;

use rstest::{fixture, rstest};

use common::{
    MATERIAL_SIZE, PUSH_CONSTANT_SIZE, TestContext, WINDOW, declare_material, is_begin_pass,
    is_bind_pipeline, is_blit, is_end_pass, is_indirect_draw, test_config,
};
use prism_core::Camera;
use prism_core::math::{Vec2, Vec3};
use prism_graphics::backend::{AcquireOutcome, PresentOutcome, RecordedCommand};
use prism_graphics::effect::AttachmentUsage;
use prism_graphics::types::ImageLayout;
use prism_graphics::{
    Drawable, Extent2d, FilterMode, FrameSlot, GraphicsError, ImageFormat, ImageInfo, ImageSize,
    ImageUsage, ImageUsageFlags, ModelInstance, RenderTargetInfo, Transform,
};

#[fixture]
fn scene() -> TestContext {
    TestContext::with_scene(test_config())
}

// ============================================================================
// Render Target Tests
// ============================================================================

fn fixed_image(format: ImageFormat, usage: ImageUsageFlags) -> ImageInfo {
    ImageInfo::new(format, ImageSize::Fixed(Extent2d::new(1920, 1080)), usage)
}

/// A color image followed by a depth image yields one render pass with two
/// attachments and one framebuffer per frame slot at the image resolution.
#[rstest]
fn test_color_and_depth_render_target(mut scene: TestContext) {
    let ctx = &mut scene.ctx;
    ctx.create_image(
        &fixed_image(
            ImageFormat::Rgba8Unorm,
            ImageUsageFlags::RENDER_TARGET | ImageUsageFlags::TEXTURE,
        ),
        "hd_color",
    )
    .unwrap();
    ctx.create_image(
        &fixed_image(ImageFormat::Depth32Float, ImageUsageFlags::RENDER_TARGET),
        "hd_depth",
    )
    .unwrap();
    ctx.create_render_target(
        &RenderTargetInfo::new()
            .with_attachment("hd_color", AttachmentUsage::clear_store(ImageUsage::Texture))
            .with_attachment(
                "hd_depth",
                AttachmentUsage::clear_store(ImageUsage::RenderTargetDepth),
            ),
        "hd",
    )
    .unwrap();

    let target = scene.ctx.render_targets().get("hd").clone();
    let pass = scene
        .backend
        .render_pass_descriptor(target.render_pass)
        .expect("render pass recorded");
    assert_eq!(pass.attachment_count(), 2);
    assert_eq!(pass.color_attachments[0].format, ImageFormat::Rgba8Unorm);
    assert_eq!(pass.depth_attachment.format, ImageFormat::Depth32Float);

    assert_eq!(target.framebuffers.len(), scene.ctx.frames_in_flight());
    for framebuffer in &target.framebuffers {
        let descriptor = scene.backend.framebuffer_descriptor(*framebuffer).unwrap();
        assert_eq!(descriptor.extent, Extent2d::new(1920, 1080));
        assert_eq!(descriptor.render_pass, target.render_pass);
    }
}

#[rstest]
#[should_panic(expected = "depth resource must be last")]
fn test_render_target_without_depth_panics(mut scene: TestContext) {
    scene
        .ctx
        .create_render_target(
            &RenderTargetInfo::new()
                .with_attachment(
                    "forward_pass_color",
                    AttachmentUsage::clear_store(ImageUsage::Texture),
                )
                .with_attachment("post_color", AttachmentUsage::clear_store(ImageUsage::Texture)),
            "colors_only",
        )
        .unwrap();
}

#[rstest]
#[should_panic(expected = "which already exists!")]
fn test_duplicate_render_target_panics(mut scene: TestContext) {
    scene
        .ctx
        .create_render_target(
            &RenderTargetInfo::new()
                .with_attachment(
                    "forward_pass_color",
                    AttachmentUsage::clear_store(ImageUsage::Texture),
                )
                .with_attachment(
                    "depth",
                    AttachmentUsage::clear_store(ImageUsage::RenderTargetDepth),
                ),
            "forward",
        )
        .unwrap();
}

// ============================================================================
// Effect Switching Tests
// ============================================================================

/// Switching between effects on different render targets ends one pass and
/// begins exactly one other, leaving the outgoing images in their declared
/// next usage.
#[rstest]
fn test_switching_render_targets(mut scene: TestContext) {
    scene.ctx.begin_frame().unwrap();
    scene.ctx.begin("opaque");
    scene.take_commands();

    scene.ctx.begin("post");
    let commands = scene.take_commands();
    let ends: Vec<usize> = (0..commands.len()).filter(|&i| is_end_pass(&commands[i])).collect();
    let begins: Vec<usize> = (0..commands.len())
        .filter(|&i| is_begin_pass(&commands[i]))
        .collect();
    assert_eq!(ends.len(), 1);
    assert_eq!(begins.len(), 1);
    assert!(ends[0] < begins[0]);

    assert_eq!(scene.usage("forward_pass_color"), ImageUsage::Texture);
    assert_eq!(scene.usage("depth"), ImageUsage::RenderTargetDepth);
    assert_eq!(scene.ctx.active_effect(), Some("post"));

    scene.ctx.end_everything();
    scene.ctx.end_frame().unwrap();
}

#[rstest]
fn test_begin_same_effect_is_idempotent(mut scene: TestContext) {
    scene.ctx.begin_frame().unwrap();
    scene.ctx.begin("opaque");
    scene.take_commands();

    scene.ctx.begin("opaque");
    assert!(scene.take_commands().is_empty());

    scene.ctx.end_everything();
    scene.ctx.end_frame().unwrap();
}

/// Effects sharing a render target only swap the pipeline.
#[rstest]
fn test_same_target_rebinds_pipeline_only(mut scene: TestContext) {
    scene.ctx.begin_frame().unwrap();
    scene.ctx.begin("opaque");
    scene.take_commands();

    scene.ctx.begin("wireframe");
    assert_eq!(scene.count(is_begin_pass), 0);
    assert_eq!(scene.count(is_end_pass), 0);
    assert_eq!(scene.count(is_bind_pipeline), 1);

    scene.ctx.end_everything();
    scene.ctx.end_frame().unwrap();
}

#[rstest]
fn test_push_constants_use_effect_layout(mut scene: TestContext) {
    scene.ctx.begin_frame().unwrap();
    scene.ctx.begin("opaque");
    scene.take_commands();

    let data = [7u8; PUSH_CONSTANT_SIZE as usize];
    scene.ctx.push_constants(&data);
    let layout = scene.ctx.render_effects().get("opaque").layout;
    match scene.take_commands().as_slice() {
        [RecordedCommand::PushConstants {
            layout: recorded,
            offset,
            data: pushed,
            ..
        }] => {
            assert_eq!(*recorded, layout);
            assert_eq!(*offset, 0);
            assert_eq!(pushed.as_slice(), &data);
        }
        other => panic!("unexpected commands {other:?}"),
    }

    scene.ctx.end_everything();
    scene.ctx.end_frame().unwrap();
}

#[rstest]
#[should_panic(expected = "outside of begin_frame/end_frame")]
fn test_begin_outside_frame_panics(mut scene: TestContext) {
    scene.ctx.begin("opaque");
}

// ============================================================================
// Frame Loop Tests
// ============================================================================

#[rstest]
#[case::double_buffered(2, &[0, 1, 0, 1, 0])]
#[case::triple_buffered(3, &[0, 1, 2, 0, 1])]
fn test_frame_index_cycles(#[case] frames: usize, #[case] expected: &[usize]) {
    let mut test = TestContext::with_scene(test_config().with_frames_in_flight(frames));

    let mut observed = Vec::new();
    for _ in 0..expected.len() {
        test.ctx.begin_frame().unwrap();
        observed.push(test.ctx.frame_index());
        test.ctx.begin("opaque");
        test.ctx.end_everything();
        test.ctx.end_frame().unwrap();
    }

    assert_eq!(observed, expected);
    assert_eq!(test.ctx.frame_count(), expected.len() as u64);
    assert_eq!(test.backend.submit_count(), expected.len());
    assert_eq!(test.backend.present_count(), expected.len());
}

/// The primary color target is blitted onto the acquired swapchain image,
/// which ends up presentable.
#[rstest]
fn test_end_everything_presents_primary_target(mut scene: TestContext) {
    scene.ctx.begin_frame().unwrap();
    let image_index = scene.ctx.image_index().unwrap();
    scene.ctx.begin("opaque");
    scene.take_commands();

    scene.ctx.end_everything();
    let commands = scene.take_commands();
    assert!(is_end_pass(&commands[0]));
    assert_eq!(commands.iter().filter(|c| is_blit(c)).count(), 1);
    let RecordedCommand::PipelineBarrier(last) = commands.last().unwrap() else {
        panic!("expected a final barrier, got {:?}", commands.last());
    };
    assert_eq!(last.new_layout, ImageLayout::PresentSrc);

    let swapchain = scene.ctx.config().swapchain_name.clone();
    let usage = scene
        .ctx
        .images()
        .get(&swapchain, FrameSlot::Index(image_index as usize), 0)
        .current_usage;
    assert_eq!(usage, ImageUsage::Present);
    assert_eq!(scene.usage("forward_pass_color"), ImageUsage::Src);

    scene.ctx.end_frame().unwrap();
    assert_eq!(scene.ctx.image_index(), None);
}

/// Ending a frame with its render pass still open would submit an unfinished
/// pass and present an image nothing was blitted to.
#[rstest]
#[should_panic(expected = "end_frame called before end_everything")]
fn test_end_frame_with_open_pass_panics(mut scene: TestContext) {
    scene.ctx.begin_frame().unwrap();
    scene.ctx.begin("opaque");
    let _ = scene.ctx.end_frame();
}

#[rstest]
#[should_panic(expected = "end_frame called before end_everything")]
fn test_begin_after_end_everything_reopens_frame(mut scene: TestContext) {
    scene.ctx.begin_frame().unwrap();
    scene.ctx.begin("opaque");
    scene.ctx.end_everything();
    scene.ctx.begin("post");
    let _ = scene.ctx.end_frame();
}

#[rstest]
fn test_open_pass_is_never_submitted(mut scene: TestContext) {
    scene.ctx.begin_frame().unwrap();
    scene.ctx.begin("opaque");
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| scene.ctx.end_frame()));
    assert!(result.is_err());
    assert_eq!(scene.backend.submit_count(), 0);
    assert_eq!(scene.backend.present_count(), 0);
}

#[rstest]
fn test_blit_round_trip(mut scene: TestContext) {
    scene.ctx.begin_frame().unwrap();
    let current = FrameSlot::Current;

    scene.ctx.blit_image(
        ("post_color", current),
        ("forward_pass_color", current),
        FilterMode::Linear,
    );
    assert_eq!(scene.usage("forward_pass_color"), ImageUsage::Src);
    assert_eq!(scene.usage("post_color"), ImageUsage::Dst);

    scene.ctx.blit_image(
        ("forward_pass_color", current),
        ("post_color", current),
        FilterMode::Linear,
    );
    assert_eq!(scene.usage("forward_pass_color"), ImageUsage::Dst);
    assert_eq!(scene.usage("post_color"), ImageUsage::Src);
    assert_eq!(scene.count(is_blit), 2);

    scene.ctx.end_everything();
    scene.ctx.end_frame().unwrap();
}

#[rstest]
fn test_transition_skips_unchanged_usage(mut scene: TestContext) {
    scene.ctx.begin_frame().unwrap();
    scene.take_commands();

    scene
        .ctx
        .transition_image("forward_pass_color", FrameSlot::Current, ImageUsage::Texture);
    scene
        .ctx
        .transition_image("forward_pass_color", FrameSlot::Current, ImageUsage::Texture);
    let commands = scene.take_commands();
    assert_eq!(commands.len(), 1);
    let RecordedCommand::PipelineBarrier(barrier) = &commands[0] else {
        panic!("expected a barrier, got {:?}", commands[0]);
    };
    assert_eq!(barrier.old_layout, ImageLayout::Undefined);
    assert_eq!(barrier.new_layout, ImageLayout::ShaderReadOnly);

    scene.ctx.end_everything();
    scene.ctx.end_frame().unwrap();
}

#[rstest]
fn test_slots_ready_after_frames(mut scene: TestContext) {
    scene.run_frame();
    scene.run_frame();
    assert!(scene.ctx.is_slot_ready(0).unwrap());
    assert!(scene.ctx.is_slot_ready(1).unwrap());
    assert!(scene.ctx.wait_idle_timeout(Duration::from_millis(10)).unwrap());
}

#[rstest]
fn test_destroy_releases_everything(mut scene: TestContext) {
    scene.run_frame();
    scene.ctx.destroy();
    assert_eq!(scene.backend.live_resource_count(), 0);

    // A second destroy, and the one from Drop, are no-ops.
    scene.ctx.destroy();
    assert_eq!(scene.backend.live_resource_count(), 0);
}

// ============================================================================
// Resize Tests
// ============================================================================

#[rstest]
fn test_out_of_date_acquire_recreates_swapchain(mut scene: TestContext) {
    scene.backend.script_acquire(AcquireOutcome::OutOfDate);
    scene.ctx.begin_frame().unwrap();

    assert_eq!(scene.backend.swapchain_count(), 2);
    assert!(scene.backend.wait_idle_count() >= 1);
    assert_eq!(scene.ctx.surface_extent(), WINDOW);

    scene.ctx.begin("opaque");
    scene.ctx.end_everything();
    scene.ctx.end_frame().unwrap();
}

#[rstest]
#[case::out_of_date(PresentOutcome::OutOfDate)]
#[case::suboptimal(PresentOutcome::Suboptimal)]
fn test_stale_present_recreates_swapchain(mut scene: TestContext, #[case] outcome: PresentOutcome) {
    scene.backend.script_present(outcome);
    scene.run_frame();

    assert_eq!(scene.backend.swapchain_count(), 2);
    assert_eq!(scene.ctx.frame_count(), 1);
    scene.run_frame();
    assert_eq!(scene.backend.swapchain_count(), 2);
}

#[rstest]
fn test_acquire_stays_out_of_date(mut scene: TestContext) {
    for _ in 0..3 {
        scene.backend.script_acquire(AcquireOutcome::OutOfDate);
    }
    let err = scene.ctx.begin_frame().unwrap_err();
    assert_eq!(err, GraphicsError::SurfaceOutdated);

    // The next frame acquires normally.
    scene.run_frame();
    assert_eq!(scene.ctx.frame_count(), 1);
}

/// A window resize rebuilds the surface-sized images, the render targets
/// using them and the effects drawing into those targets.
#[rstest]
fn test_window_resize_rebuilds_surface_resources(mut scene: TestContext) {
    let old_pipeline = scene.ctx.render_effects().get("opaque").pipeline;
    let new_extent = Extent2d::new(1024, 768);

    scene.ctx.notify_resized(new_extent.width, new_extent.height);
    scene.run_frame();

    assert_eq!(scene.ctx.surface_extent(), new_extent);
    for slot in 0..scene.ctx.frames_in_flight() {
        let image = scene
            .ctx
            .images()
            .get("forward_pass_color", FrameSlot::Index(slot), 0);
        assert_eq!(image.resolution, new_extent);
    }
    assert_eq!(scene.ctx.render_targets().get("forward").resolution, new_extent);
    assert_eq!(scene.ctx.render_targets().get("post").resolution, new_extent);

    let effect = scene.ctx.render_effects().get("opaque");
    assert_eq!(effect.resolution, new_extent);
    assert_ne!(effect.pipeline, old_pipeline);
    let descriptor = scene.backend.pipeline_descriptor(effect.pipeline).unwrap();
    assert_eq!(descriptor.extent, new_extent);
}

#[rstest]
fn test_zero_size_resize_is_deferred(mut scene: TestContext) {
    scene.ctx.notify_resized(0, 0);
    scene.run_frame();
    assert_eq!(scene.backend.swapchain_count(), 1);
    assert_eq!(scene.ctx.surface_extent(), WINDOW);

    scene.ctx.notify_resized(640, 480);
    scene.run_frame();
    assert_eq!(scene.backend.swapchain_count(), 2);
    assert_eq!(scene.ctx.surface_extent(), Extent2d::new(640, 480));
}

#[rstest]
fn test_fixed_size_images_survive_resize(mut scene: TestContext) {
    scene
        .ctx
        .create_image(
            &ImageInfo::new(
                ImageFormat::Rgba8Unorm,
                ImageSize::Fixed(Extent2d::new(256, 256)),
                ImageUsageFlags::TEXTURE,
            ),
            "lut",
        )
        .unwrap();
    let before = *scene.ctx.images().get("lut", FrameSlot::Current, 0);

    scene.ctx.resize(Extent2d::new(1280, 720)).unwrap();
    let after = *scene.ctx.images().get("lut", FrameSlot::Current, 0);
    assert_eq!(before, after);
}

// ============================================================================
// Failure Tests
// ============================================================================

#[test]
fn test_unsignaled_fence_times_out() {
    let mut test = TestContext::with_scene(
        test_config()
            .with_frames_in_flight(1)
            .with_timeouts(5, 5),
    );
    test.backend.stall_fences(true);
    test.run_frame();

    let err = test.ctx.begin_frame().unwrap_err();
    assert!(matches!(err, GraphicsError::Timeout(_)), "{err:?}");
}

#[rstest]
fn test_acquire_timeout_is_an_error(mut scene: TestContext) {
    scene.backend.script_acquire(AcquireOutcome::Timeout);
    let err = scene.ctx.begin_frame().unwrap_err();
    assert!(matches!(err, GraphicsError::Timeout(_)), "{err:?}");
}

#[rstest]
fn test_device_loss_is_reported(mut scene: TestContext) {
    scene.run_frame();
    scene.backend.lose_device();
    assert_eq!(scene.ctx.begin_frame().unwrap_err(), GraphicsError::DeviceLost);
    assert_eq!(scene.ctx.wait_idle().unwrap_err(), GraphicsError::DeviceLost);
}

// ============================================================================
// Material Tests
// ============================================================================

fn triangle(test: &mut TestContext) -> prism_graphics::Model {
    let mesh = test
        .ctx
        .create_mesh(
            &[
                Vec3::new(-1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            &[Vec3::new(0.0, 0.0, 1.0); 3],
            &[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.5, 1.0)],
            &[0, 1, 2],
        )
        .unwrap();
    let model = test.ctx.create_model_instance(ModelInstance::single(mesh.id));
    test.ctx.create_model(model, Vec3::new(1.0, 1.0, 1.0))
}

/// Drawables behind the camera are culled; the survivors are drawn with one
/// indirect draw and counted in the next frame's statistics.
#[rstest]
fn test_material_draw_flow(mut scene: TestContext) {
    let material = declare_material(&mut scene.ctx);
    let model = triangle(&mut scene);

    scene.ctx.begin_frame().unwrap();
    let constants = [1u8; MATERIAL_SIZE];
    for position in [
        Vec3::new(0.0, 0.0, -10.0),
        Vec3::new(1.0, 0.0, -12.0),
        Vec3::new(0.0, 0.0, 10.0),
    ] {
        scene.ctx.push_drawable(
            material,
            Drawable::new(Transform::from_position(position), model),
            &constants,
        );
    }
    scene.ctx.build_commands(&Camera::default()).unwrap();

    let counts = scene.ctx.materials().counts(material);
    assert_eq!(counts.draw_count, 2);
    assert_eq!(counts.cull_count, 1);
    let first_instances: Vec<u32> = scene
        .ctx
        .materials()
        .commands()
        .iter()
        .map(|command| command.first_instance)
        .collect();
    assert_eq!(first_instances, vec![0, 1]);

    scene.take_commands();
    scene.ctx.draw_materials();
    assert_eq!(scene.ctx.active_effect(), Some("lit"));
    let draws: Vec<RecordedCommand> = scene
        .take_commands()
        .into_iter()
        .filter(is_indirect_draw)
        .collect();
    let [RecordedCommand::DrawIndexedIndirect { draw_count, offset, .. }] = draws.as_slice() else {
        panic!("expected one indirect draw, got {draws:?}");
    };
    assert_eq!(*draw_count, 2);
    assert_eq!(*offset, 0);

    scene.ctx.end_everything();
    scene.ctx.end_frame().unwrap();

    scene.ctx.begin_frame().unwrap();
    let stats = scene.ctx.material_stats();
    assert_eq!(stats.draw_count, 2);
    assert_eq!(stats.cull_count, 1);
    assert_eq!(stats.triangle_count, 2);
    assert_eq!(scene.ctx.materials().counts(material).draw_count, 0);
    scene.ctx.end_everything();
    scene.ctx.end_frame().unwrap();
}

#[rstest]
fn test_material_without_survivors_draws_nothing(mut scene: TestContext) {
    let material = declare_material(&mut scene.ctx);
    let model = triangle(&mut scene);

    scene.ctx.begin_frame().unwrap();
    let instance = scene.ctx.add_material_instance(material, &[3u8; MATERIAL_SIZE]);
    scene.ctx.push_instance(
        material,
        Drawable::new(Transform::from_position(Vec3::new(0.0, 0.0, 50.0)), model),
        instance,
    );
    scene.ctx.build_commands(&Camera::default()).unwrap();
    scene.take_commands();
    scene.ctx.draw_materials();

    assert_eq!(scene.count(is_indirect_draw), 0);
    assert_eq!(scene.ctx.active_effect(), None);
    scene.ctx.end_everything();
    scene.ctx.end_frame().unwrap();
}
