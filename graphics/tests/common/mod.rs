//! Common utilities for graphics integration tests.
//!
//! Every test drives a [`GraphicsContext`] over the recording
//! [`DummyBackend`], which keeps a handle to the backend so tests can inspect
//! recorded commands and script presentation outcomes.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use prism_graphics::backend::RecordedCommand;
use prism_graphics::effect::AttachmentUsage;
use prism_graphics::mesh::{INDEX_BUFFER, NORMAL_BUFFER, POSITION_BUFFER, UV_BUFFER};
use prism_graphics::shader::SPIRV_MAGIC;
use prism_graphics::types::{ShaderStages, VertexFormat};
use prism_graphics::{
    BufferInfo, BufferUsage, DummyBackend, Extent2d, GpuBackend, GraphicsConfig, GraphicsContext,
    ImageFormat, ImageInfo, ImageSize, ImageUsage, ImageUsageFlags, MaterialId, MaterialTypeInfo,
    MemoryLocation, RenderEffectInfo, RenderModeInfo, RenderTargetInfo, ResourceBundleInfo,
    ResourceGroupInfo,
};

/// Window size every test context starts with.
pub const WINDOW: Extent2d = Extent2d {
    width: 800,
    height: 600,
};

/// Size of the push constant block of the forward bundle.
pub const PUSH_CONSTANT_SIZE: u32 = 64;

/// Size of the constants of the test material.
pub const MATERIAL_SIZE: usize = 16;

/// Default configuration with mesh and indirect buffers sized for tests.
pub fn test_config() -> GraphicsConfig {
    GraphicsConfig::default()
        .with_mesh_capacity(4 * 1024, 16 * 1024)
        .with_indirect_command_capacity(1024)
}

static INIT_LOGGING: Once = Once::new();

/// Initialize `env_logger` once per test binary.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A context together with the dummy backend it records into.
pub struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub ctx: GraphicsContext,
}

impl TestContext {
    /// A context with no declared resources beyond the built-in ones.
    pub fn new(config: GraphicsConfig) -> Self {
        init_logging();
        let backend = Arc::new(DummyBackend::new());
        let shared: Arc<dyn GpuBackend> = backend.clone();
        let ctx = GraphicsContext::new(shared, config, WINDOW).expect("context creation");
        Self { backend, ctx }
    }

    /// A context with the forward/post scene declared.
    pub fn with_scene(config: GraphicsConfig) -> Self {
        let mut test = Self::new(config);
        declare_scene(&mut test.ctx);
        test
    }

    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.backend.commands()
    }

    pub fn take_commands(&self) -> Vec<RecordedCommand> {
        self.backend.take_commands()
    }

    pub fn count(&self, predicate: impl Fn(&RecordedCommand) -> bool) -> usize {
        self.backend.count_commands(predicate)
    }

    /// Current usage of a per-frame image in the current frame slot.
    pub fn usage(&self, image: &str) -> ImageUsage {
        self.ctx
            .images()
            .get(image, prism_graphics::FrameSlot::Current, self.ctx.frame_index())
            .current_usage
    }

    /// Run one empty frame.
    pub fn run_frame(&mut self) {
        self.ctx.begin_frame().expect("begin_frame");
        self.ctx.begin("opaque");
        self.ctx.end_everything();
        self.ctx.end_frame().expect("end_frame");
    }
}

pub fn is_begin_pass(command: &RecordedCommand) -> bool {
    matches!(command, RecordedCommand::BeginRenderPass(_))
}

pub fn is_end_pass(command: &RecordedCommand) -> bool {
    matches!(command, RecordedCommand::EndRenderPass)
}

pub fn is_bind_pipeline(command: &RecordedCommand) -> bool {
    matches!(command, RecordedCommand::BindPipeline(_))
}

pub fn is_blit(command: &RecordedCommand) -> bool {
    matches!(command, RecordedCommand::BlitImage(_))
}

pub fn is_indirect_draw(command: &RecordedCommand) -> bool {
    matches!(command, RecordedCommand::DrawIndexedIndirect { .. })
}

fn surface_image(format: ImageFormat, usage: ImageUsageFlags) -> ImageInfo {
    ImageInfo::new(format, ImageSize::Surface, usage)
}

/// Declare a forward pass, a post pass sharing its depth image and three
/// effects:
///
/// - `opaque` and `wireframe` draw into `forward` (`forward_pass_color` + `depth`)
/// - `post` draws into `post` (`post_color` + `depth`)
pub fn declare_scene(ctx: &mut GraphicsContext) {
    let color = surface_image(
        ImageFormat::Rgba16Float,
        ImageUsageFlags::RENDER_TARGET | ImageUsageFlags::TEXTURE | ImageUsageFlags::TRANSFER_SRC,
    );
    let depth = surface_image(ImageFormat::Depth32Float, ImageUsageFlags::RENDER_TARGET);
    ctx.create_image_per_frame(&color, "forward_pass_color").unwrap();
    ctx.create_image_per_frame(&color, "post_color").unwrap();
    ctx.create_image_per_frame(&depth, "depth").unwrap();

    ctx.create_buffer_per_frame(
        &BufferInfo::new(64, BufferUsage::UNIFORM, MemoryLocation::CpuToGpu),
        "camera",
    )
    .unwrap();
    ctx.create_resource_group(
        &ResourceGroupInfo::new().with_uniform_buffer("camera", ShaderStages::VERTEX),
        "global",
    )
    .unwrap();
    ctx.create_push_constant(PUSH_CONSTANT_SIZE, "draw");
    ctx.create_resource_bundle(
        &ResourceBundleInfo::new()
            .with_group("global")
            .with_push_constant("draw"),
        "forward",
    )
    .unwrap();

    ctx.create_render_mode(&RenderModeInfo::new(), "opaque");
    ctx.create_render_mode(
        &RenderModeInfo::new().with_fill_mode(prism_graphics::types::FillMode::Line),
        "wireframe",
    );
    ctx.load_shader("mesh.vert", &[SPIRV_MAGIC]).unwrap();
    ctx.load_shader("mesh.frag", &[SPIRV_MAGIC]).unwrap();

    ctx.create_render_target(
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
    ctx.create_render_target(
        &RenderTargetInfo::new()
            .with_attachment("post_color", AttachmentUsage::clear_store(ImageUsage::Src))
            .with_attachment(
                "depth",
                AttachmentUsage::load_store(ImageUsage::RenderTargetDepth),
            ),
        "post",
    )
    .unwrap();

    for (name, target, mode) in [
        ("opaque", "forward", "opaque"),
        ("wireframe", "forward", "wireframe"),
        ("post", "post", "opaque"),
    ] {
        ctx.create_render_effect(&mesh_effect(target, "forward", mode), name)
            .unwrap();
    }
}

/// An effect drawing the shared mesh buffers.
pub fn mesh_effect(target: &str, bundle: &str, mode: &str) -> RenderEffectInfo {
    RenderEffectInfo::new(target, bundle, mode, "mesh.vert")
        .with_fragment_shader("mesh.frag")
        .with_vertex_stream(POSITION_BUFFER, VertexFormat::Float32x3)
        .with_vertex_stream(NORMAL_BUFFER, VertexFormat::Float32x3)
        .with_vertex_stream(UV_BUFFER, VertexFormat::Float32x2)
        .with_index_buffer(INDEX_BUFFER)
}

/// Declare the material type `lit`, drawn by an effect of the same name
/// whose second resource group holds the material's buffers.
pub fn declare_material(ctx: &mut GraphicsContext) -> MaterialId {
    let id = ctx
        .add_material_type(
            &MaterialTypeInfo::new("lit", "lit", MATERIAL_SIZE)
                .with_batch_capacity(64)
                .with_world_data_size(64),
        )
        .unwrap();
    ctx.create_resource_group(
        &ResourceGroupInfo::new()
            .with_storage_buffer("lit_transforms", ShaderStages::VERTEX)
            .with_storage_buffer("lit_materials", ShaderStages::FRAGMENT)
            .with_uniform_buffer("lit_world_data", ShaderStages::VERTEX | ShaderStages::FRAGMENT),
        "lit",
    )
    .unwrap();
    ctx.create_resource_bundle(
        &ResourceBundleInfo::new()
            .with_group("global")
            .with_group("lit")
            .with_push_constant("draw"),
        "lit",
    )
    .unwrap();
    ctx.create_render_effect(&mesh_effect("forward", "lit", "opaque"), "lit")
        .unwrap();
    id
}
