//! GPU backend abstraction layer.
//!
//! This module provides a trait-based abstraction for GPU backends,
//! allowing the rest of the crate to record and submit work without
//! depending on a particular graphics API.
//!
//! # Available Backends
//!
//! - `dummy` (default): recording backend for tests and headless runs
//! - `vulkan-backend`: native Vulkan backend using ash
//!
//! # Architecture
//!
//! Each backend implements the [`GpuBackend`] trait, which provides:
//! - Resource creation and destruction (images, buffers, samplers, render
//!   passes, framebuffers, descriptor sets, pipelines)
//! - Command buffer recording and submission
//! - Synchronization primitives with bounded waits
//! - Swapchain acquisition and presentation
//!
//! Every GPU object is referred to by a small `Copy` handle. Handles carry no
//! lifetime: the registries that create them are responsible for destroying
//! them in reverse dependency order.

pub mod dummy;

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "vulkan-backend")]
use crate::config::GraphicsConfig;
use crate::error::GraphicsError;
use crate::types::{
    AccessFlags, AlphaBlendMode, BufferCopy, BufferDescriptor, ClearValue, ColorBlendState,
    CompareOp, CullMode, Extent2d, FillMode, FilterMode, FrontFace, ImageAspect,
    ImageDescriptor, ImageFormat, ImageLayout, LoadOp, PipelineStages, PresentMode,
    SampleCount, SamplerDescriptor, ShaderStages, StoreOp, VertexFormat,
};

pub use dummy::{DummyBackend, RecordedCommand};

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub u64);

        impl $name {
            /// The null handle.
            pub const NULL: Self = Self(0);

            /// Returns true if this is the null handle.
            pub fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

gpu_handle!(
    /// Handle to a GPU image.
    ImageHandle
);
gpu_handle!(
    /// Handle to the default view of a GPU image.
    ImageViewHandle
);
gpu_handle!(
    /// Handle to a GPU buffer.
    BufferHandle
);
gpu_handle!(
    /// Handle to a sampler.
    SamplerHandle
);
gpu_handle!(
    /// Handle to a render pass.
    RenderPassHandle
);
gpu_handle!(
    /// Handle to a framebuffer.
    FramebufferHandle
);
gpu_handle!(
    /// Handle to a descriptor set layout.
    DescriptorSetLayoutHandle
);
gpu_handle!(
    /// Handle to a descriptor set.
    DescriptorSetHandle
);
gpu_handle!(
    /// Handle to a pipeline layout.
    PipelineLayoutHandle
);
gpu_handle!(
    /// Handle to a graphics pipeline.
    PipelineHandle
);
gpu_handle!(
    /// Handle to a compiled shader module.
    ShaderModuleHandle
);
gpu_handle!(
    /// Handle to a fence for CPU-GPU synchronization.
    FenceHandle
);
gpu_handle!(
    /// Handle to a semaphore for GPU-GPU synchronization.
    SemaphoreHandle
);
gpu_handle!(
    /// Handle to a primary command buffer.
    CommandBufferHandle
);
gpu_handle!(
    /// Handle to a swapchain.
    SwapchainHandle
);

// ============================================================================
// Descriptors
// ============================================================================

/// An image together with its default view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageAllocation {
    pub image: ImageHandle,
    pub view: ImageViewHandle,
}

/// One attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentDescriptor {
    pub format: ImageFormat,
    pub samples: SampleCount,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

/// A single-subpass render pass: all color attachments plus one depth attachment.
///
/// Stencil load/store are always "don't care".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPassDescriptor {
    pub label: Option<String>,
    pub color_attachments: Vec<AttachmentDescriptor>,
    pub depth_attachment: AttachmentDescriptor,
    /// Stages and accesses that consume the attachments once the pass ends;
    /// the attachment writes are made visible to them.
    pub next_stages: PipelineStages,
    pub next_access: AccessFlags,
}

impl RenderPassDescriptor {
    /// Total number of attachments, depth included.
    pub fn attachment_count(&self) -> usize {
        self.color_attachments.len() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FramebufferDescriptor {
    pub render_pass: RenderPassHandle,
    /// Views in attachment order: colors first, depth last.
    pub attachments: Vec<ImageViewHandle>,
    pub extent: Extent2d,
}

/// Kind of resource a descriptor binding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    UniformBuffer,
    StorageBuffer,
    CombinedImageSampler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub kind: DescriptorKind,
    pub stages: ShaderStages,
}

/// Resource written into one binding of a descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorResource {
    Buffer { buffer: BufferHandle, size: u64 },
    ImageSampler {
        view: ImageViewHandle,
        sampler: SamplerHandle,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub kind: DescriptorKind,
    pub resource: DescriptorResource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    pub offset: u32,
    pub size: u32,
    pub stages: ShaderStages,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineLayoutDescriptor {
    pub set_layouts: Vec<DescriptorSetLayoutHandle>,
    pub push_constant: Option<PushConstantRange>,
}

/// One vertex buffer binding with a single attribute at the same location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexStreamLayout {
    pub format: VertexFormat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationState {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub line_width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test_enabled: bool,
    pub write_enabled: bool,
    pub compare: CompareOp,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test_enabled: true,
            write_enabled: true,
            compare: CompareOp::LessOrEqual,
        }
    }
}

/// Everything needed to build a graphics pipeline (triangle lists only).
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPipelineDescriptor {
    pub label: Option<String>,
    pub layout: PipelineLayoutHandle,
    pub render_pass: RenderPassHandle,
    pub vertex_shader: ShaderModuleHandle,
    pub fragment_shader: Option<ShaderModuleHandle>,
    pub vertex_streams: Vec<VertexStreamLayout>,
    pub rasterization: RasterizationState,
    pub depth: DepthState,
    /// One entry per color attachment of the render pass.
    pub color_blend: Vec<ColorBlendState>,
    pub samples: SampleCount,
    /// Fixed viewport and scissor.
    pub extent: Extent2d,
}

impl GraphicsPipelineDescriptor {
    /// Blend states for `color_count` attachments sharing one blend mode.
    pub fn blend_states(mode: AlphaBlendMode, color_count: usize) -> Vec<ColorBlendState> {
        vec![ColorBlendState::from_mode(mode); color_count]
    }
}

/// A layout transition of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageBarrier {
    pub image: ImageHandle,
    pub aspect: ImageAspect,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub src_stage: PipelineStages,
    pub dst_stage: PipelineStages,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassBeginInfo {
    pub render_pass: RenderPassHandle,
    pub framebuffer: FramebufferHandle,
    pub extent: Extent2d,
    pub clear_values: Vec<ClearValue>,
}

/// Filtered copy between the full extents of two images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlitInfo {
    pub src: ImageHandle,
    pub src_extent: Extent2d,
    pub src_aspect: ImageAspect,
    pub dst: ImageHandle,
    pub dst_extent: Extent2d,
    pub dst_aspect: ImageAspect,
    pub filter: FilterMode,
}

/// Multisample resolve of identically sized images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolveInfo {
    pub src: ImageHandle,
    pub dst: ImageHandle,
    pub extent: Extent2d,
    pub aspect: ImageAspect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmitInfo {
    pub command_buffer: CommandBufferHandle,
    /// Semaphore waited on before the given stages run.
    pub wait: Option<(SemaphoreHandle, PipelineStages)>,
    pub signal: Option<SemaphoreHandle>,
    pub fence: Option<FenceHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapchainDescriptor {
    /// Requested extent, clamped to the surface capabilities.
    pub extent: Extent2d,
    pub present_mode: PresentMode,
    /// Swapchain being replaced, destroyed by the caller afterwards.
    pub old_swapchain: Option<SwapchainHandle>,
}

/// A created swapchain and the images it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainInfo {
    pub handle: SwapchainHandle,
    pub format: ImageFormat,
    pub extent: Extent2d,
    pub images: Vec<ImageAllocation>,
}

/// Result of acquiring the next swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquireOutcome {
    /// An image is available; `suboptimal` reports a surface mismatch that
    /// still allows presentation.
    Acquired { image_index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface and must be recreated.
    OutOfDate,
    /// No image became available within the timeout.
    Timeout,
}

/// Result of presenting a swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

// ============================================================================
// Backend trait
// ============================================================================

/// GPU backend trait for abstracting different GPU APIs.
///
/// All recording methods take the command buffer explicitly; only one thread
/// records into a given command buffer at a time.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    // --- resources ---------------------------------------------------------

    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<ImageAllocation, GraphicsError>;
    fn destroy_image(&self, image: ImageAllocation);

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferHandle, GraphicsError>;
    fn destroy_buffer(&self, buffer: BufferHandle);

    /// Write data into a host-visible buffer.
    fn write_buffer(
        &self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError>;

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerHandle, GraphicsError>;
    fn destroy_sampler(&self, sampler: SamplerHandle);

    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassHandle, GraphicsError>;
    fn destroy_render_pass(&self, render_pass: RenderPassHandle);

    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferHandle, GraphicsError>;
    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle);

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> Result<DescriptorSetLayoutHandle, GraphicsError>;
    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle);

    fn allocate_descriptor_set(
        &self,
        layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle, GraphicsError>;
    fn write_descriptor_set(&self, set: DescriptorSetHandle, writes: &[DescriptorWrite]);
    fn free_descriptor_set(&self, set: DescriptorSetHandle);

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutHandle, GraphicsError>;
    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle);

    fn create_shader_module(&self, spirv: &[u32]) -> Result<ShaderModuleHandle, GraphicsError>;
    fn destroy_shader_module(&self, module: ShaderModuleHandle);

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineHandle, GraphicsError>;
    fn destroy_pipeline(&self, pipeline: PipelineHandle);

    // --- synchronization ---------------------------------------------------

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle, GraphicsError>;
    /// Wait for a fence. Returns `Ok(false)` if the timeout elapsed first.
    fn wait_fence(&self, fence: FenceHandle, timeout: Duration) -> Result<bool, GraphicsError>;
    fn reset_fence(&self, fence: FenceHandle) -> Result<(), GraphicsError>;
    fn destroy_fence(&self, fence: FenceHandle);

    fn create_semaphore(&self) -> Result<SemaphoreHandle, GraphicsError>;
    fn destroy_semaphore(&self, semaphore: SemaphoreHandle);

    /// Block until the device has finished all submitted work.
    fn wait_idle(&self) -> Result<(), GraphicsError>;

    // --- command buffers ---------------------------------------------------

    fn allocate_command_buffer(&self) -> Result<CommandBufferHandle, GraphicsError>;
    fn free_command_buffer(&self, command_buffer: CommandBufferHandle);
    fn begin_command_buffer(
        &self,
        command_buffer: CommandBufferHandle,
        one_time_submit: bool,
    ) -> Result<(), GraphicsError>;
    fn end_command_buffer(&self, command_buffer: CommandBufferHandle)
    -> Result<(), GraphicsError>;
    fn submit(&self, info: &SubmitInfo) -> Result<(), GraphicsError>;

    // --- recording ---------------------------------------------------------

    fn cmd_pipeline_barrier(&self, cmd: CommandBufferHandle, barrier: &ImageBarrier);
    fn cmd_begin_render_pass(&self, cmd: CommandBufferHandle, info: &RenderPassBeginInfo);
    fn cmd_end_render_pass(&self, cmd: CommandBufferHandle);
    fn cmd_bind_pipeline(&self, cmd: CommandBufferHandle, pipeline: PipelineHandle);
    fn cmd_bind_descriptor_sets(
        &self,
        cmd: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        first_set: u32,
        sets: &[DescriptorSetHandle],
    );
    fn cmd_bind_vertex_buffers(&self, cmd: CommandBufferHandle, buffers: &[BufferHandle]);
    /// Bind a `u32` index buffer at offset zero.
    fn cmd_bind_index_buffer(&self, cmd: CommandBufferHandle, buffer: BufferHandle);
    fn cmd_push_constants(
        &self,
        cmd: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    );
    fn cmd_draw_indexed_indirect(
        &self,
        cmd: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        draw_count: u32,
        stride: u32,
    );
    fn cmd_blit_image(&self, cmd: CommandBufferHandle, info: &BlitInfo);
    fn cmd_resolve_image(&self, cmd: CommandBufferHandle, info: &ResolveInfo);
    fn cmd_copy_buffer(
        &self,
        cmd: CommandBufferHandle,
        src: BufferHandle,
        dst: BufferHandle,
        regions: &[BufferCopy],
    );

    // --- presentation ------------------------------------------------------

    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> Result<SwapchainInfo, GraphicsError>;
    /// Destroy a swapchain and the views of its images.
    fn destroy_swapchain(&self, swapchain: SwapchainHandle);
    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
        timeout: Duration,
    ) -> Result<AcquireOutcome, GraphicsError>;
    fn present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SemaphoreHandle,
    ) -> Result<PresentOutcome, GraphicsError>;
}

/// Record and synchronously execute a one-shot command buffer.
///
/// Used for staging uploads and buffer replacement, outside the frame loop.
pub fn submit_one_shot<F>(backend: &dyn GpuBackend, record: F) -> Result<(), GraphicsError>
where
    F: FnOnce(CommandBufferHandle),
{
    let cmd = backend.allocate_command_buffer()?;
    let fence = backend.create_fence(false)?;

    let result = (|| {
        backend.begin_command_buffer(cmd, true)?;
        record(cmd);
        backend.end_command_buffer(cmd)?;
        backend.submit(&SubmitInfo {
            command_buffer: cmd,
            wait: None,
            signal: None,
            fence: Some(fence),
        })?;
        // One-shot work runs outside the frame loop, so a hang here is fatal.
        if backend.wait_fence(fence, Duration::from_secs(10))? {
            Ok(())
        } else {
            Err(GraphicsError::Timeout("one-shot command buffer".to_string()))
        }
    })();

    backend.destroy_fence(fence);
    backend.free_command_buffer(cmd);
    result
}

/// Handles to a native window, used by the Vulkan backend to create a surface.
#[cfg(feature = "vulkan-backend")]
pub trait WindowSurface:
    raw_window_handle::HasDisplayHandle + raw_window_handle::HasWindowHandle
{
}

#[cfg(feature = "vulkan-backend")]
impl<T> WindowSurface for T where
    T: raw_window_handle::HasDisplayHandle + raw_window_handle::HasWindowHandle
{
}

/// Create the Vulkan backend for a window, falling back to the dummy backend
/// if Vulkan initialization fails.
#[cfg(feature = "vulkan-backend")]
pub fn create_backend(
    config: &GraphicsConfig,
    window: &dyn WindowSurface,
) -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    match vulkan::VulkanBackend::new(config, window) {
        Ok(backend) => {
            log::info!("Using Vulkan backend (ash)");
            Ok(Arc::new(backend))
        }
        Err(e) => {
            log::warn!("Failed to create Vulkan backend: {}", e);
            if cfg!(feature = "dummy") {
                log::info!("Using dummy backend");
                Ok(Arc::new(DummyBackend::new()))
            } else {
                Err(e)
            }
        }
    }
}

/// Create the recording dummy backend.
pub fn create_dummy_backend() -> Arc<dyn GpuBackend> {
    log::info!("Using dummy backend");
    Arc::new(DummyBackend::new())
}

/// Check if a real GPU backend is available.
pub fn has_gpu_backend() -> bool {
    cfg!(feature = "vulkan-backend")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handles() {
        assert!(BufferHandle::NULL.is_null());
        assert!(!BufferHandle(3).is_null());
        assert_eq!(ImageHandle::default(), ImageHandle::NULL);
    }

    #[test]
    fn test_one_shot_submission() {
        let backend = DummyBackend::new();
        submit_one_shot(&backend, |cmd| backend.cmd_end_render_pass(cmd)).unwrap();
        assert_eq!(backend.submit_count(), 1);
        assert_eq!(backend.live_resource_count(), 0);
    }

    #[test]
    fn test_blend_states_per_attachment() {
        let states = GraphicsPipelineDescriptor::blend_states(AlphaBlendMode::Simple, 3);
        assert_eq!(states.len(), 3);
        assert!(states.iter().all(|s| s.enabled));
    }
}
