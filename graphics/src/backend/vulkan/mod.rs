//! Native Vulkan backend implementation using ash.
//!
//! Every backend handle is the raw value of the Vulkan handle it names, so
//! most calls convert and forward without a lookup. Images, buffers and
//! swapchains keep side tables for the memory and views they own.
//!
//! Rendering uses classic render passes and framebuffers; the command pool,
//! descriptor pool and queue are guarded by mutexes because Vulkan requires
//! external synchronization for them.

mod allocator;
mod command;
mod conversion;
mod debug;
mod device;
mod instance;
mod pipeline;
mod resources;
mod swapchain;

use std::collections::HashMap;
use std::time::Duration;

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{Allocation, Allocator};
use parking_lot::Mutex;

use crate::backend::{
    AcquireOutcome, BlitInfo, BufferHandle, CommandBufferHandle, DescriptorBinding,
    DescriptorSetHandle, DescriptorSetLayoutHandle, DescriptorWrite, FenceHandle,
    FramebufferDescriptor, FramebufferHandle, GpuBackend, GraphicsPipelineDescriptor,
    ImageAllocation, ImageBarrier, PipelineHandle, PipelineLayoutDescriptor, PipelineLayoutHandle,
    PresentOutcome, RenderPassBeginInfo, RenderPassDescriptor, RenderPassHandle, ResolveInfo,
    SamplerHandle, SemaphoreHandle, ShaderModuleHandle, SubmitInfo, SwapchainDescriptor,
    SwapchainHandle, SwapchainInfo, WindowSurface,
};
use crate::config::GraphicsConfig;
use crate::error::GraphicsError;
use crate::types::{
    BufferCopy, BufferDescriptor, Extent2d, ImageAspect, ImageDescriptor, SamplerDescriptor,
    ShaderStages,
};

use self::conversion::{
    convert_access, convert_aspect, convert_clear_value, convert_filter_mode, convert_layout,
    convert_shader_stages, convert_stages, vk_error,
};
use self::resources::BufferEntry;

/// Vulkan-based GPU backend using ash.
///
/// This backend provides native Vulkan access with:
/// - Validation layers when enabled in the configuration
/// - gpu-allocator for memory management
/// - One graphics queue that also presents to the window surface
pub struct VulkanBackend {
    /// Vulkan entry points, kept loaded for the lifetime of the instance.
    #[allow(dead_code)]
    entry: ash::Entry,
    instance: ash::Instance,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    /// Object naming, present when validation is enabled.
    debug_device: Option<ash::ext::debug_utils::Device>,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    swapchain_loader: ash::khr::swapchain::Device,
    queue: Mutex<vk::Queue>,
    queue_family: u32,
    /// `None` once dropped, ahead of the device.
    allocator: Mutex<Option<Allocator>>,
    command_pool: Mutex<vk::CommandPool>,
    descriptor_pool: Mutex<vk::DescriptorPool>,
    /// Memory of live images, by raw image handle.
    images: Mutex<HashMap<u64, Allocation>>,
    /// Memory of live buffers, by raw buffer handle.
    buffers: Mutex<HashMap<u64, BufferEntry>>,
    /// Image views of live swapchains, by raw swapchain handle.
    swapchains: Mutex<HashMap<u64, Vec<vk::ImageView>>>,
    validation_enabled: bool,
}

impl std::fmt::Debug for VulkanBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBackend")
            .field("queue_family", &self.queue_family)
            .field("validation_enabled", &self.validation_enabled)
            .finish_non_exhaustive()
    }
}

impl VulkanBackend {
    /// Create the backend and a presentation surface for `window`.
    ///
    /// This initializes the Vulkan instance, selects a physical device able
    /// to present to the window, creates a logical device, and sets up the
    /// memory allocator and pools.
    pub fn new(config: &GraphicsConfig, window: &dyn WindowSurface) -> Result<Self, GraphicsError> {
        let display = window
            .display_handle()
            .map_err(|e| GraphicsError::InitializationFailed(format!("No display handle: {e}")))?
            .as_raw();
        let window_handle = window
            .window_handle()
            .map_err(|e| GraphicsError::InitializationFailed(format!("No window handle: {e}")))?
            .as_raw();

        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to load Vulkan: {}", e))
        })?;

        let instance::InstanceBundle {
            instance,
            debug_utils,
            debug_messenger,
        } = instance::create_instance(&entry, config.validation, display)?;

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let surface = unsafe {
            ash_window::create_surface(&entry, &instance, display, window_handle, None)
        }
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to create surface: {:?}", e))
        })?;

        let selected = device::select_physical_device(&instance, &surface_loader, surface)?;
        let device = device::create_logical_device(&instance, &selected)?;
        let queue = unsafe { device.get_device_queue(selected.queue_family, 0) };

        let allocator =
            allocator::create_allocator(&instance, selected.physical_device, device.clone())?;
        let command_pool = command::create_command_pool(&device, selected.queue_family)?;
        let descriptor_pool = command::create_descriptor_pool(&device)?;
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);
        let debug_device = debug_utils
            .as_ref()
            .map(|_| ash::ext::debug_utils::Device::new(&instance, &device));

        log::info!(
            "Vulkan backend initialized (validation: {})",
            debug_utils.is_some()
        );

        Ok(Self {
            entry,
            instance,
            validation_enabled: debug_utils.is_some(),
            debug_utils,
            debug_messenger,
            debug_device,
            surface_loader,
            surface,
            physical_device: selected.physical_device,
            device,
            swapchain_loader,
            queue: Mutex::new(queue),
            queue_family: selected.queue_family,
            allocator: Mutex::new(Some(allocator)),
            command_pool: Mutex::new(command_pool),
            descriptor_pool: Mutex::new(descriptor_pool),
            images: Mutex::new(HashMap::new()),
            buffers: Mutex::new(HashMap::new()),
            swapchains: Mutex::new(HashMap::new()),
        })
    }

    /// Get the Vulkan device.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the physical device.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get the graphics and present queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            let leaked = self.images.lock().len() + self.buffers.lock().len();
            if leaked > 0 {
                log::warn!("{} images and buffers still alive at backend drop", leaked);
            }
            for (image, allocation) in self.images.lock().drain() {
                self.device.destroy_image(vk::Image::from_raw(image), None);
                if let Some(allocator) = self.allocator.lock().as_mut() {
                    let _ = allocator.free(allocation);
                }
            }
            for (buffer, entry) in self.buffers.lock().drain() {
                self.device.destroy_buffer(vk::Buffer::from_raw(buffer), None);
                if let Some(allocator) = self.allocator.lock().as_mut() {
                    let _ = allocator.free(entry.allocation);
                }
            }
            for (swapchain, views) in self.swapchains.lock().drain() {
                for view in views {
                    self.device.destroy_image_view(view, None);
                }
                self.swapchain_loader
                    .destroy_swapchain(vk::SwapchainKHR::from_raw(swapchain), None);
            }

            self.device
                .destroy_descriptor_pool(*self.descriptor_pool.lock(), None);
            self.device
                .destroy_command_pool(*self.command_pool.lock(), None);

            // The allocator frees its memory blocks on drop and needs the device.
            drop(self.allocator.lock().take());

            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);

            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

fn cmd(handle: CommandBufferHandle) -> vk::CommandBuffer {
    vk::CommandBuffer::from_raw(handle.0)
}

fn full_layers(aspect: ImageAspect) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: convert_aspect(aspect),
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn far_corner(extent: Extent2d) -> vk::Offset3D {
    vk::Offset3D {
        x: extent.width as i32,
        y: extent.height as i32,
        z: 1,
    }
}

impl GpuBackend for VulkanBackend {
    fn name(&self) -> &'static str {
        "Vulkan (ash)"
    }

    // --- resources ---------------------------------------------------------

    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<ImageAllocation, GraphicsError> {
        self.create_image_impl(descriptor)
    }

    fn destroy_image(&self, image: ImageAllocation) {
        self.destroy_image_impl(image);
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferHandle, GraphicsError> {
        self.create_buffer_impl(descriptor)
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        self.destroy_buffer_impl(buffer);
    }

    fn write_buffer(
        &self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        self.write_buffer_impl(buffer, offset, data)
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerHandle, GraphicsError> {
        self.create_sampler_impl(descriptor)
    }

    fn destroy_sampler(&self, sampler: SamplerHandle) {
        unsafe {
            self.device
                .destroy_sampler(vk::Sampler::from_raw(sampler.0), None)
        };
    }

    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassHandle, GraphicsError> {
        let render_pass = pipeline::create_render_pass(&self.device, descriptor)?;
        debug::set_object_name(
            self.debug_device.as_ref(),
            render_pass,
            descriptor.label.as_deref(),
        );
        Ok(RenderPassHandle(render_pass.as_raw()))
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        unsafe {
            self.device
                .destroy_render_pass(vk::RenderPass::from_raw(render_pass.0), None)
        };
    }

    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferHandle, GraphicsError> {
        pipeline::create_framebuffer(&self.device, descriptor)
            .map(|framebuffer| FramebufferHandle(framebuffer.as_raw()))
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        unsafe {
            self.device
                .destroy_framebuffer(vk::Framebuffer::from_raw(framebuffer.0), None)
        };
    }

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> Result<DescriptorSetLayoutHandle, GraphicsError> {
        pipeline::create_descriptor_set_layout(&self.device, bindings)
            .map(|layout| DescriptorSetLayoutHandle(layout.as_raw()))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        unsafe {
            self.device
                .destroy_descriptor_set_layout(vk::DescriptorSetLayout::from_raw(layout.0), None)
        };
    }

    fn allocate_descriptor_set(
        &self,
        layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle, GraphicsError> {
        let pool = self.descriptor_pool.lock();
        pipeline::allocate_descriptor_set(
            &self.device,
            *pool,
            vk::DescriptorSetLayout::from_raw(layout.0),
        )
        .map(|set| DescriptorSetHandle(set.as_raw()))
    }

    fn write_descriptor_set(&self, set: DescriptorSetHandle, writes: &[DescriptorWrite]) {
        pipeline::write_descriptor_set(&self.device, vk::DescriptorSet::from_raw(set.0), writes);
    }

    fn free_descriptor_set(&self, set: DescriptorSetHandle) {
        let pool = self.descriptor_pool.lock();
        let sets = [vk::DescriptorSet::from_raw(set.0)];
        if let Err(e) = unsafe { self.device.free_descriptor_sets(*pool, &sets) } {
            log::warn!("Failed to free descriptor set: {:?}", e);
        }
    }

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutHandle, GraphicsError> {
        pipeline::create_pipeline_layout(&self.device, descriptor)
            .map(|layout| PipelineLayoutHandle(layout.as_raw()))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        unsafe {
            self.device
                .destroy_pipeline_layout(vk::PipelineLayout::from_raw(layout.0), None)
        };
    }

    fn create_shader_module(&self, spirv: &[u32]) -> Result<ShaderModuleHandle, GraphicsError> {
        pipeline::create_shader_module(&self.device, spirv)
            .map(|module| ShaderModuleHandle(module.as_raw()))
    }

    fn destroy_shader_module(&self, module: ShaderModuleHandle) {
        unsafe {
            self.device
                .destroy_shader_module(vk::ShaderModule::from_raw(module.0), None)
        };
    }

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineHandle, GraphicsError> {
        let pipeline = pipeline::create_graphics_pipeline(&self.device, descriptor)?;
        debug::set_object_name(
            self.debug_device.as_ref(),
            pipeline,
            descriptor.label.as_deref(),
        );
        Ok(PipelineHandle(pipeline.as_raw()))
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        unsafe {
            self.device
                .destroy_pipeline(vk::Pipeline::from_raw(pipeline.0), None)
        };
    }

    // --- synchronization ---------------------------------------------------

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle, GraphicsError> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let fence_info = vk::FenceCreateInfo::default().flags(flags);
        unsafe { self.device.create_fence(&fence_info, None) }
            .map(|fence| FenceHandle(fence.as_raw()))
            .map_err(|e| vk_error("Failed to create fence", e))
    }

    fn wait_fence(&self, fence: FenceHandle, timeout: Duration) -> Result<bool, GraphicsError> {
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        let fences = [vk::Fence::from_raw(fence.0)];
        match unsafe { self.device.wait_for_fences(&fences, true, timeout_ns) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(vk_error("Failed to wait for fence", e)),
        }
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<(), GraphicsError> {
        let fences = [vk::Fence::from_raw(fence.0)];
        unsafe { self.device.reset_fences(&fences) }
            .map_err(|e| vk_error("Failed to reset fence", e))
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        unsafe { self.device.destroy_fence(vk::Fence::from_raw(fence.0), None) };
    }

    fn create_semaphore(&self) -> Result<SemaphoreHandle, GraphicsError> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        unsafe { self.device.create_semaphore(&semaphore_info, None) }
            .map(|semaphore| SemaphoreHandle(semaphore.as_raw()))
            .map_err(|e| vk_error("Failed to create semaphore", e))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        unsafe {
            self.device
                .destroy_semaphore(vk::Semaphore::from_raw(semaphore.0), None)
        };
    }

    fn wait_idle(&self) -> Result<(), GraphicsError> {
        // Queue access must not overlap with submission.
        let _queue = self.queue.lock();
        unsafe { self.device.device_wait_idle() }
            .map_err(|e| vk_error("Failed to wait for device idle", e))
    }

    // --- command buffers ---------------------------------------------------

    fn allocate_command_buffer(&self) -> Result<CommandBufferHandle, GraphicsError> {
        let pool = self.command_pool.lock();
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| vk_error("Failed to allocate command buffer", e))?;
        buffers
            .first()
            .map(|buffer| CommandBufferHandle(buffer.as_raw()))
            .ok_or_else(|| GraphicsError::Internal("Command buffer allocation returned nothing".into()))
    }

    fn free_command_buffer(&self, command_buffer: CommandBufferHandle) {
        let pool = self.command_pool.lock();
        unsafe {
            self.device
                .free_command_buffers(*pool, &[cmd(command_buffer)])
        };
    }

    fn begin_command_buffer(
        &self,
        command_buffer: CommandBufferHandle,
        one_time_submit: bool,
    ) -> Result<(), GraphicsError> {
        let flags = if one_time_submit {
            vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT
        } else {
            vk::CommandBufferUsageFlags::empty()
        };
        let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
        // Beginning implicitly resets buffers from a RESET_COMMAND_BUFFER pool.
        unsafe {
            self.device
                .begin_command_buffer(cmd(command_buffer), &begin_info)
        }
        .map_err(|e| vk_error("Failed to begin command buffer", e))
    }

    fn end_command_buffer(
        &self,
        command_buffer: CommandBufferHandle,
    ) -> Result<(), GraphicsError> {
        unsafe { self.device.end_command_buffer(cmd(command_buffer)) }
            .map_err(|e| vk_error("Failed to end command buffer", e))
    }

    fn submit(&self, info: &SubmitInfo) -> Result<(), GraphicsError> {
        let command_buffers = [cmd(info.command_buffer)];
        let (wait_semaphores, wait_stages): (Vec<vk::Semaphore>, Vec<vk::PipelineStageFlags>) =
            info.wait
                .iter()
                .map(|(semaphore, stages)| {
                    (vk::Semaphore::from_raw(semaphore.0), convert_stages(*stages))
                })
                .unzip();
        let signal_semaphores: Vec<vk::Semaphore> = info
            .signal
            .iter()
            .map(|semaphore| vk::Semaphore::from_raw(semaphore.0))
            .collect();
        let fence = info
            .fence
            .map_or(vk::Fence::null(), |fence| vk::Fence::from_raw(fence.0));

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let queue = self.queue.lock();
        unsafe { self.device.queue_submit(*queue, &[submit_info], fence) }
            .map_err(|e| vk_error("Failed to submit command buffer", e))
    }

    // --- recording ---------------------------------------------------------

    fn cmd_pipeline_barrier(&self, command_buffer: CommandBufferHandle, barrier: &ImageBarrier) {
        let image_barrier = vk::ImageMemoryBarrier::default()
            .old_layout(convert_layout(barrier.old_layout))
            .new_layout(convert_layout(barrier.new_layout))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(vk::Image::from_raw(barrier.image.0))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: convert_aspect(barrier.aspect),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_access_mask(convert_access(barrier.src_access))
            .dst_access_mask(convert_access(barrier.dst_access));

        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd(command_buffer),
                convert_stages(barrier.src_stage),
                convert_stages(barrier.dst_stage),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[image_barrier],
            );
        }
    }

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, info: &RenderPassBeginInfo) {
        let clear_values: Vec<vk::ClearValue> = info
            .clear_values
            .iter()
            .copied()
            .map(convert_clear_value)
            .collect();
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk::RenderPass::from_raw(info.render_pass.0))
            .framebuffer(vk::Framebuffer::from_raw(info.framebuffer.0))
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent: vk::Extent2D {
                    width: info.extent.width,
                    height: info.extent.height,
                },
            })
            .clear_values(&clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(
                cmd(command_buffer),
                &begin_info,
                vk::SubpassContents::INLINE,
            )
        };
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle) {
        unsafe { self.device.cmd_end_render_pass(cmd(command_buffer)) };
    }

    fn cmd_bind_pipeline(&self, command_buffer: CommandBufferHandle, pipeline: PipelineHandle) {
        unsafe {
            self.device.cmd_bind_pipeline(
                cmd(command_buffer),
                vk::PipelineBindPoint::GRAPHICS,
                vk::Pipeline::from_raw(pipeline.0),
            )
        };
    }

    fn cmd_bind_descriptor_sets(
        &self,
        command_buffer: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        first_set: u32,
        sets: &[DescriptorSetHandle],
    ) {
        let sets: Vec<vk::DescriptorSet> = sets
            .iter()
            .map(|set| vk::DescriptorSet::from_raw(set.0))
            .collect();
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                cmd(command_buffer),
                vk::PipelineBindPoint::GRAPHICS,
                vk::PipelineLayout::from_raw(layout.0),
                first_set,
                &sets,
                &[],
            )
        };
    }

    fn cmd_bind_vertex_buffers(&self, command_buffer: CommandBufferHandle, buffers: &[BufferHandle]) {
        let vk_buffers: Vec<vk::Buffer> = buffers
            .iter()
            .map(|buffer| vk::Buffer::from_raw(buffer.0))
            .collect();
        let offsets = vec![0u64; vk_buffers.len()];
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(cmd(command_buffer), 0, &vk_buffers, &offsets)
        };
    }

    fn cmd_bind_index_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle) {
        unsafe {
            self.device.cmd_bind_index_buffer(
                cmd(command_buffer),
                vk::Buffer::from_raw(buffer.0),
                0,
                vk::IndexType::UINT32,
            )
        };
    }

    fn cmd_push_constants(
        &self,
        command_buffer: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) {
        unsafe {
            self.device.cmd_push_constants(
                cmd(command_buffer),
                vk::PipelineLayout::from_raw(layout.0),
                convert_shader_stages(stages),
                offset,
                data,
            )
        };
    }

    fn cmd_draw_indexed_indirect(
        &self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        unsafe {
            self.device.cmd_draw_indexed_indirect(
                cmd(command_buffer),
                vk::Buffer::from_raw(buffer.0),
                offset,
                draw_count,
                stride,
            )
        };
    }

    fn cmd_blit_image(&self, command_buffer: CommandBufferHandle, info: &BlitInfo) {
        let region = vk::ImageBlit::default()
            .src_subresource(full_layers(info.src_aspect))
            .src_offsets([vk::Offset3D::default(), far_corner(info.src_extent)])
            .dst_subresource(full_layers(info.dst_aspect))
            .dst_offsets([vk::Offset3D::default(), far_corner(info.dst_extent)]);

        unsafe {
            self.device.cmd_blit_image(
                cmd(command_buffer),
                vk::Image::from_raw(info.src.0),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::Image::from_raw(info.dst.0),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
                convert_filter_mode(info.filter),
            )
        };
    }

    fn cmd_resolve_image(&self, command_buffer: CommandBufferHandle, info: &ResolveInfo) {
        let region = vk::ImageResolve {
            src_subresource: full_layers(info.aspect),
            src_offset: vk::Offset3D::default(),
            dst_subresource: full_layers(info.aspect),
            dst_offset: vk::Offset3D::default(),
            extent: vk::Extent3D {
                width: info.extent.width,
                height: info.extent.height,
                depth: 1,
            },
        };

        unsafe {
            self.device.cmd_resolve_image(
                cmd(command_buffer),
                vk::Image::from_raw(info.src.0),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::Image::from_raw(info.dst.0),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            )
        };
    }

    fn cmd_copy_buffer(
        &self,
        command_buffer: CommandBufferHandle,
        src: BufferHandle,
        dst: BufferHandle,
        regions: &[BufferCopy],
    ) {
        let regions: Vec<vk::BufferCopy> = regions
            .iter()
            .map(|region| vk::BufferCopy {
                src_offset: region.src_offset,
                dst_offset: region.dst_offset,
                size: region.size,
            })
            .collect();
        unsafe {
            self.device.cmd_copy_buffer(
                cmd(command_buffer),
                vk::Buffer::from_raw(src.0),
                vk::Buffer::from_raw(dst.0),
                &regions,
            )
        };
    }

    // --- presentation ------------------------------------------------------

    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> Result<SwapchainInfo, GraphicsError> {
        self.create_swapchain_impl(descriptor)
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) {
        self.destroy_swapchain_impl(swapchain);
    }

    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
        timeout: Duration,
    ) -> Result<AcquireOutcome, GraphicsError> {
        self.acquire_next_image_impl(swapchain, signal, timeout)
    }

    fn present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SemaphoreHandle,
    ) -> Result<PresentOutcome, GraphicsError> {
        self.present_impl(swapchain, image_index, wait)
    }
}
