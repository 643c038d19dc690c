//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a GPU. It hands out unique handles, keeps the
//! contents of every buffer in CPU memory and records every command in order,
//! so the binding logic above it can be inspected without hardware.
//!
//! Swapchain acquisition and presentation results can be scripted to drive
//! the resize path, and fences can be stalled to exercise timeouts.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::types::{
    BufferCopy, BufferDescriptor, Extent2d, ImageDescriptor, ImageFormat, SamplerDescriptor,
    ShaderStages,
};

use super::{
    AcquireOutcome, BlitInfo, BufferHandle, CommandBufferHandle, DescriptorBinding,
    DescriptorSetHandle, DescriptorSetLayoutHandle, DescriptorWrite, FenceHandle,
    FramebufferDescriptor, FramebufferHandle, GpuBackend, GraphicsPipelineDescriptor,
    ImageAllocation, ImageBarrier, ImageHandle, ImageViewHandle, PipelineHandle,
    PipelineLayoutDescriptor, PipelineLayoutHandle, PresentOutcome, RenderPassBeginInfo,
    RenderPassDescriptor, RenderPassHandle, ResolveInfo, SamplerHandle, SemaphoreHandle,
    ShaderModuleHandle, SubmitInfo, SwapchainDescriptor, SwapchainHandle, SwapchainInfo,
};

/// A command recorded into a command buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    PipelineBarrier(ImageBarrier),
    BeginRenderPass(RenderPassBeginInfo),
    EndRenderPass,
    BindPipeline(PipelineHandle),
    BindDescriptorSets {
        layout: PipelineLayoutHandle,
        first_set: u32,
        sets: Vec<DescriptorSetHandle>,
    },
    BindVertexBuffers(Vec<BufferHandle>),
    BindIndexBuffer(BufferHandle),
    PushConstants {
        layout: PipelineLayoutHandle,
        stages: ShaderStages,
        offset: u32,
        data: Vec<u8>,
    },
    DrawIndexedIndirect {
        buffer: BufferHandle,
        offset: u64,
        draw_count: u32,
        stride: u32,
    },
    BlitImage(BlitInfo),
    ResolveImage(ResolveInfo),
    CopyBuffer {
        src: BufferHandle,
        dst: BufferHandle,
        regions: Vec<BufferCopy>,
    },
}

#[derive(Debug)]
struct DummySwapchain {
    images: Vec<ImageAllocation>,
    next_image: u32,
}

#[derive(Debug, Default)]
struct DummyState {
    commands: Vec<RecordedCommand>,
    live: HashSet<u64>,
    buffers: HashMap<u64, Vec<u8>>,
    pipelines: HashMap<u64, GraphicsPipelineDescriptor>,
    render_passes: HashMap<u64, RenderPassDescriptor>,
    framebuffers: HashMap<u64, FramebufferDescriptor>,
    fences: HashMap<u64, bool>,
    swapchains: HashMap<u64, DummySwapchain>,
    acquire_script: VecDeque<AcquireOutcome>,
    present_script: VecDeque<PresentOutcome>,
    stalled_fences: bool,
    device_lost: bool,
    allocation_budget: Option<usize>,
    submit_count: usize,
    present_count: usize,
    swapchain_count: usize,
    wait_idle_count: usize,
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    next_id: AtomicU64,
    swapchain_image_count: u32,
    state: Mutex<DummyState>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            swapchain_image_count: 3,
            state: Mutex::new(DummyState::default()),
        }
    }

    /// Set the number of images every created swapchain owns.
    pub fn with_swapchain_image_count(mut self, count: u32) -> Self {
        assert!(count > 0, "a swapchain needs at least one image");
        self.swapchain_image_count = count;
        self
    }

    fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn create_live(&self) -> u64 {
        let id = self.next();
        self.state.lock().live.insert(id);
        id
    }

    fn reserve_allocation(&self) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        match state.allocation_budget.as_mut() {
            Some(0) => Err(GraphicsError::OutOfMemory),
            Some(budget) => {
                *budget -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn destroy_live(&self, id: u64, kind: &str) {
        if !self.state.lock().live.remove(&id) {
            log::warn!("DummyBackend: destroying unknown {} {}", kind, id);
        }
    }

    fn record(&self, command: RecordedCommand) {
        log::trace!("DummyBackend: {:?}", command);
        self.state.lock().commands.push(command);
    }

    // --- inspection --------------------------------------------------------

    /// All commands recorded so far, in order.
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.state.lock().commands.clone()
    }

    /// Take and clear the recorded commands.
    pub fn take_commands(&self) -> Vec<RecordedCommand> {
        std::mem::take(&mut self.state.lock().commands)
    }

    /// Number of recorded commands matching a predicate.
    pub fn count_commands(&self, predicate: impl Fn(&RecordedCommand) -> bool) -> usize {
        self.state.lock().commands.iter().filter(|c| predicate(c)).count()
    }

    /// Current contents of a buffer.
    pub fn read_buffer(&self, buffer: BufferHandle) -> Vec<u8> {
        self.state
            .lock()
            .buffers
            .get(&buffer.0)
            .cloned()
            .unwrap_or_default()
    }

    /// Descriptor a pipeline was created from.
    pub fn pipeline_descriptor(&self, pipeline: PipelineHandle) -> Option<GraphicsPipelineDescriptor> {
        self.state.lock().pipelines.get(&pipeline.0).cloned()
    }

    /// Descriptor a render pass was created from.
    pub fn render_pass_descriptor(&self, render_pass: RenderPassHandle) -> Option<RenderPassDescriptor> {
        self.state.lock().render_passes.get(&render_pass.0).cloned()
    }

    /// Descriptor a framebuffer was created from.
    pub fn framebuffer_descriptor(
        &self,
        framebuffer: FramebufferHandle,
    ) -> Option<FramebufferDescriptor> {
        self.state.lock().framebuffers.get(&framebuffer.0).cloned()
    }

    /// Number of objects created and not yet destroyed (swapchain images excluded).
    pub fn live_resource_count(&self) -> usize {
        self.state.lock().live.len()
    }

    pub fn submit_count(&self) -> usize {
        self.state.lock().submit_count
    }

    pub fn present_count(&self) -> usize {
        self.state.lock().present_count
    }

    /// Number of swapchains created over the backend's lifetime.
    pub fn swapchain_count(&self) -> usize {
        self.state.lock().swapchain_count
    }

    pub fn wait_idle_count(&self) -> usize {
        self.state.lock().wait_idle_count
    }

    // --- scripting ---------------------------------------------------------

    /// Queue the result of a future `acquire_next_image` call.
    pub fn script_acquire(&self, outcome: AcquireOutcome) {
        self.state.lock().acquire_script.push_back(outcome);
    }

    /// Queue the result of a future `present` call.
    pub fn script_present(&self, outcome: PresentOutcome) {
        self.state.lock().present_script.push_back(outcome);
    }

    /// While stalled, submissions never signal their fence.
    pub fn stall_fences(&self, stalled: bool) {
        self.state.lock().stalled_fences = stalled;
    }

    /// Make every subsequent wait report a lost device.
    pub fn lose_device(&self) {
        self.state.lock().device_lost = true;
    }

    /// Let `budget` more image and buffer allocations succeed; later ones
    /// report out of memory. `None` lifts the limit.
    pub fn limit_allocations(&self, budget: Option<usize>) {
        self.state.lock().allocation_budget = budget;
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<ImageAllocation, GraphicsError> {
        log::trace!(
            "DummyBackend: creating image {:?} ({} {:?})",
            descriptor.label,
            descriptor.extent,
            descriptor.format
        );
        self.reserve_allocation()?;
        let image = ImageHandle(self.create_live());
        let view = ImageViewHandle(self.next());
        Ok(ImageAllocation { image, view })
    }

    fn destroy_image(&self, image: ImageAllocation) {
        self.destroy_live(image.image.0, "image");
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferHandle, GraphicsError> {
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        self.reserve_allocation()?;
        let id = self.create_live();
        self.state
            .lock()
            .buffers
            .insert(id, vec![0u8; descriptor.size as usize]);
        Ok(BufferHandle(id))
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        self.destroy_live(buffer.0, "buffer");
        self.state.lock().buffers.remove(&buffer.0);
    }

    fn write_buffer(
        &self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        let contents = state.buffers.get_mut(&buffer.0).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("unknown buffer {}", buffer.0))
        })?;
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at offset {} overflows buffer of {} bytes",
                data.len(),
                offset,
                contents.len()
            )));
        }
        contents[start..end].copy_from_slice(data);
        Ok(())
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerHandle, GraphicsError> {
        log::trace!("DummyBackend: creating sampler {:?}", descriptor.label);
        Ok(SamplerHandle(self.create_live()))
    }

    fn destroy_sampler(&self, sampler: SamplerHandle) {
        self.destroy_live(sampler.0, "sampler");
    }

    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassHandle, GraphicsError> {
        let id = self.create_live();
        self.state
            .lock()
            .render_passes
            .insert(id, descriptor.clone());
        Ok(RenderPassHandle(id))
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        self.destroy_live(render_pass.0, "render pass");
        self.state.lock().render_passes.remove(&render_pass.0);
    }

    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferHandle, GraphicsError> {
        let id = self.create_live();
        self.state.lock().framebuffers.insert(id, descriptor.clone());
        Ok(FramebufferHandle(id))
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        self.destroy_live(framebuffer.0, "framebuffer");
        self.state.lock().framebuffers.remove(&framebuffer.0);
    }

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> Result<DescriptorSetLayoutHandle, GraphicsError> {
        log::trace!(
            "DummyBackend: creating descriptor set layout with {} bindings",
            bindings.len()
        );
        Ok(DescriptorSetLayoutHandle(self.create_live()))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        self.destroy_live(layout.0, "descriptor set layout");
    }

    fn allocate_descriptor_set(
        &self,
        _layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle, GraphicsError> {
        Ok(DescriptorSetHandle(self.create_live()))
    }

    fn write_descriptor_set(&self, set: DescriptorSetHandle, writes: &[DescriptorWrite]) {
        log::trace!(
            "DummyBackend: writing {} descriptors into set {}",
            writes.len(),
            set.0
        );
    }

    fn free_descriptor_set(&self, set: DescriptorSetHandle) {
        self.destroy_live(set.0, "descriptor set");
    }

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutHandle, GraphicsError> {
        log::trace!(
            "DummyBackend: creating pipeline layout with {} sets",
            descriptor.set_layouts.len()
        );
        Ok(PipelineLayoutHandle(self.create_live()))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        self.destroy_live(layout.0, "pipeline layout");
    }

    fn create_shader_module(&self, spirv: &[u32]) -> Result<ShaderModuleHandle, GraphicsError> {
        if spirv.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "empty shader bytecode".to_string(),
            ));
        }
        Ok(ShaderModuleHandle(self.create_live()))
    }

    fn destroy_shader_module(&self, module: ShaderModuleHandle) {
        self.destroy_live(module.0, "shader module");
    }

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineHandle, GraphicsError> {
        let id = self.create_live();
        self.state.lock().pipelines.insert(id, descriptor.clone());
        Ok(PipelineHandle(id))
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        self.destroy_live(pipeline.0, "pipeline");
        self.state.lock().pipelines.remove(&pipeline.0);
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle, GraphicsError> {
        let id = self.create_live();
        self.state.lock().fences.insert(id, signaled);
        Ok(FenceHandle(id))
    }

    fn wait_fence(&self, fence: FenceHandle, _timeout: Duration) -> Result<bool, GraphicsError> {
        let state = self.state.lock();
        if state.device_lost {
            return Err(GraphicsError::DeviceLost);
        }
        // Nothing executes asynchronously here, so an unsignaled fence can
        // only become signaled by a later submit: report the timeout at once.
        Ok(state.fences.get(&fence.0).copied().unwrap_or(false))
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<(), GraphicsError> {
        if let Some(signaled) = self.state.lock().fences.get_mut(&fence.0) {
            *signaled = false;
        }
        Ok(())
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        self.destroy_live(fence.0, "fence");
        self.state.lock().fences.remove(&fence.0);
    }

    fn create_semaphore(&self) -> Result<SemaphoreHandle, GraphicsError> {
        Ok(SemaphoreHandle(self.create_live()))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        self.destroy_live(semaphore.0, "semaphore");
    }

    fn wait_idle(&self) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        if state.device_lost {
            return Err(GraphicsError::DeviceLost);
        }
        state.wait_idle_count += 1;
        Ok(())
    }

    fn allocate_command_buffer(&self) -> Result<CommandBufferHandle, GraphicsError> {
        Ok(CommandBufferHandle(self.create_live()))
    }

    fn free_command_buffer(&self, command_buffer: CommandBufferHandle) {
        self.destroy_live(command_buffer.0, "command buffer");
    }

    fn begin_command_buffer(
        &self,
        command_buffer: CommandBufferHandle,
        _one_time_submit: bool,
    ) -> Result<(), GraphicsError> {
        log::trace!("DummyBackend: begin command buffer {}", command_buffer.0);
        Ok(())
    }

    fn end_command_buffer(
        &self,
        command_buffer: CommandBufferHandle,
    ) -> Result<(), GraphicsError> {
        log::trace!("DummyBackend: end command buffer {}", command_buffer.0);
        Ok(())
    }

    fn submit(&self, info: &SubmitInfo) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        if state.device_lost {
            return Err(GraphicsError::DeviceLost);
        }
        state.submit_count += 1;
        if let Some(fence) = info.fence
            && !state.stalled_fences
        {
            state.fences.insert(fence.0, true);
        }
        Ok(())
    }

    fn cmd_pipeline_barrier(&self, _cmd: CommandBufferHandle, barrier: &ImageBarrier) {
        self.record(RecordedCommand::PipelineBarrier(*barrier));
    }

    fn cmd_begin_render_pass(&self, _cmd: CommandBufferHandle, info: &RenderPassBeginInfo) {
        self.record(RecordedCommand::BeginRenderPass(info.clone()));
    }

    fn cmd_end_render_pass(&self, _cmd: CommandBufferHandle) {
        self.record(RecordedCommand::EndRenderPass);
    }

    fn cmd_bind_pipeline(&self, _cmd: CommandBufferHandle, pipeline: PipelineHandle) {
        self.record(RecordedCommand::BindPipeline(pipeline));
    }

    fn cmd_bind_descriptor_sets(
        &self,
        _cmd: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        first_set: u32,
        sets: &[DescriptorSetHandle],
    ) {
        self.record(RecordedCommand::BindDescriptorSets {
            layout,
            first_set,
            sets: sets.to_vec(),
        });
    }

    fn cmd_bind_vertex_buffers(&self, _cmd: CommandBufferHandle, buffers: &[BufferHandle]) {
        self.record(RecordedCommand::BindVertexBuffers(buffers.to_vec()));
    }

    fn cmd_bind_index_buffer(&self, _cmd: CommandBufferHandle, buffer: BufferHandle) {
        self.record(RecordedCommand::BindIndexBuffer(buffer));
    }

    fn cmd_push_constants(
        &self,
        _cmd: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) {
        self.record(RecordedCommand::PushConstants {
            layout,
            stages,
            offset,
            data: data.to_vec(),
        });
    }

    fn cmd_draw_indexed_indirect(
        &self,
        _cmd: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        self.record(RecordedCommand::DrawIndexedIndirect {
            buffer,
            offset,
            draw_count,
            stride,
        });
    }

    fn cmd_blit_image(&self, _cmd: CommandBufferHandle, info: &BlitInfo) {
        self.record(RecordedCommand::BlitImage(*info));
    }

    fn cmd_resolve_image(&self, _cmd: CommandBufferHandle, info: &ResolveInfo) {
        self.record(RecordedCommand::ResolveImage(*info));
    }

    fn cmd_copy_buffer(
        &self,
        _cmd: CommandBufferHandle,
        src: BufferHandle,
        dst: BufferHandle,
        regions: &[BufferCopy],
    ) {
        // Copies take effect immediately so uploads can be read back.
        {
            let mut state = self.state.lock();
            for region in regions {
                let range = region.src_offset as usize..(region.src_offset + region.size) as usize;
                let bytes = state
                    .buffers
                    .get(&src.0)
                    .and_then(|contents| contents.get(range).map(<[u8]>::to_vec));
                if let Some(bytes) = bytes
                    && let Some(target) = state.buffers.get_mut(&dst.0)
                {
                    let start = region.dst_offset as usize;
                    if let Some(slot) = target.get_mut(start..start + bytes.len()) {
                        slot.copy_from_slice(&bytes);
                    }
                }
            }
        }
        self.record(RecordedCommand::CopyBuffer {
            src,
            dst,
            regions: regions.to_vec(),
        });
    }

    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> Result<SwapchainInfo, GraphicsError> {
        if descriptor.extent.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot create a {} swapchain",
                descriptor.extent
            )));
        }
        let handle = SwapchainHandle(self.create_live());
        let images: Vec<ImageAllocation> = (0..self.swapchain_image_count)
            .map(|_| ImageAllocation {
                image: ImageHandle(self.next()),
                view: ImageViewHandle(self.next()),
            })
            .collect();

        let mut state = self.state.lock();
        state.swapchain_count += 1;
        state.swapchains.insert(
            handle.0,
            DummySwapchain {
                images: images.clone(),
                next_image: 0,
            },
        );

        Ok(SwapchainInfo {
            handle,
            format: ImageFormat::Bgra8Unorm,
            extent: Extent2d::new(descriptor.extent.width, descriptor.extent.height),
            images,
        })
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) {
        self.destroy_live(swapchain.0, "swapchain");
        self.state.lock().swapchains.remove(&swapchain.0);
    }

    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        _signal: SemaphoreHandle,
        _timeout: Duration,
    ) -> Result<AcquireOutcome, GraphicsError> {
        let mut state = self.state.lock();
        if state.device_lost {
            return Err(GraphicsError::DeviceLost);
        }
        if let Some(outcome) = state.acquire_script.pop_front() {
            return Ok(outcome);
        }
        let chain = state.swapchains.get_mut(&swapchain.0).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("unknown swapchain {}", swapchain.0))
        })?;
        let image_index = chain.next_image;
        chain.next_image = (chain.next_image + 1) % chain.images.len() as u32;
        Ok(AcquireOutcome::Acquired {
            image_index,
            suboptimal: false,
        })
    }

    fn present(
        &self,
        _swapchain: SwapchainHandle,
        image_index: u32,
        _wait: SemaphoreHandle,
    ) -> Result<PresentOutcome, GraphicsError> {
        let mut state = self.state.lock();
        if state.device_lost {
            return Err(GraphicsError::DeviceLost);
        }
        state.present_count += 1;
        log::trace!("DummyBackend: present image {}", image_index);
        Ok(state
            .present_script
            .pop_front()
            .unwrap_or(PresentOutcome::Presented))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferUsage, MemoryLocation, PresentMode};

    #[test]
    fn test_buffer_write_and_copy() {
        let backend = DummyBackend::new();
        let desc = BufferDescriptor::new(16, BufferUsage::TRANSFER_SRC, MemoryLocation::CpuToGpu);
        let src = backend.create_buffer(&desc).unwrap();
        let dst = backend.create_buffer(&desc).unwrap();

        backend.write_buffer(src, 4, &[1, 2, 3, 4]).unwrap();
        backend.cmd_copy_buffer(
            CommandBufferHandle(99),
            src,
            dst,
            &[BufferCopy {
                src_offset: 4,
                dst_offset: 8,
                size: 4,
            }],
        );

        assert_eq!(&backend.read_buffer(dst)[8..12], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_write_out_of_bounds() {
        let backend = DummyBackend::new();
        let desc = BufferDescriptor::new(4, BufferUsage::UNIFORM, MemoryLocation::CpuToGpu);
        let buffer = backend.create_buffer(&desc).unwrap();
        assert!(backend.write_buffer(buffer, 2, &[0; 4]).is_err());
    }

    #[test]
    fn test_fence_signaled_on_submit() {
        let backend = DummyBackend::new();
        let fence = backend.create_fence(false).unwrap();
        let cmd = backend.allocate_command_buffer().unwrap();
        assert!(!backend.wait_fence(fence, Duration::ZERO).unwrap());

        backend
            .submit(&SubmitInfo {
                command_buffer: cmd,
                wait: None,
                signal: None,
                fence: Some(fence),
            })
            .unwrap();
        assert!(backend.wait_fence(fence, Duration::ZERO).unwrap());
    }

    #[test]
    fn test_acquire_cycles_and_scripts() {
        let backend = DummyBackend::new().with_swapchain_image_count(2);
        let info = backend
            .create_swapchain(&SwapchainDescriptor {
                extent: Extent2d::new(640, 480),
                present_mode: PresentMode::Fifo,
                old_swapchain: None,
            })
            .unwrap();
        let semaphore = backend.create_semaphore().unwrap();

        backend.script_acquire(AcquireOutcome::OutOfDate);
        let acquire = || {
            backend
                .acquire_next_image(info.handle, semaphore, Duration::from_millis(1))
                .unwrap()
        };
        assert_eq!(acquire(), AcquireOutcome::OutOfDate);
        assert!(matches!(acquire(), AcquireOutcome::Acquired { image_index: 0, .. }));
        assert!(matches!(acquire(), AcquireOutcome::Acquired { image_index: 1, .. }));
        assert!(matches!(acquire(), AcquireOutcome::Acquired { image_index: 0, .. }));
    }

    #[test]
    fn test_lost_device() {
        let backend = DummyBackend::new();
        let fence = backend.create_fence(true).unwrap();
        backend.lose_device();
        assert_eq!(
            backend.wait_fence(fence, Duration::ZERO),
            Err(GraphicsError::DeviceLost)
        );
    }

    #[test]
    fn test_allocation_limit() {
        let backend = DummyBackend::new();
        let desc = BufferDescriptor::new(4, BufferUsage::UNIFORM, MemoryLocation::CpuToGpu);
        backend.limit_allocations(Some(1));
        assert!(backend.create_buffer(&desc).is_ok());
        assert_eq!(backend.create_buffer(&desc), Err(GraphicsError::OutOfMemory));
        assert_eq!(backend.live_resource_count(), 1);

        backend.limit_allocations(None);
        assert!(backend.create_buffer(&desc).is_ok());
    }

    #[test]
    fn test_live_resource_tracking() {
        let backend = DummyBackend::new();
        let sampler = backend
            .create_sampler(&SamplerDescriptor::default())
            .unwrap();
        assert_eq!(backend.live_resource_count(), 1);
        backend.destroy_sampler(sampler);
        assert_eq!(backend.live_resource_count(), 0);
    }
}
