//! The graphics context: owner of every registry and of the frame loop.
//!
//! # Declaration
//!
//! Resources are declared once, by name, leaves first:
//!
//! ```text
//! images / buffers / samplers ─► resource groups ─► resource bundles ─┐
//!                              └► render targets ──────────────────────┼─► render effects
//!                                 render modes / shaders ──────────────┘
//! ```
//!
//! # Frame loop
//!
//! ```ignore
//! ctx.begin_frame()?;
//! ctx.push_drawable(material, drawable, &constants);
//! ctx.build_commands(&camera)?;
//! ctx.draw_materials();
//! ctx.begin("post");
//! ctx.end_everything();
//! ctx.end_frame()?;
//! ```
//!
//! A swapchain that is out of date at acquire or present, or a window resize
//! reported through [`GraphicsContext::notify_resized`], runs the resize path:
//! wait for the device to go idle, recreate the swapchain, then every
//! surface-sized image, the render targets using them and the effects drawing
//! into those targets.

use std::sync::Arc;
use std::time::Duration;

use prism_core::Camera;
use prism_core::math::{Vec2, Vec3};

use crate::backend::{AcquireOutcome, CommandBufferHandle, GpuBackend, PresentOutcome};
use crate::config::GraphicsConfig;
use crate::effect::{
    ActiveEffect, EffectSources, FrameRecorder, PushConstantRegistry, RenderEffectInfo,
    RenderEffectRegistry, RenderModeInfo, RenderModeRegistry, RenderTargetInfo,
    RenderTargetRegistry, ResourceBundleInfo, ResourceBundleRegistry, ResourceGroupInfo,
    ResourceGroupRegistry,
};
use crate::error::GraphicsError;
use crate::materials::{Drawable, MaterialBatches, MaterialId, MaterialStats, MaterialTypeInfo, Model};
use crate::mesh::{MeshInstance, MeshRegistry, ModelId, ModelInstance};
use crate::pipeline::FramePipeline;
use crate::resize::ResizeTracker;
use crate::resources::{
    BufferInfo, BufferRegistry, FrameSlot, ImageInfo, ImageRegistry, ImageUsage, NameTable,
    SamplerInfo, SamplerRegistry,
};
use crate::shader::ShaderLibrary;
use crate::swapchain::Swapchain;
use crate::types::{Extent2d, FilterMode};

/// Swapchain recreations attempted by one `begin_frame` before giving up.
const MAX_ACQUIRE_ATTEMPTS: usize = 3;

/// Owner of all GPU resources of one window.
pub struct GraphicsContext {
    backend: Arc<dyn GpuBackend>,
    config: GraphicsConfig,

    names: NameTable,
    images: ImageRegistry,
    buffers: BufferRegistry,
    samplers: SamplerRegistry,
    groups: ResourceGroupRegistry,
    push_constants: PushConstantRegistry,
    targets: RenderTargetRegistry,
    bundles: ResourceBundleRegistry,
    modes: RenderModeRegistry,
    shaders: ShaderLibrary,
    effects: RenderEffectRegistry,

    meshes: MeshRegistry,
    materials: MaterialBatches,

    frames: FramePipeline,
    swapchain: Swapchain,
    resize: ResizeTracker,
    active: ActiveEffect,

    /// Swapchain image acquired by `begin_frame`, `None` outside a frame.
    image_index: Option<u32>,
    destroyed: bool,
}

impl GraphicsContext {
    /// Create the swapchain, frame slots, shared mesh buffers and indirect
    /// command buffers for a window of `window_extent`.
    pub fn new(
        backend: Arc<dyn GpuBackend>,
        config: GraphicsConfig,
        window_extent: Extent2d,
    ) -> Result<Self, GraphicsError> {
        let b = &*backend;
        let frames_in_flight = config.frames_in_flight;

        let mut names = NameTable::new();
        let mut images = ImageRegistry::new();
        let mut buffers = BufferRegistry::new();

        let swapchain = Swapchain::new(b, window_extent, config.present_mode)?;
        swapchain.register(&mut images, &mut names, &config.swapchain_name);
        let frames = FramePipeline::new(b, frames_in_flight, config.fence_timeout())?;
        let meshes = MeshRegistry::new(
            b,
            &mut names,
            &mut buffers,
            config.vertex_capacity,
            config.index_capacity,
        )?;
        let materials = MaterialBatches::new(
            b,
            &mut names,
            &mut buffers,
            config.indirect_command_capacity,
            frames_in_flight,
        )?;

        log::info!(
            "Graphics context created on {} ({} frames in flight, {})",
            b.name(),
            frames_in_flight,
            swapchain.extent()
        );

        Ok(Self {
            resize: ResizeTracker::new(swapchain.extent()),
            active: ActiveEffect::new(config.clear_color, config.clear_depth),
            backend,
            config,
            names,
            images,
            buffers,
            samplers: SamplerRegistry::new(),
            groups: ResourceGroupRegistry::new(),
            push_constants: PushConstantRegistry::new(),
            targets: RenderTargetRegistry::new(),
            bundles: ResourceBundleRegistry::new(),
            modes: RenderModeRegistry::new(),
            shaders: ShaderLibrary::new(),
            effects: RenderEffectRegistry::new(),
            meshes,
            materials,
            frames,
            swapchain,
            image_index: None,
            destroyed: false,
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    pub fn config(&self) -> &GraphicsConfig {
        &self.config
    }

    /// Current frame slot, `frame_count % frames_in_flight`.
    pub fn frame_index(&self) -> usize {
        self.frames.frame_index()
    }

    /// Number of frames ended so far.
    pub fn frame_count(&self) -> u64 {
        self.frames.frame_count()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames.frames_in_flight()
    }

    /// Swapchain image of the frame being recorded.
    pub fn image_index(&self) -> Option<u32> {
        self.image_index
    }

    /// Resolution of the swapchain and of every surface-sized image.
    pub fn surface_extent(&self) -> Extent2d {
        self.swapchain.extent()
    }

    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn images(&self) -> &ImageRegistry {
        &self.images
    }

    pub fn buffers(&self) -> &BufferRegistry {
        &self.buffers
    }

    pub fn samplers(&self) -> &SamplerRegistry {
        &self.samplers
    }

    pub fn render_targets(&self) -> &RenderTargetRegistry {
        &self.targets
    }

    pub fn resource_bundles(&self) -> &ResourceBundleRegistry {
        &self.bundles
    }

    pub fn render_effects(&self) -> &RenderEffectRegistry {
        &self.effects
    }

    pub fn meshes(&self) -> &MeshRegistry {
        &self.meshes
    }

    pub fn materials(&self) -> &MaterialBatches {
        &self.materials
    }

    /// Material totals of the previous frame.
    pub fn material_stats(&self) -> MaterialStats {
        self.materials.stats()
    }

    /// Name of the effect whose state is bound in the command buffer.
    pub fn active_effect(&self) -> Option<&str> {
        self.active.current()
    }

    /// Command buffer of the current frame slot.
    pub fn command_buffer(&self) -> CommandBufferHandle {
        self.frames.current().command_buffer
    }

    // ------------------------------------------------------------------------
    // Declaration
    // ------------------------------------------------------------------------

    pub fn create_image(&mut self, info: &ImageInfo, name: &str) -> Result<(), GraphicsError> {
        let surface = self.swapchain.extent();
        self.images
            .create_one(&*self.backend, &mut self.names, info, name, surface)
    }

    /// Append an image to the array `name`, returning its index.
    pub fn create_image_array(
        &mut self,
        info: &ImageInfo,
        name: &str,
    ) -> Result<usize, GraphicsError> {
        let surface = self.swapchain.extent();
        self.images
            .create_array(&*self.backend, &mut self.names, info, name, surface)
    }

    pub fn create_image_per_frame(
        &mut self,
        info: &ImageInfo,
        name: &str,
    ) -> Result<(), GraphicsError> {
        let surface = self.swapchain.extent();
        let frames = self.frames_in_flight();
        self.images.create_one_per_frame(
            &*self.backend,
            &mut self.names,
            info,
            name,
            surface,
            frames,
        )
    }

    pub fn create_buffer(&mut self, info: &BufferInfo, name: &str) -> Result<(), GraphicsError> {
        self.buffers
            .create_one(&*self.backend, &mut self.names, info, name)
    }

    /// Append a buffer to the array `name`, returning its index.
    pub fn create_buffer_array(
        &mut self,
        info: &BufferInfo,
        name: &str,
    ) -> Result<usize, GraphicsError> {
        self.buffers
            .create_array(&*self.backend, &mut self.names, info, name)
    }

    pub fn create_buffer_per_frame(
        &mut self,
        info: &BufferInfo,
        name: &str,
    ) -> Result<(), GraphicsError> {
        let frames = self.frames_in_flight();
        self.buffers
            .create_one_per_frame(&*self.backend, &mut self.names, info, name, frames)
    }

    pub fn create_sampler(&mut self, info: &SamplerInfo, name: &str) -> Result<(), GraphicsError> {
        self.samplers
            .create_one(&*self.backend, &mut self.names, info, name)
    }

    /// Append a sampler to the array `name`, returning its index.
    pub fn create_sampler_array(
        &mut self,
        info: &SamplerInfo,
        name: &str,
    ) -> Result<usize, GraphicsError> {
        self.samplers
            .create_array(&*self.backend, &mut self.names, info, name)
    }

    pub fn create_sampler_per_frame(
        &mut self,
        info: &SamplerInfo,
        name: &str,
    ) -> Result<(), GraphicsError> {
        let frames = self.frames_in_flight();
        self.samplers
            .create_one_per_frame(&*self.backend, &mut self.names, info, name, frames)
    }

    /// Register a push constant block of `size` bytes.
    pub fn create_push_constant(&mut self, size: u32, name: &str) {
        self.push_constants.create(size, name);
    }

    pub fn create_resource_group(
        &mut self,
        info: &ResourceGroupInfo,
        name: &str,
    ) -> Result<(), GraphicsError> {
        let frames = self.frames_in_flight();
        self.groups.create(
            &*self.backend,
            &self.images,
            &self.buffers,
            &self.samplers,
            info,
            name,
            frames,
        )
    }

    pub fn create_resource_bundle(
        &mut self,
        info: &ResourceBundleInfo,
        name: &str,
    ) -> Result<(), GraphicsError> {
        let frames = self.frames_in_flight();
        self.bundles.create(
            &*self.backend,
            &self.groups,
            &self.push_constants,
            info,
            name,
            frames,
        )
    }

    pub fn create_render_mode(&mut self, info: &RenderModeInfo, name: &str) {
        self.modes.create(info, name);
    }

    pub fn create_render_target(
        &mut self,
        info: &RenderTargetInfo,
        name: &str,
    ) -> Result<(), GraphicsError> {
        let frames = self.frames_in_flight();
        self.targets
            .create(&*self.backend, &self.images, info, name, frames)
    }

    pub fn create_render_effect(
        &mut self,
        info: &RenderEffectInfo,
        name: &str,
    ) -> Result<(), GraphicsError> {
        let sources = EffectSources {
            targets: &self.targets,
            bundles: &self.bundles,
            modes: &self.modes,
            shaders: &self.shaders,
            buffers: &self.buffers,
        };
        self.effects.create(&*self.backend, sources, info, name)
    }

    /// Register a shader module from SPIR-V words.
    pub fn load_shader(&mut self, name: &str, spirv: &[u32]) -> Result<(), GraphicsError> {
        self.shaders.load(&*self.backend, name, spirv).map(|_| ())
    }

    /// Register a shader module from the bytes of a SPIR-V file.
    pub fn load_shader_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), GraphicsError> {
        self.shaders
            .load_bytes(&*self.backend, name, bytes)
            .map(|_| ())
    }

    /// Write into a host-visible buffer. Per-frame buffers resolve to the
    /// current frame's instance.
    pub fn write_buffer(
        &self,
        name: &str,
        slot: FrameSlot,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        self.buffers.write(
            &*self.backend,
            name,
            slot,
            self.frame_index(),
            offset,
            data,
        )
    }

    /// Upload into a device-local buffer through a staging copy.
    pub fn upload_buffer(
        &self,
        name: &str,
        slot: FrameSlot,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        self.buffers.upload(
            &*self.backend,
            name,
            slot,
            self.frame_index(),
            offset,
            data,
        )
    }

    // ------------------------------------------------------------------------
    // Meshes and materials
    // ------------------------------------------------------------------------

    pub fn create_mesh(
        &mut self,
        positions: &[Vec3],
        normals: &[Vec3],
        uvs: &[Vec2],
        indices: &[u32],
    ) -> Result<MeshInstance, GraphicsError> {
        let mesh = self.meshes.create_mesh(
            &*self.backend,
            &mut self.buffers,
            positions,
            normals,
            uvs,
            indices,
        )?;
        // Grown mesh buffers have new handles.
        self.groups
            .refresh(&*self.backend, &self.images, &self.buffers, &self.samplers);
        Ok(mesh)
    }

    pub fn create_model_instance(&mut self, instance: ModelInstance) -> ModelId {
        self.meshes.create_model_instance(instance)
    }

    pub fn create_model(&self, id: ModelId, scale: Vec3) -> Model {
        self.meshes.create_model(id, scale)
    }

    pub fn add_material_type(&mut self, info: &MaterialTypeInfo) -> Result<MaterialId, GraphicsError> {
        self.materials
            .add_material_type(&*self.backend, &mut self.names, &mut self.buffers, info)
    }

    pub fn add_material_instance(&mut self, id: MaterialId, data: &[u8]) -> usize {
        self.materials.add_material_instance(id, data)
    }

    pub fn set_world_data(&mut self, id: MaterialId, data: &[u8]) {
        self.materials.set_world_data(id, data);
    }

    pub fn push_drawable(&mut self, id: MaterialId, drawable: Drawable, material: &[u8]) {
        self.materials.push_drawable(id, drawable, material);
    }

    /// Queue a drawable using a material instance stored with
    /// [`add_material_instance`](Self::add_material_instance).
    pub fn push_instance(&mut self, id: MaterialId, drawable: Drawable, instance: usize) {
        self.materials.push_instance(id, drawable, instance);
    }

    /// Cull the queued drawables against `camera` and write this frame's
    /// indirect commands.
    pub fn build_commands(&mut self, camera: &Camera) -> Result<(), GraphicsError> {
        let aspect = self.swapchain.extent().aspect();
        let frame = self.frame_index();
        self.materials.build_commands(
            &*self.backend,
            &self.buffers,
            &self.meshes,
            camera,
            aspect,
            frame,
        )
    }

    /// Draw every material batch built by [`build_commands`](Self::build_commands).
    pub fn draw_materials(&mut self) {
        self.assert_recording("draw_materials");
        let mut recorder = FrameRecorder {
            backend: &*self.backend,
            cmd: self.frames.current().command_buffer,
            frame_index: self.frames.frame_index(),
            images: &mut self.images,
            buffers: &self.buffers,
        };
        self.materials
            .draw(&mut self.active, &mut recorder, &self.effects);
    }

    // ------------------------------------------------------------------------
    // Frame loop
    // ------------------------------------------------------------------------

    fn assert_recording(&self, operation: &str) {
        assert!(
            self.image_index.is_some(),
            "{operation} called outside of begin_frame/end_frame"
        );
    }

    /// Wait for the frame slot, acquire a swapchain image and start recording.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::Timeout`] if the slot or the swapchain stays busy past
    /// the configured timeouts, [`GraphicsError::DeviceLost`] if the device is
    /// gone and [`GraphicsError::SurfaceOutdated`] if the swapchain stays out
    /// of date after recreation (for example while the window is minimized).
    pub fn begin_frame(&mut self) -> Result<(), GraphicsError> {
        assert!(
            self.image_index.is_none(),
            "begin_frame called twice without end_frame"
        );
        prism_core::profile_scope!("begin_frame");

        let image_index = self.acquire_frame().inspect_err(|e| {
            if e.is_transient() {
                log::warn!("Frame skipped: {}", e);
            } else {
                log::error!("Frame acquisition failed: {}", e);
            }
        })?;

        self.frames.begin_recording(&*self.backend)?;
        self.active.reset();
        self.materials.reset();
        crate::profiling::plot_material_stats(&self.materials.stats());
        self.image_index = Some(image_index);
        Ok(())
    }

    fn acquire_frame(&mut self) -> Result<u32, GraphicsError> {
        self.frames.wait_for_slot(&*self.backend)?;

        let image_available = self.frames.current().image_available;
        let timeout = self.config.acquire_timeout();
        let mut acquired = None;
        for _ in 0..MAX_ACQUIRE_ATTEMPTS {
            match self
                .swapchain
                .acquire(&*self.backend, image_available, timeout)?
            {
                AcquireOutcome::Acquired {
                    image_index,
                    suboptimal,
                } => {
                    if suboptimal {
                        log::debug!("Acquired suboptimal swapchain image {}", image_index);
                    }
                    acquired = Some(image_index);
                    break;
                }
                AcquireOutcome::OutOfDate => {
                    log::warn!("Swapchain out of date at acquire");
                    self.resize.mark_stale();
                    self.apply_pending_resize()?;
                }
                AcquireOutcome::Timeout => {
                    return Err(GraphicsError::Timeout(format!(
                        "swapchain image acquisition after {} ms",
                        timeout.as_millis()
                    )));
                }
            }
        }
        acquired.ok_or(GraphicsError::SurfaceOutdated)
    }

    /// Switch to the render effect `name`, recording only the render pass,
    /// pipeline and buffer changes it needs.
    pub fn begin(&mut self, name: &str) {
        self.assert_recording("begin");
        let mut recorder = FrameRecorder {
            backend: &*self.backend,
            cmd: self.frames.current().command_buffer,
            frame_index: self.frames.frame_index(),
            images: &mut self.images,
            buffers: &self.buffers,
        };
        self.active.begin(&mut recorder, &self.effects, name);
    }

    /// Record a push constant update for the active effect.
    pub fn push_constants(&self, data: &[u8]) {
        self.assert_recording("push_constants");
        self.active
            .push_constants(&*self.backend, self.command_buffer(), data);
    }

    /// Record a transition of an image to `usage`.
    pub fn transition_image(&mut self, name: &str, slot: FrameSlot, usage: ImageUsage) {
        self.assert_recording("transition_image");
        let cmd = self.command_buffer();
        let frame = self.frame_index();
        self.images
            .transition(&*self.backend, cmd, name, slot, frame, usage);
    }

    /// Record a filtered blit between two whole images.
    pub fn blit_image(&mut self, dst: (&str, FrameSlot), src: (&str, FrameSlot), filter: FilterMode) {
        self.assert_recording("blit_image");
        let cmd = self.command_buffer();
        let frame = self.frame_index();
        self.images
            .blit(&*self.backend, cmd, frame, dst, src, filter);
    }

    /// Record a multisample resolve between images of equal resolution.
    pub fn resolve_image(&mut self, dst: (&str, FrameSlot), src: (&str, FrameSlot)) {
        self.assert_recording("resolve_image");
        let cmd = self.command_buffer();
        let frame = self.frame_index();
        self.images.resolve(&*self.backend, cmd, frame, dst, src);
    }

    /// End the open render pass, blit the primary color target onto the
    /// acquired swapchain image and make it presentable.
    pub fn end_everything(&mut self) {
        let Some(image_index) = self.image_index else {
            panic!("end_everything called outside of begin_frame/end_frame");
        };
        let mut recorder = FrameRecorder {
            backend: &*self.backend,
            cmd: self.frames.current().command_buffer,
            frame_index: self.frames.frame_index(),
            images: &mut self.images,
            buffers: &self.buffers,
        };
        self.active.end_everything(
            &mut recorder,
            &self.effects,
            &self.config.primary_color_target,
            &self.config.swapchain_name,
            image_index,
        );
    }

    /// Submit the frame and present it, resizing if the swapchain went stale,
    /// then advance to the next frame slot.
    ///
    /// # Panics
    ///
    /// Panics unless [`end_everything`](Self::end_everything) ran after the
    /// last [`begin`](Self::begin) of the frame.
    pub fn end_frame(&mut self) -> Result<(), GraphicsError> {
        let Some(image_index) = self.image_index else {
            panic!("end_frame called without begin_frame");
        };
        assert!(
            self.active.is_presentable(),
            "end_frame called before end_everything: the swapchain image is not presentable \
             (active effect: {:?})",
            self.active.current()
        );
        self.image_index = None;
        prism_core::profile_scope!("end_frame");

        self.frames.submit(&*self.backend)?;
        let render_finished = self.frames.current().render_finished;
        match self
            .swapchain
            .present(&*self.backend, image_index, render_finished)?
        {
            PresentOutcome::Presented => {}
            PresentOutcome::Suboptimal | PresentOutcome::OutOfDate => {
                log::warn!("Swapchain stale at present");
                self.resize.mark_stale();
            }
        }
        self.apply_pending_resize()?;

        self.frames.advance();
        prism_core::frame_mark!();
        Ok(())
    }

    /// Report a new window size. The resize runs at the end of the current
    /// frame, or is deferred while the window has no area.
    pub fn notify_resized(&mut self, width: u32, height: u32) {
        self.resize.notify(width, height);
    }

    fn apply_pending_resize(&mut self) -> Result<(), GraphicsError> {
        match self.resize.take_pending() {
            Some(extent) => self.resize(extent),
            None => Ok(()),
        }
    }

    /// Recreate the swapchain and everything sized after it.
    ///
    /// Waits for the device to go idle first.
    pub fn resize(&mut self, extent: Extent2d) -> Result<(), GraphicsError> {
        if extent.is_empty() {
            log::debug!("Ignoring resize to {}", extent);
            return Ok(());
        }
        prism_core::profile_scope!("resize");
        let backend = &*self.backend;
        backend.wait_idle()?;

        let targets = self.targets.surface_dependent(&self.images);
        let effects = self.effects.using_targets(&targets);

        self.swapchain.recreate(backend, extent)?;
        let surface = self.swapchain.extent();
        self.images
            .unregister_existing(&mut self.names, &self.config.swapchain_name);
        self.swapchain
            .register(&mut self.images, &mut self.names, &self.config.swapchain_name);

        for image in self.images.surface_sized() {
            self.images.recreate(backend, &image, surface)?;
        }
        let frames = self.frames.frames_in_flight();
        for target in &targets {
            self.targets.recreate(backend, &self.images, target, frames)?;
        }
        let sources = EffectSources {
            targets: &self.targets,
            bundles: &self.bundles,
            modes: &self.modes,
            shaders: &self.shaders,
            buffers: &self.buffers,
        };
        for effect in &effects {
            self.effects.recreate(backend, sources, effect)?;
        }
        self.groups
            .refresh(backend, &self.images, &self.buffers, &self.samplers);

        self.resize.applied(surface);
        log::info!(
            "Resized to {} ({} targets, {} effects rebuilt)",
            surface,
            targets.len(),
            effects.len()
        );
        Ok(())
    }

    /// Block until the device has finished all submitted work.
    pub fn wait_idle(&self) -> Result<(), GraphicsError> {
        self.backend.wait_idle()
    }

    /// Wait for every frame slot with one overall timeout. Returns `false`
    /// if the timeout elapsed first.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> Result<bool, GraphicsError> {
        self.frames.wait_idle_timeout(&*self.backend, timeout)
    }

    /// Check if a frame slot's previous work has finished (non-blocking).
    pub fn is_slot_ready(&self, slot: usize) -> Result<bool, GraphicsError> {
        self.frames.is_slot_ready(&*self.backend, slot)
    }

    /// Destroy every resource in reverse dependency order.
    ///
    /// Called by `Drop` if not called explicitly.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let backend = &*self.backend;
        if let Err(e) = backend.wait_idle() {
            log::warn!("wait_idle failed during destruction: {}", e);
        }

        self.effects.destroy(backend);
        self.shaders.destroy(backend);
        self.bundles.destroy(backend);
        self.groups.destroy(backend);
        self.targets.destroy(backend);
        self.samplers.destroy(backend, &mut self.names);
        self.buffers.destroy(backend, &mut self.names);
        self.images.destroy(backend, &mut self.names);
        self.frames.destroy(backend);
        self.swapchain.destroy(backend);
        log::info!("Graphics context destroyed");
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for GraphicsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("backend", &self.backend.name())
            .field("frame_index", &self.frame_index())
            .field("frame_count", &self.frame_count())
            .field("surface_extent", &self.surface_extent())
            .finish_non_exhaustive()
    }
}
