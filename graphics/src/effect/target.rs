//! Render targets: a render pass plus one framebuffer per frame in flight.

use std::collections::HashMap;

use crate::backend::{
    AttachmentDescriptor, FramebufferDescriptor, FramebufferHandle, GpuBackend,
    RenderPassDescriptor, RenderPassHandle,
};
use crate::error::GraphicsError;
use crate::resources::{Cardinality, FrameSlot, ImageRegistry, ImageSize, ImageUsage};
use crate::types::{
    AccessFlags, Extent2d, ImageLayout, ImageUsageFlags, LoadOp, PipelineStages, SampleCount,
    StoreOp,
};

/// How one attachment is loaded, stored and used after the render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentUsage {
    pub load: LoadOp,
    pub store: StoreOp,
    /// Usage the image is in once the render pass ends.
    pub next_usage: ImageUsage,
}

impl AttachmentUsage {
    pub const fn new(load: LoadOp, store: StoreOp, next_usage: ImageUsage) -> Self {
        Self {
            load,
            store,
            next_usage,
        }
    }

    /// Clear on load, store the result.
    pub const fn clear_store(next_usage: ImageUsage) -> Self {
        Self::new(LoadOp::Clear, StoreOp::Store, next_usage)
    }

    /// Keep the previous contents, store the result.
    pub const fn load_store(next_usage: ImageUsage) -> Self {
        Self::new(LoadOp::Load, StoreOp::Store, next_usage)
    }

    fn attachment(&self, attachment_layout: ImageLayout) -> (ImageLayout, ImageLayout) {
        let initial = match self.load {
            LoadOp::Load => attachment_layout,
            LoadOp::Clear | LoadOp::DontLoad => ImageLayout::Undefined,
        };
        (initial, self.next_usage.layout())
    }
}

/// Declaration of a render target.
///
/// Every entry but the last is a color attachment; the last one is the depth
/// attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RenderTargetInfo {
    pub image_resources: Vec<String>,
    pub usage_modes: Vec<AttachmentUsage>,
}

impl RenderTargetInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attachment.
    pub fn with_attachment(mut self, image: impl Into<String>, usage: AttachmentUsage) -> Self {
        self.image_resources.push(image.into());
        self.usage_modes.push(usage);
        self
    }

    pub fn color_count(&self) -> usize {
        self.image_resources.len().saturating_sub(1)
    }

    /// Name of the depth image.
    pub fn depth_image(&self) -> Option<&str> {
        self.image_resources.last().map(String::as_str)
    }

    /// True if any attachment is resized with the surface.
    pub fn tracks_surface(&self, images: &ImageRegistry) -> bool {
        self.image_resources
            .iter()
            .any(|name| images.info(name).size == ImageSize::Surface)
    }

    /// Check the attachment invariants.
    ///
    /// # Panics
    ///
    /// Panics, naming the offending images, if the list is empty, the number
    /// of usage modes differs from the number of images, a depth image is not
    /// last, the last image is not a depth image, an image lacks the
    /// render-target usage flag, or resolutions or sample counts differ.
    pub fn validate(&self, images: &ImageRegistry, name: &str) {
        let count = self.image_resources.len();
        assert!(
            count > 0,
            "Render target '{name}': 'image_resources' must not be empty"
        );
        assert!(
            self.usage_modes.len() == count,
            "Render target '{name}': there must be exactly one usage mode per image resource \
             ({} images, {} usage modes)",
            count,
            self.usage_modes.len()
        );

        for (index, image) in self.image_resources.iter().enumerate() {
            let cardinality = images.slot(image).cardinality();
            assert!(
                cardinality != Cardinality::Array,
                "Render target '{name}': image '{image}' is an array resource; \
                 attachments must be single or per-frame images"
            );

            let format = images.info(image).format;
            let last = index + 1 == count;
            if !last {
                assert!(
                    !format.is_depth(),
                    "Render target '{name}': depth resource must be last, \
                     but '{image}' at position {index} is a depth image"
                );
            } else {
                assert!(
                    format.is_depth(),
                    "Render target '{name}': depth resource must be last, \
                     but last image '{image}' is a color image"
                );
            }
        }

        for image in &self.image_resources {
            assert!(
                images.info(image).usage.contains(ImageUsageFlags::RENDER_TARGET),
                "Render target '{name}': image '{image}' lacks the RENDER_TARGET usage flag"
            );
        }

        let first = &self.image_resources[0];
        let first_resource = images.get(first, FrameSlot::Current, 0);
        for other in &self.image_resources[1..] {
            let resource = images.get(other, FrameSlot::Current, 0);
            assert!(
                resource.resolution == first_resource.resolution,
                "Render target '{name}': images '{first}' and '{other}' have mismatched \
                 resolutions ({} and {})",
                first_resource.resolution,
                resource.resolution
            );
            assert!(
                resource.samples == first_resource.samples,
                "Render target '{name}': images '{first}' and '{other}' have mismatched \
                 sample counts ({} and {})",
                first_resource.samples.count(),
                resource.samples.count()
            );
        }
    }

    fn render_pass_descriptor(&self, images: &ImageRegistry, name: &str) -> RenderPassDescriptor {
        let describe = |index: usize, attachment_layout: ImageLayout| {
            let image = images.get(&self.image_resources[index], FrameSlot::Current, 0);
            let usage = &self.usage_modes[index];
            let (initial_layout, final_layout) = usage.attachment(attachment_layout);
            AttachmentDescriptor {
                format: image.format,
                samples: image.samples,
                load_op: usage.load,
                store_op: usage.store,
                initial_layout,
                final_layout,
            }
        };

        let (next_stages, next_access) = self.usage_modes.iter().fold(
            (PipelineStages::empty(), AccessFlags::empty()),
            |(stages, access), usage| {
                let next = usage.next_usage.state();
                (stages | next.stage, access | next.access)
            },
        );

        let color_count = self.color_count();
        RenderPassDescriptor {
            label: Some(name.to_string()),
            color_attachments: (0..color_count)
                .map(|index| describe(index, ImageLayout::ColorAttachment))
                .collect(),
            depth_attachment: describe(color_count, ImageLayout::DepthStencilAttachment),
            next_stages,
            next_access,
        }
    }
}

/// A created render target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub render_pass: RenderPassHandle,
    /// One framebuffer per frame in flight.
    pub framebuffers: Vec<FramebufferHandle>,
    pub resolution: Extent2d,
    pub samples: SampleCount,
}

impl RenderTarget {
    /// Validate `info` and create its render pass and framebuffers.
    pub fn create(
        backend: &dyn GpuBackend,
        images: &ImageRegistry,
        info: &RenderTargetInfo,
        name: &str,
        frames: usize,
    ) -> Result<Self, GraphicsError> {
        info.validate(images, name);

        let render_pass = backend.create_render_pass(&info.render_pass_descriptor(images, name))?;
        let first = images.get(&info.image_resources[0], FrameSlot::Current, 0);
        let resolution = first.resolution;
        let samples = first.samples;

        let mut framebuffers = Vec::with_capacity(frames);
        for frame in 0..frames {
            let attachments = info
                .image_resources
                .iter()
                .map(|image| images.get(image, FrameSlot::Current, frame).view)
                .collect();
            let descriptor = FramebufferDescriptor {
                render_pass,
                attachments,
                extent: resolution,
            };
            match backend.create_framebuffer(&descriptor) {
                Ok(framebuffer) => framebuffers.push(framebuffer),
                Err(e) => {
                    for framebuffer in framebuffers {
                        backend.destroy_framebuffer(framebuffer);
                    }
                    backend.destroy_render_pass(render_pass);
                    return Err(e);
                }
            }
        }

        Ok(Self {
            render_pass,
            framebuffers,
            resolution,
            samples,
        })
    }

    pub fn destroy(self, backend: &dyn GpuBackend) {
        for framebuffer in self.framebuffers {
            backend.destroy_framebuffer(framebuffer);
        }
        backend.destroy_render_pass(self.render_pass);
    }
}

/// All render targets of a context, keyed by name.
#[derive(Debug, Default)]
pub struct RenderTargetRegistry {
    targets: HashMap<String, (RenderTargetInfo, RenderTarget)>,
}

impl RenderTargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the render target `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is taken or `info` is invalid.
    pub fn create(
        &mut self,
        backend: &dyn GpuBackend,
        images: &ImageRegistry,
        info: &RenderTargetInfo,
        name: &str,
        frames: usize,
    ) -> Result<(), GraphicsError> {
        assert!(
            !self.targets.contains_key(name),
            "Attempted to create RenderTarget with name: '{name}' which already exists!"
        );
        let target = RenderTarget::create(backend, images, info, name, frames)?;
        log::debug!(
            "Created render target '{}' ({} attachments, {})",
            name,
            info.image_resources.len(),
            target.resolution
        );
        self.targets.insert(name.to_string(), (info.clone(), target));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    fn entry(&self, name: &str) -> &(RenderTargetInfo, RenderTarget) {
        self.targets
            .get(name)
            .unwrap_or_else(|| panic!("RenderTarget '{name}' does not exist!"))
    }

    pub fn get(&self, name: &str) -> &RenderTarget {
        &self.entry(name).1
    }

    pub fn info(&self, name: &str) -> &RenderTargetInfo {
        &self.entry(name).0
    }

    /// Names of targets with at least one surface-sized attachment.
    pub fn surface_dependent(&self, images: &ImageRegistry) -> Vec<String> {
        self.targets
            .iter()
            .filter(|(_, (info, _))| info.tracks_surface(images))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Rebuild `name` from its stored info, after its images were recreated.
    pub fn recreate(
        &mut self,
        backend: &dyn GpuBackend,
        images: &ImageRegistry,
        name: &str,
        frames: usize,
    ) -> Result<(), GraphicsError> {
        let (info, old) = self
            .targets
            .remove(name)
            .unwrap_or_else(|| panic!("RenderTarget '{name}' does not exist!"));
        old.destroy(backend);
        let target = RenderTarget::create(backend, images, &info, name, frames)?;
        self.targets.insert(name.to_string(), (info, target));
        Ok(())
    }

    pub fn destroy(&mut self, backend: &dyn GpuBackend) {
        for (_, (_, target)) in self.targets.drain() {
            target.destroy(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::resources::{ImageInfo, NameTable};
    use crate::types::ImageFormat;

    const FRAMES: usize = 2;

    fn extent() -> Extent2d {
        Extent2d::new(1920, 1080)
    }

    fn images(backend: &DummyBackend) -> ImageRegistry {
        let mut names = NameTable::new();
        let mut images = ImageRegistry::new();
        let target_usage = ImageUsageFlags::RENDER_TARGET | ImageUsageFlags::TEXTURE;
        let color = ImageInfo::new(
            ImageFormat::Rgba16Float,
            ImageSize::Fixed(extent()),
            target_usage,
        );
        let depth = ImageInfo::new(
            ImageFormat::Depth32Float,
            ImageSize::Fixed(extent()),
            ImageUsageFlags::RENDER_TARGET,
        );
        for (name, info) in [("color", color), ("color2", color), ("depth", depth)] {
            images
                .create_one_per_frame(backend, &mut names, &info, name, extent(), FRAMES)
                .unwrap();
        }
        let small = ImageInfo::new(
            ImageFormat::Depth32Float,
            ImageSize::Fixed(Extent2d::new(64, 64)),
            ImageUsageFlags::RENDER_TARGET,
        );
        images
            .create_one_per_frame(backend, &mut names, &small, "small_depth", extent(), FRAMES)
            .unwrap();
        let texture_only = ImageInfo::new(
            ImageFormat::Rgba8Unorm,
            ImageSize::Fixed(extent()),
            ImageUsageFlags::TEXTURE,
        );
        images
            .create_one(backend, &mut names, &texture_only, "albedo", extent())
            .unwrap();
        let msaa = depth.with_samples(SampleCount::S4);
        images
            .create_one_per_frame(backend, &mut names, &msaa, "msaa_depth", extent(), FRAMES)
            .unwrap();
        images
    }

    fn forward_info() -> RenderTargetInfo {
        RenderTargetInfo::new()
            .with_attachment("color", AttachmentUsage::clear_store(ImageUsage::Texture))
            .with_attachment(
                "depth",
                AttachmentUsage::clear_store(ImageUsage::RenderTargetDepth),
            )
    }

    #[test]
    fn test_color_and_depth_target() {
        let backend = DummyBackend::new();
        let images = images(&backend);
        let target = RenderTarget::create(&backend, &images, &forward_info(), "forward", FRAMES)
            .unwrap();

        let pass = backend.render_pass_descriptor(target.render_pass).unwrap();
        assert_eq!(pass.attachment_count(), 2);
        assert_eq!(pass.color_attachments[0].initial_layout, ImageLayout::Undefined);
        assert_eq!(pass.color_attachments[0].final_layout, ImageLayout::ShaderReadOnly);
        assert_eq!(
            pass.depth_attachment.final_layout,
            ImageLayout::DepthStencilAttachment
        );

        assert_eq!(target.framebuffers.len(), FRAMES);
        for (frame, framebuffer) in target.framebuffers.iter().enumerate() {
            let fb = backend.framebuffer_descriptor(*framebuffer).unwrap();
            assert_eq!(fb.extent, extent());
            assert_eq!(
                fb.attachments[0],
                images.get("color", FrameSlot::Index(frame), 0).view
            );
        }
    }

    #[test]
    fn test_attachment_writes_reach_next_usage() {
        let backend = DummyBackend::new();
        let images = images(&backend);
        let target = RenderTarget::create(&backend, &images, &forward_info(), "forward", FRAMES)
            .unwrap();
        let pass = backend.render_pass_descriptor(target.render_pass).unwrap();
        assert!(pass.next_stages.contains(PipelineStages::FRAGMENT_SHADER));
        assert!(pass.next_stages.contains(
            PipelineStages::EARLY_FRAGMENT_TESTS | PipelineStages::LATE_FRAGMENT_TESTS
        ));
        assert_eq!(
            pass.next_access,
            AccessFlags::SHADER_READ | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
        );

        let blit_source = RenderTargetInfo::new()
            .with_attachment("color", AttachmentUsage::clear_store(ImageUsage::Src))
            .with_attachment("depth", AttachmentUsage::clear_store(ImageUsage::Texture));
        let target =
            RenderTarget::create(&backend, &images, &blit_source, "post", FRAMES).unwrap();
        let pass = backend.render_pass_descriptor(target.render_pass).unwrap();
        assert_eq!(
            pass.next_stages,
            PipelineStages::TRANSFER | PipelineStages::FRAGMENT_SHADER
        );
        assert_eq!(
            pass.next_access,
            AccessFlags::TRANSFER_READ | AccessFlags::SHADER_READ
        );
    }

    #[test]
    fn test_load_uses_attachment_layout() {
        let backend = DummyBackend::new();
        let images = images(&backend);
        let info = RenderTargetInfo::new()
            .with_attachment(
                "color",
                AttachmentUsage::load_store(ImageUsage::RenderTargetColor),
            )
            .with_attachment(
                "depth",
                AttachmentUsage::load_store(ImageUsage::RenderTargetDepth),
            );
        let target = RenderTarget::create(&backend, &images, &info, "overlay", FRAMES).unwrap();
        let pass = backend.render_pass_descriptor(target.render_pass).unwrap();
        assert_eq!(
            pass.color_attachments[0].initial_layout,
            ImageLayout::ColorAttachment
        );
        assert_eq!(
            pass.depth_attachment.initial_layout,
            ImageLayout::DepthStencilAttachment
        );
    }

    #[test]
    #[should_panic(expected = "must not be empty")]
    fn test_empty_target_panics() {
        let backend = DummyBackend::new();
        let images = images(&backend);
        RenderTargetInfo::new().validate(&images, "empty");
    }

    #[test]
    #[should_panic(expected = "one usage mode per image resource")]
    fn test_usage_count_mismatch_panics() {
        let backend = DummyBackend::new();
        let images = images(&backend);
        let mut info = forward_info();
        info.usage_modes.pop();
        info.validate(&images, "forward");
    }

    #[test]
    #[should_panic(expected = "depth resource must be last")]
    fn test_two_colors_no_depth_panics() {
        let backend = DummyBackend::new();
        let images = images(&backend);
        let usage = AttachmentUsage::clear_store(ImageUsage::Texture);
        let info = RenderTargetInfo::new()
            .with_attachment("color", usage)
            .with_attachment("color2", usage);
        info.validate(&images, "no_depth");
    }

    #[test]
    #[should_panic(expected = "is a depth image")]
    fn test_depth_first_panics() {
        let backend = DummyBackend::new();
        let images = images(&backend);
        let usage = AttachmentUsage::clear_store(ImageUsage::RenderTargetDepth);
        let info = RenderTargetInfo::new()
            .with_attachment("depth", usage)
            .with_attachment("depth", usage);
        info.validate(&images, "depth_first");
    }

    #[test]
    #[should_panic(expected = "lacks the RENDER_TARGET usage flag")]
    fn test_missing_render_target_flag_panics() {
        let backend = DummyBackend::new();
        let images = images(&backend);
        let info = RenderTargetInfo::new()
            .with_attachment("albedo", AttachmentUsage::clear_store(ImageUsage::Texture))
            .with_attachment(
                "depth",
                AttachmentUsage::clear_store(ImageUsage::RenderTargetDepth),
            );
        info.validate(&images, "albedo_target");
    }

    #[test]
    #[should_panic(expected = "images 'color' and 'small_depth' have mismatched resolutions")]
    fn test_resolution_mismatch_panics() {
        let backend = DummyBackend::new();
        let images = images(&backend);
        let info = RenderTargetInfo::new()
            .with_attachment("color", AttachmentUsage::clear_store(ImageUsage::Texture))
            .with_attachment(
                "small_depth",
                AttachmentUsage::clear_store(ImageUsage::RenderTargetDepth),
            );
        info.validate(&images, "mismatched");
    }

    #[test]
    #[should_panic(expected = "mismatched sample counts")]
    fn test_sample_mismatch_panics() {
        let backend = DummyBackend::new();
        let images = images(&backend);
        let info = RenderTargetInfo::new()
            .with_attachment("color", AttachmentUsage::clear_store(ImageUsage::Texture))
            .with_attachment(
                "msaa_depth",
                AttachmentUsage::clear_store(ImageUsage::RenderTargetDepth),
            );
        info.validate(&images, "mismatched");
    }

    #[test]
    #[should_panic(expected = "which already exists!")]
    fn test_duplicate_target_panics() {
        let backend = DummyBackend::new();
        let images = images(&backend);
        let mut targets = RenderTargetRegistry::new();
        targets
            .create(&backend, &images, &forward_info(), "forward", FRAMES)
            .unwrap();
        let _ = targets.create(&backend, &images, &forward_info(), "forward", FRAMES);
    }

    #[test]
    fn test_registry_recreate_and_destroy() {
        let backend = DummyBackend::new();
        let images = images(&backend);
        let baseline = backend.live_resource_count();
        let mut targets = RenderTargetRegistry::new();
        targets
            .create(&backend, &images, &forward_info(), "forward", FRAMES)
            .unwrap();
        let old_pass = targets.get("forward").render_pass;

        targets.recreate(&backend, &images, "forward", FRAMES).unwrap();
        assert_ne!(targets.get("forward").render_pass, old_pass);
        assert!(targets.surface_dependent(&images).is_empty());

        targets.destroy(&backend);
        assert_eq!(backend.live_resource_count(), baseline);
    }
}
