//! Image resources and their registry.

use std::collections::HashMap;

use crate::backend::{CommandBufferHandle, GpuBackend, ImageAllocation, ImageHandle, ImageViewHandle};
use crate::error::GraphicsError;
use crate::types::{Extent2d, FilterMode, ImageDescriptor, ImageFormat, ImageUsageFlags, SampleCount};

use super::registry::{
    Association, Cardinality, FrameSlot, NameTable, Registry, ResourceClass, ResourceKind,
    ResourceSlot, create_all,
};
use super::usage::{self, ImageUsage};

/// Resolution of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSize {
    /// Fixed resolution.
    Fixed(Extent2d),
    /// Follows the presentation surface, recreated on resize.
    Surface,
}

/// Declaration of an image resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub size: ImageSize,
    pub samples: SampleCount,
    pub usage: ImageUsageFlags,
}

impl ImageInfo {
    pub fn new(format: ImageFormat, size: ImageSize, usage: ImageUsageFlags) -> Self {
        Self {
            format,
            size,
            samples: SampleCount::S1,
            usage,
        }
    }

    pub fn with_samples(mut self, samples: SampleCount) -> Self {
        self.samples = samples;
        self
    }

    fn resolution(&self, surface: Extent2d) -> Extent2d {
        match self.size {
            ImageSize::Fixed(extent) => extent,
            ImageSize::Surface => surface,
        }
    }

    fn descriptor(&self, name: &str, surface: Extent2d) -> ImageDescriptor {
        ImageDescriptor::new(self.format, self.resolution(surface), self.usage)
            .with_samples(self.samples)
            .with_label(name)
    }
}

/// A GPU image with its view and tracked usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageResource {
    pub image: ImageHandle,
    pub view: ImageViewHandle,
    pub format: ImageFormat,
    pub samples: SampleCount,
    pub resolution: Extent2d,
    pub usage_flags: ImageUsageFlags,
    /// Last usage recorded into a command buffer.
    pub current_usage: ImageUsage,
    /// False for images owned by someone else (swapchain images).
    pub(crate) owned: bool,
}

impl ImageResource {
    fn new(allocation: ImageAllocation, info: &ImageInfo, resolution: Extent2d) -> Self {
        Self {
            image: allocation.image,
            view: allocation.view,
            format: info.format,
            samples: info.samples,
            resolution,
            usage_flags: info.usage,
            current_usage: ImageUsage::Unknown,
            owned: true,
        }
    }

    fn allocation(&self) -> ImageAllocation {
        ImageAllocation {
            image: self.image,
            view: self.view,
        }
    }
}

/// All images of a context, keyed by name.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    images: Registry<ImageResource>,
    infos: HashMap<String, ImageInfo>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    const fn kind(cardinality: Cardinality) -> ResourceKind {
        ResourceKind::new(ResourceClass::Image, cardinality)
    }

    /// Create a single image.
    pub fn create_one(
        &mut self,
        backend: &dyn GpuBackend,
        names: &mut NameTable,
        info: &ImageInfo,
        name: &str,
        surface: Extent2d,
    ) -> Result<(), GraphicsError> {
        let association = names.associate(name, Self::kind(Cardinality::One));
        let resource = Self::allocate(backend, info, name, surface)
            .inspect_err(|_| names.revert(name, association))?;
        self.images.insert(name, ResourceSlot::Single(resource));
        self.infos.insert(name.to_string(), *info);
        log::debug!("Created image '{}' ({:?})", name, info.format);
        Ok(())
    }

    /// Append an image to the array `name`, returning its index.
    pub fn create_array(
        &mut self,
        backend: &dyn GpuBackend,
        names: &mut NameTable,
        info: &ImageInfo,
        name: &str,
        surface: Extent2d,
    ) -> Result<usize, GraphicsError> {
        let association = names.associate(name, Self::kind(Cardinality::Array));
        let resource = Self::allocate(backend, info, name, surface)
            .inspect_err(|_| names.revert(name, association))?;
        let index = self.images.push_array(name, resource);
        self.infos.entry(name.to_string()).or_insert(*info);
        log::debug!("Created image '{}'[{}]", name, index);
        Ok(index)
    }

    /// Create one image per frame in flight.
    pub fn create_one_per_frame(
        &mut self,
        backend: &dyn GpuBackend,
        names: &mut NameTable,
        info: &ImageInfo,
        name: &str,
        surface: Extent2d,
        frames: usize,
    ) -> Result<(), GraphicsError> {
        let association = names.associate(name, Self::kind(Cardinality::PerFrame));
        let resources = create_all(
            frames,
            || Self::allocate(backend, info, name, surface),
            |resource| backend.destroy_image(resource.allocation()),
        )
        .inspect_err(|_| names.revert(name, association))?;
        self.images.insert(name, ResourceSlot::PerFrame(resources));
        self.infos.insert(name.to_string(), *info);
        log::debug!("Created per-frame image '{}' x{}", name, frames);
        Ok(())
    }

    /// Register images created elsewhere as an array. They are never destroyed
    /// by this registry.
    pub fn create_array_from_existing(
        &mut self,
        names: &mut NameTable,
        name: &str,
        allocations: &[ImageAllocation],
        info: &ImageInfo,
        resolution: Extent2d,
    ) {
        for allocation in allocations {
            if names.associate(name, Self::kind(Cardinality::Array)) == Association::New {
                self.infos.insert(name.to_string(), *info);
            }
            let mut resource = ImageResource::new(*allocation, info, resolution);
            resource.owned = false;
            self.images.push_array(name, resource);
        }
    }

    fn allocate(
        backend: &dyn GpuBackend,
        info: &ImageInfo,
        name: &str,
        surface: Extent2d,
    ) -> Result<ImageResource, GraphicsError> {
        let resolution = info.resolution(surface);
        let allocation = backend.create_image(&info.descriptor(name, surface))?;
        Ok(ImageResource::new(allocation, info, resolution))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images.contains(name)
    }

    /// Declaration the image was created from.
    pub fn info(&self, name: &str) -> &ImageInfo {
        self.infos
            .get(name)
            .unwrap_or_else(|| panic!("Resource '{name}' does not exist!"))
    }

    pub fn slot(&self, name: &str) -> &ResourceSlot<ImageResource> {
        self.images.slot(name)
    }

    pub fn get(&self, name: &str, slot: FrameSlot, frame_index: usize) -> &ImageResource {
        self.images.get(name, slot, frame_index)
    }

    pub fn get_mut(&mut self, name: &str, slot: FrameSlot, frame_index: usize) -> &mut ImageResource {
        self.images.get_mut(name, slot, frame_index)
    }

    /// Overwrite the tracked usage without recording a barrier.
    ///
    /// Used when a render pass performs the layout change itself.
    pub fn set_usage(&mut self, name: &str, slot: FrameSlot, frame_index: usize, usage: ImageUsage) {
        self.get_mut(name, slot, frame_index).current_usage = usage;
    }

    /// See [`usage::transition`].
    pub fn transition(
        &mut self,
        backend: &dyn GpuBackend,
        cmd: CommandBufferHandle,
        name: &str,
        slot: FrameSlot,
        frame_index: usize,
        next: ImageUsage,
    ) {
        usage::transition(backend, cmd, self.get_mut(name, slot, frame_index), next);
    }

    /// See [`usage::blit`].
    #[allow(clippy::too_many_arguments)]
    pub fn blit(
        &mut self,
        backend: &dyn GpuBackend,
        cmd: CommandBufferHandle,
        frame_index: usize,
        dst: (&str, FrameSlot),
        src: (&str, FrameSlot),
        filter: FilterMode,
    ) {
        let mut source = *self.get(src.0, src.1, frame_index);
        usage::blit(
            backend,
            cmd,
            self.get_mut(dst.0, dst.1, frame_index),
            &mut source,
            filter,
        );
        self.get_mut(src.0, src.1, frame_index).current_usage = source.current_usage;
    }

    /// See [`usage::resolve`].
    pub fn resolve(
        &mut self,
        backend: &dyn GpuBackend,
        cmd: CommandBufferHandle,
        frame_index: usize,
        dst: (&str, FrameSlot),
        src: (&str, FrameSlot),
    ) {
        let mut source = *self.get(src.0, src.1, frame_index);
        usage::resolve(
            backend,
            cmd,
            self.get_mut(dst.0, dst.1, frame_index),
            &mut source,
        );
        self.get_mut(src.0, src.1, frame_index).current_usage = source.current_usage;
    }

    /// Resolve `src` into `intermediate`, then blit `intermediate` onto `dst`.
    ///
    /// This is the path for multisampled images whose resolution differs from
    /// the destination.
    pub fn resolve_then_blit(
        &mut self,
        backend: &dyn GpuBackend,
        cmd: CommandBufferHandle,
        frame_index: usize,
        dst: (&str, FrameSlot),
        intermediate: (&str, FrameSlot),
        src: (&str, FrameSlot),
        filter: FilterMode,
    ) {
        self.resolve(backend, cmd, frame_index, intermediate, src);
        self.blit(backend, cmd, frame_index, dst, intermediate, filter);
    }

    /// Names of owned images whose size follows the surface.
    pub fn surface_sized(&self) -> Vec<String> {
        self.infos
            .iter()
            .filter(|(name, info)| {
                info.size == ImageSize::Surface
                    && self
                        .images
                        .slot(name)
                        .values()
                        .all(|resource| resource.owned)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Recreate every instance of `name` at `surface` resolution, keeping its
    /// name and cardinality. The old images are only destroyed once every new
    /// one exists.
    pub fn recreate(
        &mut self,
        backend: &dyn GpuBackend,
        name: &str,
        surface: Extent2d,
    ) -> Result<(), GraphicsError> {
        let info = *self.info(name);
        let replacements = create_all(
            self.images.slot(name).len(),
            || Self::allocate(backend, &info, name, surface),
            |resource| backend.destroy_image(resource.allocation()),
        )?;
        for (resource, replacement) in self
            .images
            .slot_mut(name)
            .values_mut()
            .zip(replacements)
        {
            if resource.owned {
                backend.destroy_image(resource.allocation());
            }
            *resource = replacement;
        }
        log::debug!("Recreated image '{}' at {}", name, surface);
        Ok(())
    }

    /// Forget images registered with [`create_array_from_existing`] under `name`.
    ///
    /// [`create_array_from_existing`]: Self::create_array_from_existing
    pub fn unregister_existing(&mut self, names: &mut NameTable, name: &str) {
        if let Some(slot) = self.images.remove(name) {
            debug_assert!(slot.values().all(|resource| !resource.owned));
            self.infos.remove(name);
            names.release(name);
        }
    }

    /// Destroy every owned image.
    pub fn destroy(&mut self, backend: &dyn GpuBackend, names: &mut NameTable) {
        for (name, slot) in self.images.drain() {
            for resource in slot.into_values() {
                if resource.owned {
                    backend.destroy_image(resource.allocation());
                }
            }
            names.release(&name);
        }
        self.infos.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, RecordedCommand};

    const SURFACE: Extent2d = Extent2d {
        width: 800,
        height: 600,
    };

    fn color_info() -> ImageInfo {
        ImageInfo::new(
            ImageFormat::Rgba16Float,
            ImageSize::Surface,
            ImageUsageFlags::RENDER_TARGET | ImageUsageFlags::TRANSFER_SRC,
        )
    }

    #[test]
    fn test_create_per_frame() {
        let backend = DummyBackend::new();
        let mut names = NameTable::new();
        let mut images = ImageRegistry::new();
        images
            .create_one_per_frame(&backend, &mut names, &color_info(), "color", SURFACE, 2)
            .unwrap();

        let first = *images.get("color", FrameSlot::Current, 0);
        let second = *images.get("color", FrameSlot::Current, 1);
        assert_ne!(first.image, second.image);
        assert_eq!(first.resolution, SURFACE);
        assert_eq!(first.current_usage, ImageUsage::Unknown);
        assert_eq!(backend.live_resource_count(), 2);
    }

    #[test]
    fn test_failed_create_releases_name() {
        let backend = DummyBackend::new();
        let mut names = NameTable::new();
        let mut images = ImageRegistry::new();

        backend.limit_allocations(Some(1));
        let result =
            images.create_one_per_frame(&backend, &mut names, &color_info(), "color", SURFACE, 2);
        assert_eq!(result, Err(GraphicsError::OutOfMemory));
        assert_eq!(backend.live_resource_count(), 0);
        assert!(!names.contains("color"));
        assert!(!images.contains("color"));

        assert!(
            images
                .create_one(&backend, &mut names, &color_info(), "depth", SURFACE)
                .is_err()
        );
        assert!(!names.contains("depth"));
    }

    #[test]
    fn test_failed_recreate_keeps_old_images() {
        let backend = DummyBackend::new();
        let mut names = NameTable::new();
        let mut images = ImageRegistry::new();
        images
            .create_one_per_frame(&backend, &mut names, &color_info(), "color", SURFACE, 2)
            .unwrap();
        let before: Vec<_> = images.slot("color").values().map(|image| image.image).collect();

        backend.limit_allocations(Some(1));
        assert!(images.recreate(&backend, "color", Extent2d::new(1024, 768)).is_err());
        backend.limit_allocations(None);

        let after: Vec<_> = images.slot("color").values().map(|image| image.image).collect();
        assert_eq!(after, before);
        assert_eq!(images.get("color", FrameSlot::Index(0), 0).resolution, SURFACE);
        assert_eq!(backend.live_resource_count(), 2);
    }

    #[test]
    fn test_array_append() {
        let backend = DummyBackend::new();
        let mut names = NameTable::new();
        let mut images = ImageRegistry::new();
        let info = ImageInfo::new(
            ImageFormat::Rgba8UnormSrgb,
            ImageSize::Fixed(Extent2d::new(256, 256)),
            ImageUsageFlags::TEXTURE,
        );
        assert_eq!(
            images
                .create_array(&backend, &mut names, &info, "textures", SURFACE)
                .unwrap(),
            0
        );
        assert_eq!(
            images
                .create_array(&backend, &mut names, &info, "textures", SURFACE)
                .unwrap(),
            1
        );
        assert_eq!(images.slot("textures").len(), 2);
    }

    #[test]
    #[should_panic(expected = "which already exists!")]
    fn test_duplicate_per_frame_panics() {
        let backend = DummyBackend::new();
        let mut names = NameTable::new();
        let mut images = ImageRegistry::new();
        images
            .create_one_per_frame(&backend, &mut names, &color_info(), "color", SURFACE, 2)
            .unwrap();
        images
            .create_one_per_frame(&backend, &mut names, &color_info(), "color", SURFACE, 2)
            .unwrap();
    }

    #[test]
    fn test_registry_blit_tracks_both_images() {
        let backend = DummyBackend::new();
        let mut names = NameTable::new();
        let mut images = ImageRegistry::new();
        images
            .create_one_per_frame(&backend, &mut names, &color_info(), "color", SURFACE, 2)
            .unwrap();
        images
            .create_one(&backend, &mut names, &color_info(), "copy", SURFACE)
            .unwrap();

        images.blit(
            &backend,
            CommandBufferHandle(1),
            1,
            ("copy", FrameSlot::Current),
            ("color", FrameSlot::Current),
            FilterMode::Nearest,
        );

        assert_eq!(images.get("color", FrameSlot::Index(1), 0).current_usage, ImageUsage::Src);
        assert_eq!(images.get("color", FrameSlot::Index(0), 0).current_usage, ImageUsage::Unknown);
        assert_eq!(images.get("copy", FrameSlot::Current, 1).current_usage, ImageUsage::Dst);
        assert_eq!(
            backend.count_commands(|c| matches!(c, RecordedCommand::BlitImage(_))),
            1
        );
    }

    #[test]
    fn test_existing_images_are_not_destroyed() {
        let backend = DummyBackend::new();
        let mut names = NameTable::new();
        let mut images = ImageRegistry::new();
        let allocations = [
            ImageAllocation {
                image: ImageHandle(1000),
                view: ImageViewHandle(1001),
            },
            ImageAllocation {
                image: ImageHandle(1002),
                view: ImageViewHandle(1003),
            },
        ];
        let info = ImageInfo::new(
            ImageFormat::Bgra8Unorm,
            ImageSize::Surface,
            ImageUsageFlags::TRANSFER_DST,
        );
        images.create_array_from_existing(&mut names, "swapchain", &allocations, &info, SURFACE);
        assert_eq!(images.slot("swapchain").len(), 2);
        assert!(images.surface_sized().is_empty());

        images.destroy(&backend, &mut names);
        assert_eq!(backend.live_resource_count(), 0);
        assert!(names.is_empty());
    }

    #[test]
    fn test_recreate_surface_images() {
        let backend = DummyBackend::new();
        let mut names = NameTable::new();
        let mut images = ImageRegistry::new();
        images
            .create_one_per_frame(&backend, &mut names, &color_info(), "color", SURFACE, 2)
            .unwrap();
        assert_eq!(images.surface_sized(), vec!["color".to_string()]);

        let larger = Extent2d::new(1920, 1080);
        images.recreate(&backend, "color", larger).unwrap();
        assert_eq!(images.get("color", FrameSlot::Index(1), 0).resolution, larger);
        assert_eq!(backend.live_resource_count(), 2);
    }
}
