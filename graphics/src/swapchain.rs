//! Swapchain management.
//!
//! [`Swapchain`] wraps the presentation engine's image chain. Its images are
//! registered into the [`ImageRegistry`] as an array so that the frame loop
//! can blit into them and transition them like any other image.

use std::time::Duration;

use crate::backend::{
    AcquireOutcome, GpuBackend, ImageAllocation, PresentOutcome, SemaphoreHandle,
    SwapchainDescriptor, SwapchainHandle,
};
use crate::error::GraphicsError;
use crate::resources::{ImageInfo, ImageRegistry, ImageSize, NameTable};
use crate::types::{Extent2d, ImageFormat, ImageUsageFlags, PresentMode};

/// The presentation image chain of a window surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swapchain {
    handle: SwapchainHandle,
    format: ImageFormat,
    extent: Extent2d,
    present_mode: PresentMode,
    images: Vec<ImageAllocation>,
}

impl Swapchain {
    /// Create a swapchain of the requested extent.
    pub fn new(
        backend: &dyn GpuBackend,
        extent: Extent2d,
        present_mode: PresentMode,
    ) -> Result<Self, GraphicsError> {
        Self::create(backend, extent, present_mode, None)
    }

    fn create(
        backend: &dyn GpuBackend,
        extent: Extent2d,
        present_mode: PresentMode,
        old_swapchain: Option<SwapchainHandle>,
    ) -> Result<Self, GraphicsError> {
        let info = backend.create_swapchain(&SwapchainDescriptor {
            extent,
            present_mode,
            old_swapchain,
        })?;
        log::info!(
            "Created swapchain {} {:?} with {} images",
            info.extent,
            info.format,
            info.images.len()
        );
        Ok(Self {
            handle: info.handle,
            format: info.format,
            extent: info.extent,
            present_mode,
            images: info.images,
        })
    }

    /// Replace this swapchain with one of a new extent. The old swapchain is
    /// handed to the backend for reuse and destroyed afterwards.
    ///
    /// The device must be idle.
    pub fn recreate(
        &mut self,
        backend: &dyn GpuBackend,
        extent: Extent2d,
    ) -> Result<(), GraphicsError> {
        let replacement = Self::create(backend, extent, self.present_mode, Some(self.handle))?;
        backend.destroy_swapchain(self.handle);
        *self = replacement;
        Ok(())
    }

    /// Register the swapchain images as an image array named `name`.
    pub fn register(&self, images: &mut ImageRegistry, names: &mut NameTable, name: &str) {
        let info = ImageInfo::new(
            self.format,
            ImageSize::Fixed(self.extent),
            ImageUsageFlags::RENDER_TARGET | ImageUsageFlags::TRANSFER_DST,
        );
        images.create_array_from_existing(names, name, &self.images, &info, self.extent);
    }

    /// Acquire the next image, signaling `signal` once it is available.
    pub fn acquire(
        &self,
        backend: &dyn GpuBackend,
        signal: SemaphoreHandle,
        timeout: Duration,
    ) -> Result<AcquireOutcome, GraphicsError> {
        backend.acquire_next_image(self.handle, signal, timeout)
    }

    /// Queue `image_index` for presentation once `wait` is signaled.
    pub fn present(
        &self,
        backend: &dyn GpuBackend,
        image_index: u32,
        wait: SemaphoreHandle,
    ) -> Result<PresentOutcome, GraphicsError> {
        backend.present(self.handle, image_index, wait)
    }

    pub fn handle(&self) -> SwapchainHandle {
        self.handle
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn extent(&self) -> Extent2d {
        self.extent
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn destroy(&self, backend: &dyn GpuBackend) {
        backend.destroy_swapchain(self.handle);
    }
}
