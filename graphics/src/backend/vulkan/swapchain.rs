//! Vulkan swapchain creation, acquisition and presentation.
//!
//! The backend owns one window surface. Swapchains are created against it on
//! demand; each keeps the views of its images so they can be destroyed with
//! it. Synchronization objects belong to the frame pipeline, not to the
//! swapchain.

use std::time::Duration;

use ash::vk;
use ash::vk::Handle;

use crate::backend::{
    AcquireOutcome, ImageAllocation, ImageHandle, ImageViewHandle, PresentOutcome,
    SemaphoreHandle, SwapchainDescriptor, SwapchainHandle, SwapchainInfo,
};
use crate::error::GraphicsError;
use crate::types::{Extent2d, ImageAspect, ImageFormat};

use super::VulkanBackend;
use super::conversion::{
    convert_image_format, convert_present_mode, image_format_from_vk, vk_error,
};

/// Preferred swapchain format; blits from linear render targets need a
/// linear destination.
const PREFERRED_FORMAT: ImageFormat = ImageFormat::Bgra8Unorm;

fn timeout_ns(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX)
}

impl VulkanBackend {
    fn surface_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR, GraphicsError> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
        }
        .map_err(|e| vk_error("Failed to get surface capabilities", e))
    }

    /// Pick the preferred format if offered, else the first one we can name.
    fn choose_surface_format(&self) -> Result<(vk::SurfaceFormatKHR, ImageFormat), GraphicsError> {
        let formats = unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(self.physical_device, self.surface)
        }
        .map_err(|e| vk_error("Failed to get surface formats", e))?;

        let preferred = convert_image_format(PREFERRED_FORMAT);
        formats
            .iter()
            .find(|f| f.format == preferred)
            .map(|f| (*f, PREFERRED_FORMAT))
            .or_else(|| {
                formats
                    .iter()
                    .find_map(|f| image_format_from_vk(f.format).map(|format| (*f, format)))
            })
            .ok_or_else(|| {
                GraphicsError::ResourceCreationFailed(
                    "Surface offers no supported color format".to_string(),
                )
            })
    }

    fn choose_present_mode(&self, requested: vk::PresentModeKHR) -> vk::PresentModeKHR {
        let modes = unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(self.physical_device, self.surface)
        }
        .unwrap_or_default();
        if modes.contains(&requested) {
            requested
        } else {
            log::debug!("Present mode {:?} unavailable, using FIFO", requested);
            vk::PresentModeKHR::FIFO
        }
    }

    pub(super) fn create_swapchain_impl(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> Result<SwapchainInfo, GraphicsError> {
        if descriptor.extent.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "Cannot create a swapchain of size {}",
                descriptor.extent
            )));
        }

        let capabilities = self.surface_capabilities()?;
        let (surface_format, format) = self.choose_surface_format()?;
        let present_mode = self.choose_present_mode(convert_present_mode(descriptor.present_mode));

        let extent = if capabilities.current_extent.width != u32::MAX {
            capabilities.current_extent
        } else {
            vk::Extent2D {
                width: descriptor.extent.width.clamp(
                    capabilities.min_image_extent.width,
                    capabilities.max_image_extent.width,
                ),
                height: descriptor.extent.height.clamp(
                    capabilities.min_image_extent.height,
                    capabilities.max_image_extent.height,
                ),
            }
        };

        let max_images = if capabilities.max_image_count > 0 {
            capabilities.max_image_count
        } else {
            u32::MAX
        };
        let image_count = (capabilities.min_image_count + 1).min(max_images);

        let old_swapchain = descriptor
            .old_swapchain
            .map_or(vk::SwapchainKHR::null(), |old| vk::SwapchainKHR::from_raw(old.0));

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| vk_error("Failed to create swapchain", e))?;

        let images = match unsafe { self.swapchain_loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(vk_error("Failed to get swapchain images", e));
            }
        };

        let mut views = Vec::with_capacity(images.len());
        for &image in &images {
            match self.create_view(image, surface_format.format, ImageAspect::COLOR) {
                Ok(view) => views.push(view),
                Err(e) => {
                    unsafe {
                        for view in views {
                            self.device.destroy_image_view(view, None);
                        }
                        self.swapchain_loader.destroy_swapchain(swapchain, None);
                    }
                    return Err(e);
                }
            }
        }

        let allocations = images
            .iter()
            .zip(&views)
            .map(|(image, view)| ImageAllocation {
                image: ImageHandle(image.as_raw()),
                view: ImageViewHandle(view.as_raw()),
            })
            .collect();
        self.swapchains.lock().insert(swapchain.as_raw(), views);

        log::info!(
            "Created Vulkan swapchain: {}x{} with {} images ({:?}, {:?})",
            extent.width,
            extent.height,
            images.len(),
            format,
            present_mode
        );

        Ok(SwapchainInfo {
            handle: SwapchainHandle(swapchain.as_raw()),
            format,
            extent: Extent2d::new(extent.width, extent.height),
            images: allocations,
        })
    }

    pub(super) fn destroy_swapchain_impl(&self, swapchain: SwapchainHandle) {
        let views = self.swapchains.lock().remove(&swapchain.0).unwrap_or_default();
        unsafe {
            for view in views {
                self.device.destroy_image_view(view, None);
            }
            self.swapchain_loader
                .destroy_swapchain(vk::SwapchainKHR::from_raw(swapchain.0), None);
        }
    }

    pub(super) fn acquire_next_image_impl(
        &self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
        timeout: Duration,
    ) -> Result<AcquireOutcome, GraphicsError> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                vk::SwapchainKHR::from_raw(swapchain.0),
                timeout_ns(timeout),
                vk::Semaphore::from_raw(signal.0),
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => Ok(AcquireOutcome::Timeout),
            Err(e) => Err(vk_error("Failed to acquire swapchain image", e)),
        }
    }

    pub(super) fn present_impl(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SemaphoreHandle,
    ) -> Result<PresentOutcome, GraphicsError> {
        let wait_semaphores = [vk::Semaphore::from_raw(wait.0)];
        let swapchains = [vk::SwapchainKHR::from_raw(swapchain.0)];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = {
            let queue = self.queue.lock();
            unsafe { self.swapchain_loader.queue_present(*queue, &present_info) }
        };

        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(vk_error("Failed to present swapchain image", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_conversion_saturates() {
        assert_eq!(timeout_ns(Duration::from_millis(2)), 2_000_000);
        assert_eq!(timeout_ns(Duration::MAX), u64::MAX);
    }
}
