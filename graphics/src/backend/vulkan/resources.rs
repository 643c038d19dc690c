//! Images, buffers and samplers backed by gpu-allocator memory.

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};

use crate::backend::{BufferHandle, ImageAllocation, ImageHandle, ImageViewHandle, SamplerHandle};
use crate::error::GraphicsError;
use crate::types::{BufferDescriptor, ImageDescriptor, SamplerDescriptor};

use super::VulkanBackend;
use super::allocator::{allocation_error, convert_location};
use super::conversion::{
    convert_aspect, convert_border_color, convert_buffer_usage, convert_filter_mode,
    convert_image_format, convert_image_usage, convert_mipmap_filter_mode, convert_sample_count,
    convert_wrap_mode, vk_error,
};
use super::debug::set_object_name;

/// Memory of a live buffer.
pub(super) struct BufferEntry {
    pub allocation: Allocation,
    pub size: u64,
}

impl VulkanBackend {
    fn free_allocation(&self, allocation: Allocation) {
        if let Some(allocator) = self.allocator.lock().as_mut()
            && let Err(e) = allocator.free(allocation)
        {
            log::warn!("Failed to free GPU allocation: {}", e);
        }
    }

    pub(super) fn create_image_impl(
        &self,
        descriptor: &ImageDescriptor,
    ) -> Result<ImageAllocation, GraphicsError> {
        let format = convert_image_format(descriptor.format);
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: descriptor.extent.width,
                height: descriptor.extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(convert_sample_count(descriptor.samples))
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(convert_image_usage(descriptor.usage, descriptor.format))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { self.device.create_image(&image_info, None) }
            .map_err(|e| vk_error("Failed to create image", e))?;
        let requirements = unsafe { self.device.get_image_memory_requirements(image) };

        let allocation = self
            .allocator
            .lock()
            .as_mut()
            .ok_or_else(|| GraphicsError::Internal("Allocator already destroyed".into()))
            .and_then(|allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: descriptor.label.as_deref().unwrap_or("image"),
                        requirements,
                        location: gpu_allocator::MemoryLocation::GpuOnly,
                        linear: false,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|e| allocation_error("image", e))
            });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let view = unsafe {
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        }
        .map_err(|e| vk_error("Failed to bind image memory", e))
        .and_then(|()| self.create_view(image, format, descriptor.format.aspect()));
        let view = match view {
            Ok(view) => view,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                self.free_allocation(allocation);
                return Err(e);
            }
        };

        set_object_name(self.debug_device.as_ref(), image, descriptor.label.as_deref());
        self.images.lock().insert(image.as_raw(), allocation);

        Ok(ImageAllocation {
            image: ImageHandle(image.as_raw()),
            view: ImageViewHandle(view.as_raw()),
        })
    }

    /// Create a 2D view of the whole image.
    pub(super) fn create_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect: crate::types::ImageAspect,
    ) -> Result<vk::ImageView, GraphicsError> {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: convert_aspect(aspect),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe { self.device.create_image_view(&view_info, None) }
            .map_err(|e| vk_error("Failed to create image view", e))
    }

    pub(super) fn destroy_image_impl(&self, image: ImageAllocation) {
        let allocation = self.images.lock().remove(&image.image.0);
        unsafe {
            self.device
                .destroy_image_view(vk::ImageView::from_raw(image.view.0), None);
            self.device
                .destroy_image(vk::Image::from_raw(image.image.0), None);
        }
        match allocation {
            Some(allocation) => self.free_allocation(allocation),
            None => log::warn!("Destroyed image {:?} without an allocation", image.image),
        }
    }

    pub(super) fn create_buffer_impl(
        &self,
        descriptor: &BufferDescriptor,
    ) -> Result<BufferHandle, GraphicsError> {
        let buffer_info = vk::BufferCreateInfo::default()
            .size(descriptor.size)
            .usage(convert_buffer_usage(descriptor.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { self.device.create_buffer(&buffer_info, None) }
            .map_err(|e| vk_error("Failed to create buffer", e))?;
        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };

        let allocation = self
            .allocator
            .lock()
            .as_mut()
            .ok_or_else(|| GraphicsError::Internal("Allocator already destroyed".into()))
            .and_then(|allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: descriptor.label.as_deref().unwrap_or("buffer"),
                        requirements,
                        location: convert_location(descriptor.location),
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|e| allocation_error("buffer", e))
            });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        if let Err(e) = unsafe {
            self.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        } {
            unsafe { self.device.destroy_buffer(buffer, None) };
            self.free_allocation(allocation);
            return Err(vk_error("Failed to bind buffer memory", e));
        }

        set_object_name(self.debug_device.as_ref(), buffer, descriptor.label.as_deref());
        self.buffers.lock().insert(
            buffer.as_raw(),
            BufferEntry {
                allocation,
                size: descriptor.size,
            },
        );
        Ok(BufferHandle(buffer.as_raw()))
    }

    pub(super) fn destroy_buffer_impl(&self, buffer: BufferHandle) {
        let entry = self.buffers.lock().remove(&buffer.0);
        unsafe {
            self.device
                .destroy_buffer(vk::Buffer::from_raw(buffer.0), None)
        };
        match entry {
            Some(entry) => self.free_allocation(entry.allocation),
            None => log::warn!("Destroyed buffer {:?} without an allocation", buffer),
        }
    }

    /// Copy `data` into a host-visible buffer at `offset`.
    pub(super) fn write_buffer_impl(
        &self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let buffers = self.buffers.lock();
        let entry = buffers.get(&buffer.0).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("Unknown buffer {:?}", buffer))
        })?;

        let end = offset.checked_add(data.len() as u64);
        if end.is_none_or(|end| end > entry.size) {
            return Err(GraphicsError::InvalidParameter(format!(
                "Write of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                entry.size
            )));
        }

        let Some(mapped_ptr) = entry.allocation.mapped_ptr() else {
            return Err(GraphicsError::InvalidParameter(
                "Buffer is not mapped for CPU access".to_string(),
            ));
        };

        // SAFETY: the range was checked against the buffer size and the
        // mapping covers the whole allocation
        unsafe {
            let dst = mapped_ptr.as_ptr().cast::<u8>().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(())
    }

    pub(super) fn create_sampler_impl(
        &self,
        descriptor: &SamplerDescriptor,
    ) -> Result<SamplerHandle, GraphicsError> {
        let filter = convert_filter_mode(descriptor.filter);
        let wrap = convert_wrap_mode(descriptor.wrap);
        let anisotropy = descriptor.max_anisotropy.filter(|max| *max > 1.0);

        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter)
            .min_filter(filter)
            .mipmap_mode(convert_mipmap_filter_mode(descriptor.mipmap_filter))
            .address_mode_u(wrap)
            .address_mode_v(wrap)
            .address_mode_w(wrap)
            .mip_lod_bias(0.0)
            .anisotropy_enable(anisotropy.is_some())
            .max_anisotropy(anisotropy.unwrap_or(1.0))
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .min_lod(descriptor.lod_min_clamp)
            .max_lod(descriptor.lod_max_clamp)
            .border_color(convert_border_color(descriptor.border_color))
            .unnormalized_coordinates(false);

        let sampler = unsafe { self.device.create_sampler(&sampler_info, None) }
            .map_err(|e| vk_error("Failed to create sampler", e))?;
        set_object_name(self.debug_device.as_ref(), sampler, descriptor.label.as_deref());
        Ok(SamplerHandle(sampler.as_raw()))
    }
}
