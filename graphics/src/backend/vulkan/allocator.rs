//! GPU memory allocator integration using gpu-allocator.

use ash::vk;
use gpu_allocator::MemoryLocation as AllocatorLocation;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};

use crate::error::GraphicsError;
use crate::types::MemoryLocation;

/// Create a memory allocator for the Vulkan device.
pub fn create_allocator(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
) -> Result<Allocator, GraphicsError> {
    Allocator::new(&AllocatorCreateDesc {
        instance: instance.clone(),
        device,
        physical_device,
        debug_settings: Default::default(),
        buffer_device_address: false,
        allocation_sizes: gpu_allocator::AllocationSizes::default(),
    })
    .map_err(|e| {
        GraphicsError::InitializationFailed(format!("Failed to create memory allocator: {}", e))
    })
}

pub fn convert_location(location: MemoryLocation) -> AllocatorLocation {
    match location {
        MemoryLocation::GpuOnly => AllocatorLocation::GpuOnly,
        MemoryLocation::CpuToGpu => AllocatorLocation::CpuToGpu,
    }
}

/// Map allocator failures, keeping memory exhaustion distinguishable.
pub fn allocation_error(what: &str, error: gpu_allocator::AllocationError) -> GraphicsError {
    match error {
        gpu_allocator::AllocationError::OutOfMemory => GraphicsError::OutOfMemory,
        other => GraphicsError::ResourceCreationFailed(format!(
            "Failed to allocate {} memory: {}",
            what, other
        )),
    }
}
