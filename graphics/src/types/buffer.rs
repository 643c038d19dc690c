//! Buffer usage, placement and the indirect draw record.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

bitflags! {
    /// How a buffer may be bound or copied.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        const INDIRECT = 1 << 4;
        const TRANSFER_SRC = 1 << 5;
        const TRANSFER_DST = 1 << 6;
    }
}

/// Where the memory backing a buffer lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryLocation {
    /// Device-local memory, only reachable through copies.
    #[default]
    GpuOnly,
    /// Host-visible memory written by the CPU every frame.
    CpuToGpu,
}

/// What the backend needs to allocate one buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
    pub location: MemoryLocation,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage, location: MemoryLocation) -> Self {
        Self {
            label: None,
            size,
            usage,
            location,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One region of a buffer-to-buffer copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferCopy {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

/// One `vkCmdDrawIndexedIndirect` record as it is laid out in the indirect
/// buffer.
///
/// Material batches draw one instance per record; `first_instance` indexes
/// the batch's transform and material arrays.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<DrawIndexedIndirectArgs>(), 20);

impl DrawIndexedIndirectArgs {
    /// Stride of a record in the indirect buffer.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// A single-instance draw of the index range `[first_index, first_index + index_count)`.
    ///
    /// Mesh indices are already rebased onto the shared vertex buffer, so the
    /// vertex offset stays zero.
    pub fn single(index_count: u32, first_index: u32, first_instance: u32) -> Self {
        Self {
            index_count,
            instance_count: 1,
            first_index,
            vertex_offset: 0,
            first_instance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indirect_record_words() {
        let args = DrawIndexedIndirectArgs::single(36, 120, 7);
        let bytes = bytemuck::bytes_of(&args);
        assert_eq!(bytes.len() as u64, DrawIndexedIndirectArgs::SIZE);

        let words: &[u32] = bytemuck::cast_slice(bytes);
        assert_eq!(words, &[36, 1, 120, 0, 7]);
    }

    #[test]
    fn test_default_usage_is_empty() {
        assert!(BufferUsage::default().is_empty());
        let desc = BufferDescriptor::new(256, BufferUsage::UNIFORM, MemoryLocation::CpuToGpu)
            .with_label("world_data");
        assert_eq!(desc.label.as_deref(), Some("world_data"));
    }
}
