//! Buffer resources and their registry.
//!
//! A buffer's size is fixed for its lifetime. Growing a buffer means
//! replacing it: a new buffer is created, the old contents are copied with a
//! one-shot command buffer and the old buffer is destroyed.

use std::collections::HashMap;

use crate::backend::{self, BufferHandle, GpuBackend};
use crate::error::GraphicsError;
use crate::types::{BufferCopy, BufferDescriptor, BufferUsage, MemoryLocation};

use super::registry::{
    Cardinality, FrameSlot, NameTable, Registry, ResourceClass, ResourceKind, ResourceSlot,
    create_all,
};

/// Declaration of a buffer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferInfo {
    pub size: u64,
    pub usage: BufferUsage,
    pub location: MemoryLocation,
}

impl BufferInfo {
    pub fn new(size: u64, usage: BufferUsage, location: MemoryLocation) -> Self {
        Self {
            size,
            usage,
            location,
        }
    }

    fn descriptor(&self, name: &str) -> BufferDescriptor {
        // Every registered buffer can take part in a replacement copy.
        let usage = self.usage | BufferUsage::TRANSFER_SRC | BufferUsage::TRANSFER_DST;
        BufferDescriptor::new(self.size, usage, self.location).with_label(name)
    }
}

/// A GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferResource {
    pub handle: BufferHandle,
    pub size: u64,
    pub usage: BufferUsage,
    pub location: MemoryLocation,
}

/// All buffers of a context, keyed by name.
#[derive(Debug, Default)]
pub struct BufferRegistry {
    buffers: Registry<BufferResource>,
    infos: HashMap<String, BufferInfo>,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    const fn kind(cardinality: Cardinality) -> ResourceKind {
        ResourceKind::new(ResourceClass::Buffer, cardinality)
    }

    fn allocate(
        backend: &dyn GpuBackend,
        info: &BufferInfo,
        name: &str,
    ) -> Result<BufferResource, GraphicsError> {
        let handle = backend.create_buffer(&info.descriptor(name))?;
        Ok(BufferResource {
            handle,
            size: info.size,
            usage: info.usage,
            location: info.location,
        })
    }

    /// Create a single buffer.
    pub fn create_one(
        &mut self,
        backend: &dyn GpuBackend,
        names: &mut NameTable,
        info: &BufferInfo,
        name: &str,
    ) -> Result<(), GraphicsError> {
        let association = names.associate(name, Self::kind(Cardinality::One));
        let resource =
            Self::allocate(backend, info, name).inspect_err(|_| names.revert(name, association))?;
        self.buffers.insert(name, ResourceSlot::Single(resource));
        self.infos.insert(name.to_string(), *info);
        log::debug!("Created buffer '{}' ({} bytes)", name, info.size);
        Ok(())
    }

    /// Append a buffer to the array `name`, returning its index.
    pub fn create_array(
        &mut self,
        backend: &dyn GpuBackend,
        names: &mut NameTable,
        info: &BufferInfo,
        name: &str,
    ) -> Result<usize, GraphicsError> {
        let association = names.associate(name, Self::kind(Cardinality::Array));
        let resource =
            Self::allocate(backend, info, name).inspect_err(|_| names.revert(name, association))?;
        self.infos.entry(name.to_string()).or_insert(*info);
        Ok(self.buffers.push_array(name, resource))
    }

    /// Create one buffer per frame in flight.
    pub fn create_one_per_frame(
        &mut self,
        backend: &dyn GpuBackend,
        names: &mut NameTable,
        info: &BufferInfo,
        name: &str,
        frames: usize,
    ) -> Result<(), GraphicsError> {
        let association = names.associate(name, Self::kind(Cardinality::PerFrame));
        let resources = create_all(
            frames,
            || Self::allocate(backend, info, name),
            |resource| backend.destroy_buffer(resource.handle),
        )
        .inspect_err(|_| names.revert(name, association))?;
        self.buffers.insert(name, ResourceSlot::PerFrame(resources));
        self.infos.insert(name.to_string(), *info);
        log::debug!(
            "Created per-frame buffer '{}' ({} bytes x{})",
            name,
            info.size,
            frames
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains(name)
    }

    pub fn slot(&self, name: &str) -> &ResourceSlot<BufferResource> {
        self.buffers.slot(name)
    }

    pub fn get(&self, name: &str, slot: FrameSlot, frame_index: usize) -> &BufferResource {
        self.buffers.get(name, slot, frame_index)
    }

    /// Upload `data` into a host-visible buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer lives in GPU-only memory.
    pub fn write(
        &self,
        backend: &dyn GpuBackend,
        name: &str,
        slot: FrameSlot,
        frame_index: usize,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let buffer = self.get(name, slot, frame_index);
        assert!(
            buffer.location == MemoryLocation::CpuToGpu,
            "Buffer '{name}' is not host visible; upload through a staging copy"
        );
        backend.write_buffer(buffer.handle, offset, data)
    }

    /// Upload `data` into a GPU-only buffer through a temporary staging buffer.
    pub fn upload(
        &self,
        backend: &dyn GpuBackend,
        name: &str,
        slot: FrameSlot,
        frame_index: usize,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        if data.is_empty() {
            return Ok(());
        }
        let dst = self.get(name, slot, frame_index).handle;
        let staging = backend.create_buffer(&BufferDescriptor::new(
            data.len() as u64,
            BufferUsage::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
        ))?;
        let result = backend.write_buffer(staging, 0, data).and_then(|()| {
            backend::submit_one_shot(backend, |cmd| {
                backend.cmd_copy_buffer(
                    cmd,
                    staging,
                    dst,
                    &[BufferCopy {
                        src_offset: 0,
                        dst_offset: offset,
                        size: data.len() as u64,
                    }],
                );
            })
        });
        backend.destroy_buffer(staging);
        result
    }

    /// Replace every instance of `name` with a buffer of `new_size` bytes,
    /// preserving the old contents.
    ///
    /// Waits for the device to go idle first, so no in-flight frame can still
    /// read the old buffers. Every replacement is created and filled before
    /// any old buffer is touched; on failure the replacements are destroyed
    /// and `name` keeps its old buffers and size.
    pub fn replace_buffer(
        &mut self,
        backend: &dyn GpuBackend,
        name: &str,
        new_size: u64,
    ) -> Result<(), GraphicsError> {
        backend.wait_idle()?;

        let mut info = *self
            .infos
            .get(name)
            .unwrap_or_else(|| panic!("Resource '{name}' does not exist!"));
        info.size = new_size;

        let olds: Vec<BufferResource> = self.buffers.slot(name).values().copied().collect();
        let mut pending = olds.iter();
        let replacements = create_all(
            olds.len(),
            || {
                let old = pending.next().ok_or_else(|| {
                    GraphicsError::Internal(format!("buffer '{name}' changed during replacement"))
                })?;
                let replacement = Self::allocate(backend, &info, name)?;
                Self::copy_contents(backend, old, &replacement)
                    .inspect_err(|_| backend.destroy_buffer(replacement.handle))?;
                Ok(replacement)
            },
            |replacement| backend.destroy_buffer(replacement.handle),
        )?;

        for (resource, replacement) in self
            .buffers
            .slot_mut(name)
            .values_mut()
            .zip(replacements)
        {
            backend.destroy_buffer(resource.handle);
            *resource = replacement;
        }

        self.infos.insert(name.to_string(), info);
        log::debug!("Replaced buffer '{}' ({} bytes)", name, new_size);
        Ok(())
    }

    fn copy_contents(
        backend: &dyn GpuBackend,
        old: &BufferResource,
        replacement: &BufferResource,
    ) -> Result<(), GraphicsError> {
        let copy_size = old.size.min(replacement.size);
        if copy_size == 0 {
            return Ok(());
        }
        backend::submit_one_shot(backend, |cmd| {
            backend.cmd_copy_buffer(
                cmd,
                old.handle,
                replacement.handle,
                &[BufferCopy {
                    src_offset: 0,
                    dst_offset: 0,
                    size: copy_size,
                }],
            );
        })
    }

    /// Destroy every buffer.
    pub fn destroy(&mut self, backend: &dyn GpuBackend, names: &mut NameTable) {
        for (name, slot) in self.buffers.drain() {
            for resource in slot.into_values() {
                backend.destroy_buffer(resource.handle);
            }
            names.release(&name);
        }
        self.infos.clear();
    }
}
