//! Resource groups (descriptor sets) and push constants.

use std::collections::HashMap;

use crate::backend::{
    DescriptorBinding, DescriptorKind, DescriptorResource, DescriptorSetHandle,
    DescriptorSetLayoutHandle, DescriptorWrite, GpuBackend,
};
use crate::error::GraphicsError;
use crate::resources::{BufferRegistry, FrameSlot, ImageRegistry, SamplerRegistry};
use crate::types::ShaderStages;

/// Named push constant sizes.
#[derive(Debug, Default)]
pub struct PushConstantRegistry {
    sizes: HashMap<String, u32>,
}

impl PushConstantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a push constant block of `size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `name` is taken or `size` is zero or not a multiple of 4.
    pub fn create(&mut self, size: u32, name: &str) {
        assert!(
            !self.sizes.contains_key(name),
            "Attempted to create PushConstant with name: '{name}' which already exists!"
        );
        assert!(
            size > 0 && size % 4 == 0,
            "PushConstant '{name}' must have a non-zero size that is a multiple of 4 (got {size})"
        );
        self.sizes.insert(name.to_string(), size);
    }

    pub fn size(&self, name: &str) -> u32 {
        *self
            .sizes
            .get(name)
            .unwrap_or_else(|| panic!("PushConstant '{name}' does not exist!"))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sizes.contains_key(name)
    }
}

/// A resource bound by a group binding, referred to by registry name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupResource {
    UniformBuffer(String),
    StorageBuffer(String),
    Texture { image: String, sampler: String },
}

impl GroupResource {
    fn kind(&self) -> DescriptorKind {
        match self {
            Self::UniformBuffer(_) => DescriptorKind::UniformBuffer,
            Self::StorageBuffer(_) => DescriptorKind::StorageBuffer,
            Self::Texture { .. } => DescriptorKind::CombinedImageSampler,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupBinding {
    pub resource: GroupResource,
    pub stages: ShaderStages,
}

/// Declaration of a resource group. Binding numbers follow list order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResourceGroupInfo {
    pub bindings: Vec<GroupBinding>,
}

impl ResourceGroupInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uniform_buffer(mut self, buffer: impl Into<String>, stages: ShaderStages) -> Self {
        self.bindings.push(GroupBinding {
            resource: GroupResource::UniformBuffer(buffer.into()),
            stages,
        });
        self
    }

    pub fn with_storage_buffer(mut self, buffer: impl Into<String>, stages: ShaderStages) -> Self {
        self.bindings.push(GroupBinding {
            resource: GroupResource::StorageBuffer(buffer.into()),
            stages,
        });
        self
    }

    pub fn with_texture(
        mut self,
        image: impl Into<String>,
        sampler: impl Into<String>,
        stages: ShaderStages,
    ) -> Self {
        self.bindings.push(GroupBinding {
            resource: GroupResource::Texture {
                image: image.into(),
                sampler: sampler.into(),
            },
            stages,
        });
        self
    }

    fn layout_bindings(&self) -> Vec<DescriptorBinding> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| DescriptorBinding {
                binding: index as u32,
                kind: binding.resource.kind(),
                stages: binding.stages,
            })
            .collect()
    }

    /// Descriptor writes for frame slot `frame`.
    fn writes(
        &self,
        frame: usize,
        images: &ImageRegistry,
        buffers: &BufferRegistry,
        samplers: &SamplerRegistry,
    ) -> Vec<DescriptorWrite> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| {
                let resource = match &binding.resource {
                    GroupResource::UniformBuffer(name) | GroupResource::StorageBuffer(name) => {
                        let buffer = buffers.get(name, FrameSlot::Current, frame);
                        DescriptorResource::Buffer {
                            buffer: buffer.handle,
                            size: buffer.size,
                        }
                    }
                    GroupResource::Texture { image, sampler } => DescriptorResource::ImageSampler {
                        view: images.get(image, FrameSlot::Current, frame).view,
                        sampler: samplers.get(sampler, FrameSlot::Current, frame).handle,
                    },
                };
                DescriptorWrite {
                    binding: index as u32,
                    kind: binding.resource.kind(),
                    resource,
                }
            })
            .collect()
    }
}

/// A descriptor set layout with one descriptor set per frame in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroup {
    pub layout: DescriptorSetLayoutHandle,
    pub sets: Vec<DescriptorSetHandle>,
}

impl ResourceGroup {
    fn destroy(self, backend: &dyn GpuBackend) {
        for set in self.sets {
            backend.free_descriptor_set(set);
        }
        backend.destroy_descriptor_set_layout(self.layout);
    }
}

/// All resource groups of a context, keyed by name.
#[derive(Debug, Default)]
pub struct ResourceGroupRegistry {
    groups: HashMap<String, (ResourceGroupInfo, ResourceGroup)>,
}

impl ResourceGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the group `name` and write every frame's descriptor set.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        backend: &dyn GpuBackend,
        images: &ImageRegistry,
        buffers: &BufferRegistry,
        samplers: &SamplerRegistry,
        info: &ResourceGroupInfo,
        name: &str,
        frames: usize,
    ) -> Result<(), GraphicsError> {
        assert!(
            !self.groups.contains_key(name),
            "Attempted to create ResourceGroup with name: '{name}' which already exists!"
        );

        let layout = backend.create_descriptor_set_layout(&info.layout_bindings())?;
        let mut group = ResourceGroup {
            layout,
            sets: Vec::with_capacity(frames),
        };
        for frame in 0..frames {
            match backend.allocate_descriptor_set(layout) {
                Ok(set) => {
                    backend.write_descriptor_set(set, &info.writes(frame, images, buffers, samplers));
                    group.sets.push(set);
                }
                Err(e) => {
                    group.destroy(backend);
                    return Err(e);
                }
            }
        }

        log::debug!(
            "Created resource group '{}' ({} bindings)",
            name,
            info.bindings.len()
        );
        self.groups.insert(name.to_string(), (info.clone(), group));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn get(&self, name: &str) -> &ResourceGroup {
        &self
            .groups
            .get(name)
            .unwrap_or_else(|| panic!("ResourceGroup '{name}' does not exist!"))
            .1
    }

    /// Rewrite every descriptor set, picking up recreated or replaced
    /// resources. Set handles stay the same.
    pub fn refresh(
        &self,
        backend: &dyn GpuBackend,
        images: &ImageRegistry,
        buffers: &BufferRegistry,
        samplers: &SamplerRegistry,
    ) {
        for (info, group) in self.groups.values() {
            for (frame, set) in group.sets.iter().enumerate() {
                backend.write_descriptor_set(*set, &info.writes(frame, images, buffers, samplers));
            }
        }
    }

    pub fn destroy(&mut self, backend: &dyn GpuBackend) {
        for (_, (_, group)) in self.groups.drain() {
            group.destroy(backend);
        }
    }
}
