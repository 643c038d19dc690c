//! Sampler resources and their registry.

use crate::backend::{GpuBackend, SamplerHandle};
use crate::error::GraphicsError;
use crate::types::{FilterMode, SamplerDescriptor, WrapMode};

use super::registry::{
    Cardinality, FrameSlot, NameTable, Registry, ResourceClass, ResourceKind, ResourceSlot,
    create_all,
};

/// Declaration of a sampler resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerInfo {
    pub filter: FilterMode,
    pub wrap: WrapMode,
}

impl SamplerInfo {
    pub fn new(filter: FilterMode, wrap: WrapMode) -> Self {
        Self { filter, wrap }
    }
}

/// A sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerResource {
    pub handle: SamplerHandle,
}

/// All samplers of a context, keyed by name.
#[derive(Debug, Default)]
pub struct SamplerRegistry {
    samplers: Registry<SamplerResource>,
}

impl SamplerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    const fn kind(cardinality: Cardinality) -> ResourceKind {
        ResourceKind::new(ResourceClass::Sampler, cardinality)
    }

    fn allocate(
        backend: &dyn GpuBackend,
        info: &SamplerInfo,
        name: &str,
    ) -> Result<SamplerResource, GraphicsError> {
        let descriptor = SamplerDescriptor::new(info.filter, info.wrap).with_label(name);
        Ok(SamplerResource {
            handle: backend.create_sampler(&descriptor)?,
        })
    }

    pub fn create_one(
        &mut self,
        backend: &dyn GpuBackend,
        names: &mut NameTable,
        info: &SamplerInfo,
        name: &str,
    ) -> Result<(), GraphicsError> {
        let association = names.associate(name, Self::kind(Cardinality::One));
        let resource =
            Self::allocate(backend, info, name).inspect_err(|_| names.revert(name, association))?;
        self.samplers.insert(name, ResourceSlot::Single(resource));
        log::debug!("Created sampler '{}' ({:?}, {:?})", name, info.filter, info.wrap);
        Ok(())
    }

    pub fn create_array(
        &mut self,
        backend: &dyn GpuBackend,
        names: &mut NameTable,
        info: &SamplerInfo,
        name: &str,
    ) -> Result<usize, GraphicsError> {
        let association = names.associate(name, Self::kind(Cardinality::Array));
        let resource =
            Self::allocate(backend, info, name).inspect_err(|_| names.revert(name, association))?;
        Ok(self.samplers.push_array(name, resource))
    }

    pub fn create_one_per_frame(
        &mut self,
        backend: &dyn GpuBackend,
        names: &mut NameTable,
        info: &SamplerInfo,
        name: &str,
        frames: usize,
    ) -> Result<(), GraphicsError> {
        let association = names.associate(name, Self::kind(Cardinality::PerFrame));
        let resources = create_all(
            frames,
            || Self::allocate(backend, info, name),
            |resource| backend.destroy_sampler(resource.handle),
        )
        .inspect_err(|_| names.revert(name, association))?;
        self.samplers.insert(name, ResourceSlot::PerFrame(resources));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.samplers.contains(name)
    }

    pub fn get(&self, name: &str, slot: FrameSlot, frame_index: usize) -> &SamplerResource {
        self.samplers.get(name, slot, frame_index)
    }

    pub fn destroy(&mut self, backend: &dyn GpuBackend, names: &mut NameTable) {
        for (name, slot) in self.samplers.drain() {
            for resource in slot.into_values() {
                backend.destroy_sampler(resource.handle);
            }
            names.release(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn test_create_and_destroy() {
        let backend = DummyBackend::new();
        let mut names = NameTable::new();
        let mut samplers = SamplerRegistry::new();
        let info = SamplerInfo::new(FilterMode::Linear, WrapMode::Repeat);
        samplers
            .create_one(&backend, &mut names, &info, "linear_repeat")
            .unwrap();
        assert!(samplers.contains("linear_repeat"));

        samplers.destroy(&backend, &mut names);
        assert_eq!(backend.live_resource_count(), 0);
    }

    #[test]
    #[should_panic(expected = "which is a different resource type!")]
    fn test_name_shared_with_image_panics() {
        let backend = DummyBackend::new();
        let mut names = NameTable::new();
        names.associate(
            "shared",
            ResourceKind::new(ResourceClass::Image, Cardinality::One),
        );
        let mut samplers = SamplerRegistry::new();
        let _ = samplers.create_one(&backend, &mut names, &SamplerInfo::default(), "shared");
    }
}
