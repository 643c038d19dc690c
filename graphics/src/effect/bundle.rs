//! Resource bundles: pipeline layouts built from resource groups.

use std::collections::HashMap;

use crate::backend::{
    DescriptorSetHandle, GpuBackend, PipelineLayoutDescriptor, PipelineLayoutHandle,
    PushConstantRange,
};
use crate::error::GraphicsError;
use crate::types::ShaderStages;

use super::group::{PushConstantRegistry, ResourceGroupRegistry};

/// Maximum number of resource groups in one bundle.
pub const MAX_RESOURCE_GROUPS: usize = 4;

/// Declaration of a resource bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResourceBundleInfo {
    /// Groups in set-binding order.
    pub resource_groups: Vec<String>,
    pub push_constant: Option<String>,
}

impl ResourceBundleInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.resource_groups.push(group.into());
        self
    }

    pub fn with_push_constant(mut self, push_constant: impl Into<String>) -> Self {
        self.push_constant = Some(push_constant.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBundle {
    pub layout: PipelineLayoutHandle,
    pub push_constant: Option<PushConstantRange>,
    /// Descriptor sets to bind for each frame slot, in set order.
    pub descriptor_sets: Vec<Vec<DescriptorSetHandle>>,
}

/// All resource bundles of a context, keyed by name.
#[derive(Debug, Default)]
pub struct ResourceBundleRegistry {
    bundles: HashMap<String, ResourceBundle>,
}

impl ResourceBundleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the bundle `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is taken, more than [`MAX_RESOURCE_GROUPS`] groups
    /// are listed, or a group or push constant is unknown.
    pub fn create(
        &mut self,
        backend: &dyn GpuBackend,
        groups: &ResourceGroupRegistry,
        push_constants: &PushConstantRegistry,
        info: &ResourceBundleInfo,
        name: &str,
        frames: usize,
    ) -> Result<(), GraphicsError> {
        assert!(
            !self.bundles.contains_key(name),
            "Attempted to create ResourceBundle with name: '{name}' which already exists!"
        );
        assert!(
            info.resource_groups.len() <= MAX_RESOURCE_GROUPS,
            "Resource groups cannot be more than {MAX_RESOURCE_GROUPS} (bundle '{name}' lists {})",
            info.resource_groups.len()
        );

        let resource_groups: Vec<_> = info
            .resource_groups
            .iter()
            .map(|group| groups.get(group))
            .collect();

        let push_constant = info.push_constant.as_deref().map(|push| PushConstantRange {
            offset: 0,
            size: push_constants.size(push),
            stages: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
        });

        let layout = backend.create_pipeline_layout(&PipelineLayoutDescriptor {
            set_layouts: resource_groups.iter().map(|group| group.layout).collect(),
            push_constant,
        })?;

        let descriptor_sets = (0..frames)
            .map(|frame| resource_groups.iter().map(|group| group.sets[frame]).collect())
            .collect();

        log::debug!(
            "Created resource bundle '{}' ({} groups, push constant: {:?})",
            name,
            resource_groups.len(),
            push_constant.map(|range| range.size)
        );
        self.bundles.insert(
            name.to_string(),
            ResourceBundle {
                layout,
                push_constant,
                descriptor_sets,
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }

    pub fn get(&self, name: &str) -> &ResourceBundle {
        self.bundles
            .get(name)
            .unwrap_or_else(|| panic!("ResourceBundle '{name}' does not exist!"))
    }

    pub fn destroy(&mut self, backend: &dyn GpuBackend) {
        for (_, bundle) in self.bundles.drain() {
            backend.destroy_pipeline_layout(bundle.layout);
        }
    }
}
