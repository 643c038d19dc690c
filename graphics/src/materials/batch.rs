//! Per-material drawable batches, culling and indirect command building.

use std::collections::HashMap;

use prism_core::Camera;

use crate::backend::GpuBackend;
use crate::effect::{ActiveEffect, FrameRecorder, RenderEffectRegistry};
use crate::error::GraphicsError;
use crate::mesh::{INDEX_BUFFER, MeshRegistry};
use crate::resources::{BufferInfo, BufferRegistry, FrameSlot, NameTable};
use crate::types::{BufferUsage, DrawIndexedIndirectArgs, MemoryLocation};

use super::drawable::Drawable;

/// Per-frame buffer holding the indirect commands of every material.
pub const INDIRECT_COMMANDS_BUFFER: &str = "indirect_commands";

const DRAWABLE_SIZE: u64 = std::mem::size_of::<Drawable>() as u64;

/// Index of a material type in [`MaterialBatches`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// Declaration of a material type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialTypeInfo {
    pub name: String,
    /// Size in bytes of one material's constants.
    pub material_size: usize,
    /// Maximum number of persistent material instances.
    pub instance_capacity: usize,
    /// Maximum number of drawables per frame.
    pub batch_capacity: usize,
    /// Size in bytes of the world-data uniform.
    pub world_data_size: usize,
    /// Render effect the batch is drawn with.
    pub effect: String,
}

impl MaterialTypeInfo {
    pub fn new(name: impl Into<String>, effect: impl Into<String>, material_size: usize) -> Self {
        Self {
            name: name.into(),
            material_size,
            instance_capacity: 1024,
            batch_capacity: 16 * 1024,
            world_data_size: 256,
            effect: effect.into(),
        }
    }

    pub fn with_instance_capacity(mut self, capacity: usize) -> Self {
        self.instance_capacity = capacity;
        self
    }

    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }

    pub fn with_world_data_size(mut self, size: usize) -> Self {
        self.world_data_size = size;
        self
    }

    fn materials_buffer(&self) -> String {
        format!("{}_materials", self.name)
    }

    fn transforms_buffer(&self) -> String {
        format!("{}_transforms", self.name)
    }

    fn world_data_buffer(&self) -> String {
        format!("{}_world_data", self.name)
    }
}

/// Counters of one material type for the frame being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialCounts {
    /// First command of this material in the indirect buffer.
    pub draw_offset: u32,
    pub draw_count: u32,
    pub cull_count: u32,
    pub triangle_count: u32,
}

/// Totals over all material types, snapshotted by [`MaterialBatches::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialStats {
    pub draw_count: u32,
    pub cull_count: u32,
    pub triangle_count: u32,
}

#[derive(Debug)]
struct MaterialType {
    info: MaterialTypeInfo,
    instances: Vec<u8>,
    instance_count: usize,
    world_data: Vec<u8>,
    drawables: Vec<Drawable>,
    materials: Vec<u8>,
    counts: MaterialCounts,
}

/// All material types and their per-frame batches.
#[derive(Debug)]
pub struct MaterialBatches {
    types: Vec<MaterialType>,
    ids: HashMap<String, MaterialId>,
    commands: Vec<DrawIndexedIndirectArgs>,
    command_capacity: u32,
    frames: usize,
    stats: MaterialStats,
}

impl MaterialBatches {
    /// Create the per-frame indirect command buffer.
    pub fn new(
        backend: &dyn GpuBackend,
        names: &mut NameTable,
        buffers: &mut BufferRegistry,
        command_capacity: u32,
        frames: usize,
    ) -> Result<Self, GraphicsError> {
        let info = BufferInfo::new(
            u64::from(command_capacity) * DrawIndexedIndirectArgs::SIZE,
            BufferUsage::INDIRECT,
            MemoryLocation::CpuToGpu,
        );
        buffers.create_one_per_frame(backend, names, &info, INDIRECT_COMMANDS_BUFFER, frames)?;

        Ok(Self {
            types: Vec::new(),
            ids: HashMap::new(),
            commands: Vec::with_capacity(command_capacity as usize),
            command_capacity,
            frames,
            stats: MaterialStats::default(),
        })
    }

    /// Register a material type and create its per-frame material, transform
    /// and world-data buffers.
    ///
    /// # Panics
    ///
    /// Panics if the name is taken or a size or capacity is zero.
    pub fn add_material_type(
        &mut self,
        backend: &dyn GpuBackend,
        names: &mut NameTable,
        buffers: &mut BufferRegistry,
        info: &MaterialTypeInfo,
    ) -> Result<MaterialId, GraphicsError> {
        if self.ids.contains_key(&info.name) {
            panic!(
                "Attempted to create material type with name: '{}' which already exists!",
                info.name
            );
        }
        assert!(
            info.material_size > 0 && info.batch_capacity > 0 && info.world_data_size > 0,
            "Material type '{}' needs a non-zero material size, batch capacity and world data size",
            info.name
        );

        let batch = info.batch_capacity as u64;
        let storage = |size: u64| BufferInfo::new(size, BufferUsage::STORAGE, MemoryLocation::CpuToGpu);
        buffers.create_one_per_frame(
            backend,
            names,
            &storage(batch * info.material_size as u64),
            &info.materials_buffer(),
            self.frames,
        )?;
        buffers.create_one_per_frame(
            backend,
            names,
            &storage(batch * DRAWABLE_SIZE),
            &info.transforms_buffer(),
            self.frames,
        )?;
        buffers.create_one_per_frame(
            backend,
            names,
            &BufferInfo::new(
                info.world_data_size as u64,
                BufferUsage::UNIFORM,
                MemoryLocation::CpuToGpu,
            ),
            &info.world_data_buffer(),
            self.frames,
        )?;

        let id = MaterialId(self.types.len() as u32);
        self.types.push(MaterialType {
            info: info.clone(),
            instances: Vec::new(),
            instance_count: 0,
            world_data: vec![0; info.world_data_size],
            drawables: Vec::with_capacity(info.batch_capacity),
            materials: Vec::with_capacity(info.batch_capacity * info.material_size),
            counts: MaterialCounts::default(),
        });
        self.ids.insert(info.name.clone(), id);
        log::debug!("Added material type '{}' ({})", info.name, id.0);
        Ok(id)
    }

    /// Look up a material type by name.
    pub fn material_id(&self, name: &str) -> MaterialId {
        *self
            .ids
            .get(name)
            .unwrap_or_else(|| panic!("Material type '{name}' does not exist!"))
    }

    fn material(&self, id: MaterialId) -> &MaterialType {
        self.types
            .get(id.0 as usize)
            .unwrap_or_else(|| panic!("Material type {} does not exist!", id.0))
    }

    fn material_mut(&mut self, id: MaterialId) -> &mut MaterialType {
        self.types
            .get_mut(id.0 as usize)
            .unwrap_or_else(|| panic!("Material type {} does not exist!", id.0))
    }

    pub fn info(&self, id: MaterialId) -> &MaterialTypeInfo {
        &self.material(id).info
    }

    /// Store persistent material constants and return their index.
    pub fn add_material_instance(&mut self, id: MaterialId, data: &[u8]) -> usize {
        let material = self.material_mut(id);
        let info = &material.info;
        assert_eq!(
            data.len(),
            info.material_size,
            "Material '{}' expects {} bytes of constants",
            info.name,
            info.material_size
        );
        assert!(
            material.instance_count < info.instance_capacity,
            "Material '{}' has no room for more than {} instances",
            info.name,
            info.instance_capacity
        );
        material.instances.extend_from_slice(data);
        material.instance_count += 1;
        material.instance_count - 1
    }

    pub fn material_instance(&self, id: MaterialId, index: usize) -> &[u8] {
        let material = self.material(id);
        assert!(
            index < material.instance_count,
            "Material '{}' has no instance {}",
            material.info.name,
            index
        );
        let size = material.info.material_size;
        &material.instances[index * size..(index + 1) * size]
    }

    /// Set the world data uploaded with the next [`build_commands`].
    ///
    /// [`build_commands`]: Self::build_commands
    pub fn set_world_data(&mut self, id: MaterialId, data: &[u8]) {
        let material = self.material_mut(id);
        assert!(
            data.len() <= material.info.world_data_size,
            "World data of material '{}' is {} bytes, got {}",
            material.info.name,
            material.info.world_data_size,
            data.len()
        );
        material.world_data[..data.len()].copy_from_slice(data);
    }

    /// Queue a drawable for this frame.
    ///
    /// # Panics
    ///
    /// Panics if the batch is full or `material` has the wrong size.
    pub fn push_drawable(&mut self, id: MaterialId, drawable: Drawable, material: &[u8]) {
        let entry = self.material_mut(id);
        let info = &entry.info;
        assert!(
            entry.drawables.len() < info.batch_capacity,
            "Material batch '{}' is full ({} drawables)",
            info.name,
            info.batch_capacity
        );
        assert_eq!(
            material.len(),
            info.material_size,
            "Material '{}' expects {} bytes of constants",
            info.name,
            info.material_size
        );
        entry.drawables.push(drawable);
        entry.materials.extend_from_slice(material);
    }

    /// Queue a drawable using a stored material instance.
    pub fn push_instance(&mut self, id: MaterialId, drawable: Drawable, instance: usize) {
        let material = self.material_instance(id, instance).to_vec();
        self.push_drawable(id, drawable, &material);
    }

    /// Cull every queued drawable, write the surviving draws into the frame's
    /// indirect buffer and upload the batches.
    #[allow(clippy::too_many_arguments)]
    pub fn build_commands(
        &mut self,
        backend: &dyn GpuBackend,
        buffers: &BufferRegistry,
        meshes: &MeshRegistry,
        camera: &Camera,
        aspect: f32,
        frame_index: usize,
    ) -> Result<(), GraphicsError> {
        prism_core::profile_scope!("build_commands");

        let frustum = camera.frustum(aspect);
        self.commands.clear();

        for material in &mut self.types {
            let info = &material.info;
            let draw_offset = self.commands.len() as u32;
            let mut triangle_count = 0;

            for (index, drawable) in material.drawables.iter().enumerate() {
                if !frustum.is_sphere_visible(&drawable.transform.position, drawable.bounding_radius())
                {
                    continue;
                }
                let model = meshes.model(drawable.model.id);
                let mesh = meshes.mesh(model.select_lod(drawable.angular_size(&camera.position)));
                assert!(
                    self.commands.len() < self.command_capacity as usize,
                    "Indirect command buffer is full ({} commands)",
                    self.command_capacity
                );
                self.commands.push(DrawIndexedIndirectArgs::single(
                    mesh.count,
                    mesh.offset,
                    index as u32,
                ));
                triangle_count += mesh.count / 3;
            }

            let draw_count = self.commands.len() as u32 - draw_offset;
            material.counts = MaterialCounts {
                draw_offset,
                draw_count,
                cull_count: material.drawables.len() as u32 - draw_count,
                triangle_count,
            };

            let slot = FrameSlot::Current;
            buffers.write(
                backend,
                &info.world_data_buffer(),
                slot,
                frame_index,
                0,
                &material.world_data,
            )?;
            if !material.drawables.is_empty() {
                buffers.write(
                    backend,
                    &info.transforms_buffer(),
                    slot,
                    frame_index,
                    0,
                    bytemuck::cast_slice(&material.drawables),
                )?;
                buffers.write(
                    backend,
                    &info.materials_buffer(),
                    slot,
                    frame_index,
                    0,
                    &material.materials,
                )?;
            }
        }

        if !self.commands.is_empty() {
            buffers.write(
                backend,
                INDIRECT_COMMANDS_BUFFER,
                FrameSlot::Current,
                frame_index,
                0,
                bytemuck::cast_slice(&self.commands),
            )?;
        }
        Ok(())
    }

    /// Draw every material type with surviving drawables through its effect.
    pub fn draw(
        &self,
        active: &mut ActiveEffect,
        recorder: &mut FrameRecorder<'_>,
        effects: &RenderEffectRegistry,
    ) {
        prism_core::profile_scope!("draw_material_batches");

        let frame = recorder.frame_index;
        let buffer = |name: &str| recorder.buffers.get(name, FrameSlot::Current, frame).handle;
        let vertex_buffers = MeshRegistry::vertex_streams().map(buffer);
        let index_buffer = buffer(INDEX_BUFFER);
        let commands = buffer(INDIRECT_COMMANDS_BUFFER);

        for material in &self.types {
            let counts = material.counts;
            if counts.draw_count == 0 {
                continue;
            }
            active.begin(recorder, effects, &material.info.effect);
            active.bind_vertex_buffers(recorder.backend, recorder.cmd, &vertex_buffers, index_buffer);
            recorder.backend.cmd_draw_indexed_indirect(
                recorder.cmd,
                commands,
                u64::from(counts.draw_offset) * DrawIndexedIndirectArgs::SIZE,
                counts.draw_count,
                DrawIndexedIndirectArgs::SIZE as u32,
            );
        }
    }

    /// Snapshot the totals of the frame and empty every batch.
    pub fn reset(&mut self) {
        let mut stats = MaterialStats::default();
        for material in &mut self.types {
            stats.draw_count += material.counts.draw_count;
            stats.cull_count += material.counts.cull_count;
            stats.triangle_count += material.counts.triangle_count;
            material.counts = MaterialCounts::default();
            material.drawables.clear();
            material.materials.clear();
        }
        self.stats = stats;
        self.commands.clear();
    }

    /// Counters of `id` for the frame being built.
    pub fn counts(&self, id: MaterialId) -> MaterialCounts {
        self.material(id).counts
    }

    /// Totals of the last frame, as of the last [`reset`](Self::reset).
    pub fn stats(&self) -> MaterialStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Commands built for the current frame, in indirect buffer order.
    pub fn commands(&self) -> &[DrawIndexedIndirectArgs] {
        &self.commands
    }
}
