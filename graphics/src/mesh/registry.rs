//! Shared vertex/index buffers and mesh ingestion.

use prism_core::math::{Vec2, Vec3, half_extents, normalize_to_max_length};

use crate::backend::GpuBackend;
use crate::error::GraphicsError;
use crate::resources::{BufferInfo, BufferRegistry, FrameSlot, LinearAllocationTracker, NameTable};
use crate::types::{BufferUsage, MemoryLocation};

use super::model::{ModelId, ModelInstance};
use crate::materials::Model;

pub const POSITION_BUFFER: &str = "mesh_positions";
pub const NORMAL_BUFFER: &str = "mesh_normals";
pub const UV_BUFFER: &str = "mesh_uvs";
pub const INDEX_BUFFER: &str = "mesh_indices";

const VEC3_SIZE: u64 = std::mem::size_of::<Vec3>() as u64;
const VEC2_SIZE: u64 = std::mem::size_of::<Vec2>() as u64;
const INDEX_SIZE: u64 = std::mem::size_of::<u32>() as u64;

/// Longest half extent a mesh is normalized to.
const NORMALIZED_HALF_EXTENT: f32 = 2.0;

/// Identifier of a [`MeshInstance`].
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MeshId(pub u32);

/// Location of one mesh in the shared index buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshInstance {
    pub id: MeshId,
    /// First index.
    pub offset: u32,
    /// Number of indices.
    pub count: u32,
    /// Half extents clamped to a maximum length of 2, used to size models.
    pub scale: Vec3,
}

/// Owner of the shared mesh buffers, the meshes placed in them and the
/// models built from those meshes.
#[derive(Debug)]
pub struct MeshRegistry {
    vertices: LinearAllocationTracker,
    indices: LinearAllocationTracker,
    meshes: Vec<MeshInstance>,
    models: Vec<ModelInstance>,
    model_scales: Vec<Vec3>,
}

impl MeshRegistry {
    /// Create the shared buffers with room for `vertex_capacity` vertices and
    /// `index_capacity` indices.
    pub fn new(
        backend: &dyn GpuBackend,
        names: &mut NameTable,
        buffers: &mut BufferRegistry,
        vertex_capacity: u32,
        index_capacity: u32,
    ) -> Result<Self, GraphicsError> {
        let vertex_count = u64::from(vertex_capacity);
        let streams = [
            (POSITION_BUFFER, vertex_count * VEC3_SIZE, BufferUsage::VERTEX),
            (NORMAL_BUFFER, vertex_count * VEC3_SIZE, BufferUsage::VERTEX),
            (UV_BUFFER, vertex_count * VEC2_SIZE, BufferUsage::VERTEX),
            (
                INDEX_BUFFER,
                u64::from(index_capacity) * INDEX_SIZE,
                BufferUsage::INDEX,
            ),
        ];
        for (name, size, usage) in streams {
            let info = BufferInfo::new(size, usage, MemoryLocation::GpuOnly);
            buffers.create_one(backend, names, &info, name)?;
        }

        Ok(Self {
            vertices: LinearAllocationTracker::new(vertex_capacity),
            indices: LinearAllocationTracker::new(index_capacity),
            meshes: Vec::new(),
            models: Vec::new(),
            model_scales: Vec::new(),
        })
    }

    /// Upload a mesh into the shared buffers.
    ///
    /// Indices are relative to the mesh's own vertices and are rebased on
    /// upload. Full buffers are grown by replacement, which waits for the
    /// device to go idle, so meshes should not be created mid-frame.
    ///
    /// Returns [`GraphicsError::InvalidParameter`] if an index does not refer
    /// to one of the given vertices.
    ///
    /// # Panics
    ///
    /// Panics if the vertex streams differ in length.
    pub fn create_mesh(
        &mut self,
        backend: &dyn GpuBackend,
        buffers: &mut BufferRegistry,
        positions: &[Vec3],
        normals: &[Vec3],
        uvs: &[Vec2],
        indices: &[u32],
    ) -> Result<MeshInstance, GraphicsError> {
        assert!(
            positions.len() == normals.len() && positions.len() == uvs.len(),
            "Mesh vertex streams differ in length: {} positions, {} normals, {} uvs",
            positions.len(),
            normals.len(),
            uvs.len()
        );
        let vertex_count = u32::try_from(positions.len()).map_err(|_| {
            GraphicsError::InvalidParameter(format!("{} vertices", positions.len()))
        })?;
        let index_count = u32::try_from(indices.len())
            .map_err(|_| GraphicsError::InvalidParameter(format!("{} indices", indices.len())))?;
        if let Some((position, index)) = indices
            .iter()
            .enumerate()
            .find(|&(_, &index)| index >= vertex_count)
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "index {index} at position {position} is out of range for {vertex_count} vertices"
            )));
        }

        if !self.vertices.can_allocate(vertex_count) {
            let capacity = self.vertices.grown_capacity_for(vertex_count);
            let count = u64::from(capacity);
            buffers.replace_buffer(backend, POSITION_BUFFER, count * VEC3_SIZE)?;
            buffers.replace_buffer(backend, NORMAL_BUFFER, count * VEC3_SIZE)?;
            buffers.replace_buffer(backend, UV_BUFFER, count * VEC2_SIZE)?;
            self.vertices.grow(capacity);
            log::debug!("Grew mesh vertex buffers to {} vertices", capacity);
        }
        if !self.indices.can_allocate(index_count) {
            let capacity = self.indices.grown_capacity_for(index_count);
            buffers.replace_buffer(backend, INDEX_BUFFER, u64::from(capacity) * INDEX_SIZE)?;
            self.indices.grow(capacity);
            log::debug!("Grew mesh index buffer to {} indices", capacity);
        }

        let vertex_offset = self.vertices.alloc(vertex_count);
        let index_offset = self.indices.alloc(index_count);
        let rebased: Vec<u32> = indices.iter().map(|index| index + vertex_offset).collect();

        let first_vertex = u64::from(vertex_offset);
        buffers.upload(
            backend,
            POSITION_BUFFER,
            FrameSlot::Current,
            0,
            first_vertex * VEC3_SIZE,
            bytemuck::cast_slice(positions),
        )?;
        buffers.upload(
            backend,
            NORMAL_BUFFER,
            FrameSlot::Current,
            0,
            first_vertex * VEC3_SIZE,
            bytemuck::cast_slice(normals),
        )?;
        buffers.upload(
            backend,
            UV_BUFFER,
            FrameSlot::Current,
            0,
            first_vertex * VEC2_SIZE,
            bytemuck::cast_slice(uvs),
        )?;
        buffers.upload(
            backend,
            INDEX_BUFFER,
            FrameSlot::Current,
            0,
            u64::from(index_offset) * INDEX_SIZE,
            bytemuck::cast_slice(&rebased),
        )?;

        let mesh = MeshInstance {
            id: MeshId(self.meshes.len() as u32),
            offset: index_offset,
            count: index_count,
            scale: normalize_to_max_length(half_extents(positions), NORMALIZED_HALF_EXTENT),
        };
        self.meshes.push(mesh);
        log::debug!(
            "Created mesh {} ({} vertices, {} indices)",
            mesh.id.0,
            vertex_count,
            index_count
        );
        Ok(mesh)
    }

    /// Register a set of LOD meshes. The model is sized by its finest mesh.
    ///
    /// # Panics
    ///
    /// Panics if any mesh does not exist.
    pub fn create_model_instance(&mut self, instance: ModelInstance) -> ModelId {
        let scale = self.mesh(instance.meshes[0]).scale;
        for mesh in &instance.meshes[1..] {
            self.mesh(*mesh);
        }
        let id = ModelId(self.models.len() as u32);
        self.models.push(instance);
        self.model_scales.push(scale);
        id
    }

    /// A drawable model of `id` scaled by `scale`.
    pub fn create_model(&self, id: ModelId, scale: Vec3) -> Model {
        Model {
            half_extents: scale.component_mul(&self.model_scale(id)),
            id,
        }
    }

    pub fn mesh(&self, id: MeshId) -> &MeshInstance {
        self.meshes
            .get(id.0 as usize)
            .unwrap_or_else(|| panic!("Mesh {} does not exist!", id.0))
    }

    pub fn model(&self, id: ModelId) -> &ModelInstance {
        self.models
            .get(id.0 as usize)
            .unwrap_or_else(|| panic!("Model {} does not exist!", id.0))
    }

    pub fn model_scale(&self, id: ModelId) -> Vec3 {
        self.model(id);
        self.model_scales[id.0 as usize]
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.size()
    }

    pub fn index_count(&self) -> u32 {
        self.indices.size()
    }

    /// Vertex stream buffer names in binding order.
    pub fn vertex_streams() -> [&'static str; 3] {
        [POSITION_BUFFER, NORMAL_BUFFER, UV_BUFFER]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    struct Fixture {
        backend: DummyBackend,
        names: NameTable,
        buffers: BufferRegistry,
        meshes: MeshRegistry,
    }

    fn fixture(vertex_capacity: u32, index_capacity: u32) -> Fixture {
        let backend = DummyBackend::new();
        let mut names = NameTable::new();
        let mut buffers = BufferRegistry::new();
        let meshes = MeshRegistry::new(
            &backend,
            &mut names,
            &mut buffers,
            vertex_capacity,
            index_capacity,
        )
        .unwrap();
        Fixture {
            backend,
            names,
            buffers,
            meshes,
        }
    }

    fn triangle(size: f32) -> (Vec<Vec3>, Vec<Vec3>, Vec<Vec2>, Vec<u32>) {
        (
            vec![
                Vec3::new(-size, 0.0, 0.0),
                Vec3::new(size, 0.0, 0.0),
                Vec3::new(0.0, size, 0.0),
            ],
            vec![Vec3::z(); 3],
            vec![Vec2::zeros(); 3],
            vec![0, 1, 2],
        )
    }

    fn read_indices(f: &Fixture, count: usize) -> Vec<u32> {
        let handle = f.buffers.get(INDEX_BUFFER, FrameSlot::Current, 0).handle;
        let bytes = f.backend.read_buffer(handle);
        bytes[..count * 4]
            .chunks_exact(4)
            .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    #[test]
    fn test_meshes_are_packed() {
        let mut f = fixture(16, 16);
        let (p, n, u, i) = triangle(1.0);
        let first = f
            .meshes
            .create_mesh(&f.backend, &mut f.buffers, &p, &n, &u, &i)
            .unwrap();
        let second = f
            .meshes
            .create_mesh(&f.backend, &mut f.buffers, &p, &n, &u, &i)
            .unwrap();

        assert_eq!((first.offset, first.count), (0, 3));
        assert_eq!((second.offset, second.count), (3, 3));
        assert_eq!(second.id, MeshId(1));
        assert_eq!(read_indices(&f, 6), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(f.meshes.vertex_count(), 6);
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut f = fixture(16, 16);
        let (p, n, u, _) = triangle(1.0);
        let result = f
            .meshes
            .create_mesh(&f.backend, &mut f.buffers, &p, &n, &u, &[0, 1, 3]);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
        assert_eq!(f.meshes.vertex_count(), 0);

        let result = f
            .meshes
            .create_mesh(&f.backend, &mut f.buffers, &p, &n, &u, &[0, 1, u32::MAX]);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));

        let (p, n, u, i) = triangle(1.0);
        let mesh = f
            .meshes
            .create_mesh(&f.backend, &mut f.buffers, &p, &n, &u, &i)
            .unwrap();
        assert_eq!(mesh.offset, 0);
    }

    #[test]
    fn test_scale_is_clamped_half_extents() {
        let mut f = fixture(16, 16);
        let (p, n, u, i) = triangle(1.0);
        let small = f
            .meshes
            .create_mesh(&f.backend, &mut f.buffers, &p, &n, &u, &i)
            .unwrap();
        assert_eq!(small.scale, Vec3::new(1.0, 0.5, 0.0));

        let (p, n, u, i) = triangle(10.0);
        let large = f
            .meshes
            .create_mesh(&f.backend, &mut f.buffers, &p, &n, &u, &i)
            .unwrap();
        assert!((large.scale.norm() - NORMALIZED_HALF_EXTENT).abs() < 1e-5);
    }

    #[test]
    fn test_full_buffers_grow_and_keep_contents() {
        let mut f = fixture(4, 4);
        let (p, n, u, i) = triangle(1.0);
        f.meshes
            .create_mesh(&f.backend, &mut f.buffers, &p, &n, &u, &i)
            .unwrap();
        let old = f.buffers.get(INDEX_BUFFER, FrameSlot::Current, 0).handle;

        let second = f
            .meshes
            .create_mesh(&f.backend, &mut f.buffers, &p, &n, &u, &i)
            .unwrap();
        let new = f.buffers.get(INDEX_BUFFER, FrameSlot::Current, 0);

        assert_ne!(new.handle, old);
        assert_eq!(new.size, 8 * INDEX_SIZE);
        assert_eq!(second.offset, 3);
        assert_eq!(read_indices(&f, 6), vec![0, 1, 2, 3, 4, 5]);
        assert!(f.backend.wait_idle_count() >= 1);
    }

    #[test]
    #[should_panic(expected = "Mesh vertex streams differ in length")]
    fn test_mismatched_streams_panic() {
        let mut f = fixture(16, 16);
        let (p, n, _, i) = triangle(1.0);
        let _ = f
            .meshes
            .create_mesh(&f.backend, &mut f.buffers, &p, &n, &[], &i);
    }

    #[test]
    fn test_model_uses_finest_mesh_scale() {
        let mut f = fixture(16, 16);
        let (p, n, u, i) = triangle(1.0);
        let mesh = f
            .meshes
            .create_mesh(&f.backend, &mut f.buffers, &p, &n, &u, &i)
            .unwrap();
        let id = f.meshes.create_model_instance(ModelInstance::single(mesh.id));

        let model = f.meshes.create_model(id, Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(model.id, id);
        assert_eq!(model.half_extents, Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    #[should_panic(expected = "Mesh 7 does not exist!")]
    fn test_model_with_unknown_mesh_panics() {
        let mut f = fixture(16, 16);
        f.meshes.create_model_instance(ModelInstance::single(MeshId(7)));
    }

    #[test]
    fn test_buffers_are_released() {
        let mut f = fixture(16, 16);
        f.buffers.destroy(&f.backend, &mut f.names);
        assert_eq!(f.backend.live_resource_count(), 0);
    }
}
