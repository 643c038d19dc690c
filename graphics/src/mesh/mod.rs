//! Mesh storage for the graphics engine.
//!
//! All meshes share four GPU buffers (positions, normals, uvs and `u32`
//! indices). Each mesh is a contiguous run in those buffers, placed by a
//! [`LinearAllocationTracker`](crate::resources::LinearAllocationTracker):
//!
//! - [`MeshRegistry`] - owns the trackers and ingests meshes
//! - [`MeshInstance`] - the index range of one mesh plus its normalization scale
//! - [`ModelInstance`] - up to four LOD meshes picked by angular size
//!
//! Indices are rebased by the mesh's vertex offset on upload, so every draw
//! uses a vertex offset of zero.

mod model;
mod registry;

pub use model::{DEFAULT_LOD_THRESHOLDS, LOD_COUNT, ModelId, ModelInstance};
pub use registry::{
    INDEX_BUFFER, MeshId, MeshInstance, MeshRegistry, NORMAL_BUFFER, POSITION_BUFFER, UV_BUFFER,
};
