//! Models: sets of level-of-detail meshes.

use super::registry::MeshId;

/// Number of detail levels per model.
pub const LOD_COUNT: usize = 4;

/// Angular-size thresholds used when a model is created from a single mesh.
pub const DEFAULT_LOD_THRESHOLDS: [f32; LOD_COUNT] = [1.0, 0.125, 0.125 / 4.0, 0.125 / 16.0];

/// Identifier of a [`ModelInstance`] in a [`MeshRegistry`](super::MeshRegistry).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelId(pub u32);

/// Level-of-detail meshes of one model, finest first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInstance {
    pub meshes: [MeshId; LOD_COUNT],
    /// Level `i` (for `i > 0`) is used when the angular size falls below
    /// `thresholds[i]`. `thresholds[0]` is unused.
    pub thresholds: [f32; LOD_COUNT],
}

impl ModelInstance {
    pub fn new(meshes: [MeshId; LOD_COUNT], thresholds: [f32; LOD_COUNT]) -> Self {
        Self { meshes, thresholds }
    }

    /// A model that draws the same mesh at every distance.
    pub fn single(mesh: MeshId) -> Self {
        Self::new([mesh; LOD_COUNT], DEFAULT_LOD_THRESHOLDS)
    }

    /// Pick the mesh for an object of the given angular size
    /// (`|half_extents|² / distance²`).
    ///
    /// The coarsest level whose threshold exceeds the angular size wins.
    pub fn select_lod(&self, angular_size: f32) -> MeshId {
        let mut index = 0;
        for level in 1..LOD_COUNT {
            if self.thresholds[level] > angular_size {
                index = level;
            }
        }
        self.meshes[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lods() -> ModelInstance {
        ModelInstance::new(
            [MeshId(10), MeshId(11), MeshId(12), MeshId(13)],
            DEFAULT_LOD_THRESHOLDS,
        )
    }

    #[rstest]
    #[case(2.0, 10)]
    #[case(0.5, 10)]
    #[case(0.1, 11)]
    #[case(0.02, 12)]
    #[case(0.001, 13)]
    fn test_select_lod(#[case] angular_size: f32, #[case] expected: u32) {
        assert_eq!(lods().select_lod(angular_size), MeshId(expected));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(lods().select_lod(0.125), MeshId(10));
    }

    #[test]
    fn test_non_monotonic_thresholds_take_last_match() {
        let model = ModelInstance::new(
            [MeshId(0), MeshId(1), MeshId(2), MeshId(3)],
            [1.0, 0.01, 0.5, 0.0],
        );
        assert_eq!(model.select_lod(0.1), MeshId(2));
    }

    #[test]
    fn test_single_mesh_model() {
        let model = ModelInstance::single(MeshId(4));
        assert_eq!(model.select_lod(0.0), MeshId(4));
        assert_eq!(model.select_lod(100.0), MeshId(4));
    }
}
