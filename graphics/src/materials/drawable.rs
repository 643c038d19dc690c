//! GPU-visible per-draw data.

use bytemuck::{Pod, Zeroable};
use prism_core::math::{Quat, Vec3};

use crate::mesh::ModelId;

/// World-space placement of a drawable.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::identity())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_position(Vec3::zeros())
    }
}

/// A model scaled to world-space half extents.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Model {
    pub half_extents: Vec3,
    pub id: ModelId,
}

/// One object to draw this frame. Uploaded as-is into the material's
/// transform buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Drawable {
    pub transform: Transform,
    pub model: Model,
}

impl Drawable {
    pub fn new(transform: Transform, model: Model) -> Self {
        Self { transform, model }
    }

    /// Radius of the bounding sphere used for culling.
    pub fn bounding_radius(&self) -> f32 {
        self.model.half_extents.norm()
    }

    /// Squared radius over squared distance to `eye`, the measure LOD
    /// thresholds are expressed in.
    pub fn angular_size(&self, eye: &Vec3) -> f32 {
        let distance2 = (eye - self.transform.position).norm_squared();
        self.model.half_extents.norm_squared() / distance2
    }
}

static_assertions::const_assert_eq!(std::mem::size_of::<Transform>(), 28);
static_assertions::const_assert_eq!(std::mem::size_of::<Model>(), 16);
static_assertions::const_assert_eq!(std::mem::size_of::<Drawable>(), 44);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angular_size() {
        let drawable = Drawable::new(
            Transform::from_position(Vec3::new(0.0, 0.0, -4.0)),
            Model {
                half_extents: Vec3::new(1.0, 1.0, 0.0),
                id: ModelId(0),
            },
        );
        assert_eq!(drawable.angular_size(&Vec3::zeros()), 2.0 / 16.0);
        assert!((drawable.bounding_radius() - 2.0_f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_gpu_layout() {
        let drawable = Drawable::new(
            Transform::from_position(Vec3::new(1.0, 2.0, 3.0)),
            Model {
                half_extents: Vec3::new(4.0, 5.0, 6.0),
                id: ModelId(7),
            },
        );
        let words: &[u32] = bytemuck::cast_slice(std::slice::from_ref(&drawable));
        assert_eq!(f32::from_bits(words[0]), 1.0);
        // Identity quaternion is stored as (x, y, z, w).
        assert_eq!(f32::from_bits(words[6]), 1.0);
        assert_eq!(f32::from_bits(words[9]), 6.0);
        assert_eq!(words[10], 7);
    }
}
