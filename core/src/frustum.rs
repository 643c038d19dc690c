//! Camera and view-frustum culling.
//!
//! [`FrustumPlanes`] are extracted from a view-projection matrix (Gribb/Hartmann
//! row combinations) and normalized, so [`FrustumPlanes::is_sphere_visible`]
//! compares true distances against the sphere radius.

use crate::math::{Mat4, Quat, Vec3, Vec4, perspective_rh, plane_point_distance};

/// Perspective camera state supplied by the scene each frame.
///
/// The camera looks down its local -Z axis with +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World-space position.
    pub position: Vec3,
    /// World-space orientation.
    pub rotation: Quat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Near clip distance.
    pub z_near: f32,
    /// Far clip distance.
    pub z_far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            fov_y: std::f32::consts::FRAC_PI_2,
            z_near: 0.01,
            z_far: 10_000.0,
        }
    }
}

impl Camera {
    /// World-to-view matrix.
    pub fn view(&self) -> Mat4 {
        let inverse_rotation = nalgebra::UnitQuaternion::new_unchecked(self.rotation).inverse();
        inverse_rotation.to_homogeneous() * Mat4::new_translation(&-self.position)
    }

    /// View-to-clip matrix for the given aspect ratio.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        perspective_rh(self.fov_y, aspect, self.z_near, self.z_far)
    }

    /// Combined `projection * view`.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    /// Frustum planes for the given aspect ratio.
    pub fn frustum(&self, aspect: f32) -> FrustumPlanes {
        FrustumPlanes::from_view_projection(&self.view_projection(aspect))
    }
}

/// The six planes bounding a view volume, normals pointing inward.
///
/// Order: left, right, bottom, top, near, far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumPlanes {
    pub planes: [Vec4; 6],
}

impl FrustumPlanes {
    /// Extract planes from a `projection * view` matrix.
    ///
    /// The near plane is row 2 alone because clip-space depth is `[0, 1]`.
    pub fn from_view_projection(view_projection: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { view_projection.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(normalize_plane);

        Self { planes }
    }

    /// Smallest signed distance from `point` to any plane.
    ///
    /// Negative when the point lies outside the frustum.
    pub fn min_distance(&self, point: &Vec3) -> f32 {
        self.planes
            .iter()
            .map(|plane| plane_point_distance(plane, point))
            .fold(f32::INFINITY, f32::min)
    }

    /// Returns true if a sphere at `center` with `radius` touches the frustum.
    pub fn is_sphere_visible(&self, center: &Vec3, radius: f32) -> bool {
        self.min_distance(center) + radius > 0.0
    }
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    let length = plane.xyz().norm();
    if length > f32::EPSILON {
        plane / length
    } else {
        plane
    }
}
