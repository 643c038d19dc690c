//! Math type aliases and the few helpers culling and mesh ingestion need.
//!
//! All rendering math is `f32` and built on nalgebra. Projections follow the
//! Vulkan convention: right-handed view space, depth range `[0, 1]`.

pub use nalgebra;

pub type Vec2 = nalgebra::Vector2<f32>;
pub type Vec3 = nalgebra::Vector3<f32>;
pub type Vec4 = nalgebra::Vector4<f32>;
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Quaternion (f32). `Quaternion::new` takes `w` first.
pub type Quat = nalgebra::Quaternion<f32>;

/// Right-handed perspective projection with depth range `[0, 1]`.
pub fn perspective_rh(fov_y: f32, aspect: f32, z_near: f32, z_far: f32) -> Mat4 {
    let focal = 1.0 / (fov_y * 0.5).tan();
    let depth = z_far / (z_near - z_far);
    let mut m = Mat4::zeros();
    m[(0, 0)] = focal / aspect;
    m[(1, 1)] = focal;
    m[(2, 2)] = depth;
    m[(2, 3)] = z_near * depth;
    m[(3, 2)] = -1.0;
    m
}

/// Rotation of `angle` radians around the Y axis.
pub fn quat_from_rotation_y(angle: f32) -> Quat {
    nalgebra::UnitQuaternion::from_axis_angle(&Vec3::y_axis(), angle).into_inner()
}

/// Half the size of the axis-aligned box enclosing `points`.
pub fn half_extents(points: &[Vec3]) -> Vec3 {
    let Some(first) = points.first() else {
        return Vec3::zeros();
    };
    let (min, max) = points
        .iter()
        .fold((*first, *first), |(min, max), p| (min.inf(p), max.sup(p)));
    (max - min) * 0.5
}

/// Shorten `v` to `max_length` if it is longer, keeping its direction.
pub fn normalize_to_max_length(v: Vec3, max_length: f32) -> Vec3 {
    let length = v.norm();
    if length > max_length {
        v * (max_length / length)
    } else {
        v
    }
}

/// `dot((point, 1), plane)`; a true distance once the plane is normalized.
pub fn plane_point_distance(plane: &Vec4, point: &Vec3) -> f32 {
    plane.xyz().dot(point) + plane.w
}
