//! Math utilities and types
//!
//! nalgebra aliases plus the projection helpers the renderer needs. Projections
//! here use a right-handed view space and a 0..1 depth range, which is what
//! Vulkan expects. The Y axis still points up; the renderer flips it when it
//! uploads the view-projection block.

pub use nalgebra::{Matrix3, Matrix4, Point3 as NaPoint3, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = NaPoint3<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Scalar helpers
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Projection and view construction for Vulkan's clip space
pub trait Mat4Ext {
    /// Right-handed perspective projection with depth mapped to 0..1
    fn perspective_zo(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed orthographic projection with depth mapped to 0..1
    fn orthographic_zo(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Negate the Y scale term so a Y-up projection renders upright in Vulkan
    fn flip_clip_y(self) -> Mat4;

    /// Column-major array layout as consumed by GLSL `mat4`
    fn to_cols_array(&self) -> [[f32; 4]; 4];
}

impl Mat4Ext for Mat4 {
    fn perspective_zo(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let f = 1.0 / (fov_y * 0.5).tan();
        let mut result = Mat4::zeros();
        result[(0, 0)] = f / aspect;
        result[(1, 1)] = f;
        result[(2, 2)] = far / (near - far);
        result[(2, 3)] = -(far * near) / (far - near);
        result[(3, 2)] = -1.0;
        result
    }

    fn orthographic_zo(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let mut result = Mat4::identity();
        result[(0, 0)] = 2.0 / (right - left);
        result[(1, 1)] = 2.0 / (top - bottom);
        result[(2, 2)] = -1.0 / (far - near);
        result[(0, 3)] = -(right + left) / (right - left);
        result[(1, 3)] = -(top + bottom) / (top - bottom);
        result[(2, 3)] = -near / (far - near);
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn flip_clip_y(mut self) -> Mat4 {
        self[(1, 1)] *= -1.0;
        self
    }

    fn to_cols_array(&self) -> [[f32; 4]; 4] {
        (*self).into()
    }
}
