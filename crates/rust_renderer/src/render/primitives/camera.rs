//! Perspective camera

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::render::api::CameraSource;

/// 3D perspective camera
///
/// Right-handed, Y-up view space. The projection maps depth to 0..1 but
/// keeps Y up; the renderer applies the Vulkan Y flip when it uploads the
/// view-projection block, so the camera itself stays API-neutral.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Point the camera is looking at in world space
    pub target: Vec3,
    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Distance to near clipping plane
    pub near: f32,
    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Viewport width / height
    /// * `near` - Near plane distance (must be > 0)
    /// * `far` - Far plane distance (must be > near)
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Point the camera at a world-space target
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Update the aspect ratio from a framebuffer size
    ///
    /// Zero-sized framebuffers (minimised windows) leave the aspect unchanged.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// View matrix
    pub fn view(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// Projection matrix
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_zo(self.fov, self.aspect, self.near, self.far)
    }
}

impl CameraSource for Camera {
    fn projection_matrix(&self) -> Mat4 {
        self.projection()
    }

    fn view_matrix(&self) -> Mat4 {
        self.view()
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    #[test]
    fn view_moves_eye_to_origin() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 45.0, 1.0, 0.1, 100.0);
        let eye = camera.view() * Vec4::new(0.0, 0.0, 5.0, 1.0);
        assert_relative_eq!(eye, Vec4::new(0.0, 0.0, 0.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn target_lies_on_negative_z() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 45.0, 1.0, 0.1, 100.0);
        let target = camera.view() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(target.z, -5.0, epsilon = 1e-5);
    }

    #[test]
    fn viewport_ignores_zero_size() {
        let mut camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 45.0, 1.0, 0.1, 100.0);
        camera.set_viewport(800, 600);
        assert_relative_eq!(camera.aspect, 800.0 / 600.0);
        camera.set_viewport(0, 0);
        assert_relative_eq!(camera.aspect, 800.0 / 600.0);
    }

    #[test]
    fn camera_source_matches_inherent_methods() {
        let camera = Camera::perspective(Vec3::new(1.0, 2.0, 3.0), 60.0, 1.5, 0.1, 50.0);
        let source: &dyn CameraSource = &camera;
        assert_eq!(source.view_matrix(), camera.view());
        assert_eq!(source.projection_matrix(), camera.projection());
        assert_eq!(source.position(), camera.position);
    }
}
