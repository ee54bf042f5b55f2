//! Per-frame input from the application

use crate::foundation::math::{Mat4, Vec3};

/// Supplies camera matrices each frame
pub trait CameraSource {
    /// Projection with Y up and 0..1 depth; the renderer applies the Vulkan Y flip
    fn projection_matrix(&self) -> Mat4;
    /// World to view transform
    fn view_matrix(&self) -> Mat4;
    /// World-space eye position
    fn position(&self) -> Vec3;
}

/// Camera snapshot consumed by one `draw` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Projection matrix, unflipped
    pub projection: Mat4,
    /// View matrix
    pub view: Mat4,
    /// Camera position for specular lighting
    pub camera_position: Vec3,
}

impl FrameInput {
    /// Capture the current state of a camera
    pub fn from_camera(camera: &dyn CameraSource) -> Self {
        Self {
            projection: camera.projection_matrix(),
            view: camera.view_matrix(),
            camera_position: camera.position(),
        }
    }
}

impl Default for FrameInput {
    fn default() -> Self {
        Self {
            projection: Mat4::identity(),
            view: Mat4::identity(),
            camera_position: Vec3::zeros(),
        }
    }
}
