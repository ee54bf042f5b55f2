//! Directional light
//!
//! Supplies both the shading block for the fragment stage and the light-space
//! transform the shadow pass renders with.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

/// Half extent of the square region covered by the shadow map
pub const SHADOW_ORTHO_HALF_EXTENT: f32 = 20.0;

/// Distance the shadow camera is pulled back along the light direction
pub const SHADOW_CAMERA_DISTANCE: f32 = 20.0;

const SHADOW_NEAR: f32 = 0.1;
const SHADOW_FAR: f32 = 100.0;

/// A sun-like light with ambient and diffuse terms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Light colour
    pub colour: Vec3,
    /// Ambient term scale
    pub ambient_intensity: f32,
    /// Direction the light travels, not necessarily normalized
    pub direction: Vec3,
    /// Diffuse term scale
    pub diffuse_intensity: f32,
}

impl DirectionalLight {
    /// Create a light
    pub fn new(direction: Vec3, colour: Vec3, ambient_intensity: f32, diffuse_intensity: f32) -> Self {
        Self {
            colour,
            ambient_intensity,
            direction,
            diffuse_intensity,
        }
    }

    /// Replace the fields that are `Some`
    pub fn update(
        &mut self,
        direction: Option<Vec3>,
        colour: Option<Vec3>,
        ambient_intensity: Option<f32>,
        diffuse_intensity: Option<f32>,
    ) {
        if let Some(direction) = direction {
            self.direction = direction;
        }
        if let Some(colour) = colour {
            self.colour = colour;
        }
        if let Some(ambient) = ambient_intensity {
            self.ambient_intensity = ambient;
        }
        if let Some(diffuse) = diffuse_intensity {
            self.diffuse_intensity = diffuse;
        }
    }

    /// Orthographic projection times a view looking along the light at the origin
    pub fn light_transform(&self) -> Mat4 {
        let direction = if self.direction.norm_squared() > f32::EPSILON {
            self.direction.normalize()
        } else {
            Vec3::new(0.0, -1.0, 0.0)
        };
        let eye = -direction * SHADOW_CAMERA_DISTANCE;
        // look_at degenerates when the light points straight along Y
        let up = if direction.cross(&Vec3::y()).norm_squared() < 1e-6 {
            Vec3::z()
        } else {
            Vec3::y()
        };
        let projection = Mat4::orthographic_zo(
            -SHADOW_ORTHO_HALF_EXTENT,
            SHADOW_ORTHO_HALF_EXTENT,
            -SHADOW_ORTHO_HALF_EXTENT,
            SHADOW_ORTHO_HALF_EXTENT,
            SHADOW_NEAR,
            SHADOW_FAR,
        );
        projection * Mat4::look_at(eye, Vec3::zeros(), up)
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vec3::new(2.0, -1.0, -2.0), Vec3::new(1.0, 1.0, 1.0), 0.2, 0.8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    fn to_clip(m: &Mat4, p: Vec3) -> Vec3 {
        let clip = m * Vec4::new(p.x, p.y, p.z, 1.0);
        Vec3::new(clip.x, clip.y, clip.z) / clip.w
    }

    #[test]
    fn origin_lands_in_middle_of_map() {
        let light = DirectionalLight::default();
        let clip = to_clip(&light.light_transform(), Vec3::zeros());
        assert_relative_eq!(clip.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y, 0.0, epsilon = 1e-5);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn points_towards_light_are_nearer() {
        let light = DirectionalLight::new(Vec3::new(0.0, 0.0, -1.0), Vec3::new(1.0, 1.0, 1.0), 0.1, 0.9);
        let m = light.light_transform();
        let near = to_clip(&m, Vec3::new(0.0, 0.0, 5.0));
        let far = to_clip(&m, Vec3::new(0.0, 0.0, -5.0));
        assert!(near.z < far.z);
    }

    #[test]
    fn vertical_light_is_well_defined() {
        let light = DirectionalLight::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 1.0), 0.1, 0.9);
        let m = light.light_transform();
        assert!(m.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let mut light = DirectionalLight::default();
        light.update(None, Some(Vec3::new(1.0, 0.0, 0.0)), None, Some(0.5));
        assert_eq!(light.colour, Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(light.diffuse_intensity, 0.5);
        assert_relative_eq!(light.ambient_intensity, 0.2);
        assert_eq!(light.direction, DirectionalLight::default().direction);
    }
}
