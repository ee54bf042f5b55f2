//! Vertex record shared by every mesh
//!
//! The layout matches the vertex inputs of the scene and shadow shaders:
//! location 0 position, 1 colour, 2 texture coordinate, 3 normal.

/// Interleaved vertex with position, colour, UV and normal
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Vertex colour, used when the mesh has no texture
    pub color: [f32; 3],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
    /// Surface normal
    pub normal: [f32; 3],
}

// Only f32 arrays, no padding
unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

impl Vertex {
    /// Vertex with a +Z normal
    pub fn new(position: [f32; 3], color: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            color,
            tex_coord,
            normal: [0.0, 0.0, 1.0],
        }
    }

    /// Replace the normal
    pub fn with_normal(mut self, normal: [f32; 3]) -> Self {
        self.normal = normal;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn layout_is_tightly_packed() {
        assert_eq!(size_of::<Vertex>(), 44);
        assert_eq!(offset_of!(Vertex, position), 0);
        assert_eq!(offset_of!(Vertex, color), 12);
        assert_eq!(offset_of!(Vertex, tex_coord), 24);
        assert_eq!(offset_of!(Vertex, normal), 32);
    }

    #[test]
    fn casts_to_bytes() {
        let vertices = [Vertex::new([1.0, 2.0, 3.0], [0.0; 3], [0.0; 2]); 2];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 88);
    }
}
