//! Decoded model geometry
//!
//! A model is a list of meshes plus a per-material texture table. Meshes
//! reference materials by index; the renderer turns each referenced material
//! into a texture when the model is created.

use super::AssetError;
use crate::render::primitives::Vertex;
use std::path::PathBuf;

/// Vertex and index lists for one mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Interleaved vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices
    pub indices: Vec<u32>,
    /// Index into [`ModelData::material_textures`]
    pub material_index: usize,
}

impl MeshData {
    /// Build a mesh, rejecting empty geometry and out-of-range indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self, AssetError> {
        let mesh = Self {
            vertices,
            indices,
            material_index: 0,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Set the material slot
    pub fn with_material(mut self, material_index: usize) -> Self {
        self.material_index = material_index;
        self
    }

    /// Check the geometry is drawable
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.vertices.is_empty() || self.indices.is_empty() {
            return Err(AssetError::EmptyMesh);
        }
        let vertex_count = self.vertices.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(AssetError::Decode {
                path: String::from("<mesh>"),
                reason: format!("index {bad} out of range for {vertex_count} vertices"),
            });
        }
        Ok(())
    }

    /// Number of indices to draw
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Meshes sharing one transform, with their material textures
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelData {
    /// Meshes in draw order
    pub meshes: Vec<MeshData>,
    /// Diffuse texture per material, `None` when the material has none
    pub material_textures: Vec<Option<PathBuf>>,
}

impl ModelData {
    /// Texture path for a mesh's material, if any
    pub fn texture_for(&self, mesh: &MeshData) -> Option<&PathBuf> {
        self.material_textures.get(mesh.material_index)?.as_ref()
    }

    /// Validate every mesh
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.meshes.is_empty() {
            return Err(AssetError::EmptyMesh);
        }
        self.meshes.iter().try_for_each(MeshData::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<Vertex> {
        vec![
            Vertex::new([0.0, -0.5, 0.0], [1.0, 0.0, 0.0], [0.5, 0.0]),
            Vertex::new([0.5, 0.5, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex::new([-0.5, 0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ]
    }

    #[test]
    fn empty_geometry_is_rejected() {
        assert!(matches!(MeshData::new(Vec::new(), vec![0]), Err(AssetError::EmptyMesh)));
        assert!(matches!(MeshData::new(triangle(), Vec::new()), Err(AssetError::EmptyMesh)));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        assert!(MeshData::new(triangle(), vec![0, 1, 3]).is_err());
        assert_eq!(MeshData::new(triangle(), vec![0, 1, 2]).map(|m| m.index_count()).ok(), Some(3));
    }

    #[test]
    fn material_lookup_handles_missing_entries() {
        let mesh_a = MeshData::new(triangle(), vec![0, 1, 2]).expect("mesh").with_material(0);
        let mesh_b = mesh_a.clone().with_material(1);
        let mesh_c = mesh_a.clone().with_material(7);
        let model = ModelData {
            meshes: vec![mesh_a.clone(), mesh_b.clone(), mesh_c.clone()],
            material_textures: vec![Some(PathBuf::from("wood.png")), None],
        };
        assert_eq!(model.texture_for(&mesh_a), Some(&PathBuf::from("wood.png")));
        assert_eq!(model.texture_for(&mesh_b), None);
        assert_eq!(model.texture_for(&mesh_c), None);
        assert!(model.validate().is_ok());
    }
}
