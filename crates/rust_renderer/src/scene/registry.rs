//! # Scene Registry
//!
//! Append-only storage for everything the renderer draws. Models are groups of
//! meshes sharing one transform; standalone meshes carry their own. Ids are
//! creation indices and stay valid until the registry is drained at shutdown.
//!
//! The registry is generic over the mesh payload so the ordering and id rules
//! can be tested without GPU buffers.

use crate::foundation::math::Mat4;
use crate::render::backends::vulkan::resources::TextureId;
use thiserror::Error;

/// Errors raised when registering drawables
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The per-object uniform block cannot hold another drawable
    #[error("scene holds at most {capacity} drawables, {requested} requested")]
    CapacityExceeded {
        /// Drawables after the addition
        requested: usize,
        /// Configured limit
        capacity: usize,
    },
}

/// Index of a model in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub usize);

/// Index of a standalone mesh in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

/// Geometry payload with an optional texture and its own transform
#[derive(Debug)]
pub struct Mesh<B> {
    /// Uploaded geometry
    pub buffers: B,
    /// Diffuse texture, if any
    pub texture: Option<TextureId>,
    /// Model matrix, used when the mesh is standalone
    pub transform: Mat4,
}

impl<B> Mesh<B> {
    /// Untransformed mesh
    pub fn new(buffers: B, texture: Option<TextureId>) -> Self {
        Self {
            buffers,
            texture,
            transform: Mat4::identity(),
        }
    }
}

/// Meshes drawn with a shared transform
#[derive(Debug)]
pub struct Model<B> {
    /// Member meshes
    pub meshes: Vec<Mesh<B>>,
    /// Model matrix applied to every member
    pub transform: Mat4,
}

impl<B> Model<B> {
    /// Untransformed model
    pub fn new(meshes: Vec<Mesh<B>>) -> Self {
        Self {
            meshes,
            transform: Mat4::identity(),
        }
    }
}

/// Where a drawable came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawableSource {
    /// Mesh `mesh` of model `model`
    Model {
        /// Model index
        model: usize,
        /// Mesh index within the model
        mesh: usize,
    },
    /// Standalone mesh
    Mesh {
        /// Mesh index
        mesh: usize,
    },
}

/// One draw: a mesh and the transform it is drawn with
#[derive(Debug)]
pub struct Drawable<'a, B> {
    /// Origin of the draw
    pub source: DrawableSource,
    /// Geometry and texture
    pub mesh: &'a Mesh<B>,
    /// Effective model matrix
    pub transform: &'a Mat4,
}

/// Append-only registry of models and standalone meshes
#[derive(Debug)]
pub struct SceneRegistry<B> {
    models: Vec<Model<B>>,
    meshes: Vec<Mesh<B>>,
    capacity: usize,
}

impl<B> SceneRegistry<B> {
    /// Empty registry holding at most `capacity` drawables
    pub fn new(capacity: usize) -> Self {
        Self {
            models: Vec::new(),
            meshes: Vec::new(),
            capacity,
        }
    }

    /// Maximum number of drawables
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fail unless `additional` more drawables fit
    pub fn ensure_room(&self, additional: usize) -> Result<(), SceneError> {
        let requested = self.drawable_count() + additional;
        if requested > self.capacity {
            return Err(SceneError::CapacityExceeded {
                requested,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Append a model
    pub fn add_model(&mut self, model: Model<B>) -> Result<ModelId, SceneError> {
        self.ensure_room(model.meshes.len())?;
        self.models.push(model);
        Ok(ModelId(self.models.len() - 1))
    }

    /// Append a standalone mesh
    pub fn add_mesh(&mut self, mesh: Mesh<B>) -> Result<MeshId, SceneError> {
        self.ensure_room(1)?;
        self.meshes.push(mesh);
        Ok(MeshId(self.meshes.len() - 1))
    }

    /// Set a model's transform; unknown ids are ignored
    pub fn update_model_transform(&mut self, id: ModelId, transform: Mat4) -> bool {
        match self.models.get_mut(id.0) {
            Some(model) => {
                model.transform = transform;
                true
            }
            None => {
                log::warn!("Ignoring transform for unknown model {} ({} registered)", id.0, self.models.len());
                false
            }
        }
    }

    /// Set a standalone mesh's transform; unknown ids are ignored
    pub fn update_mesh_transform(&mut self, id: MeshId, transform: Mat4) -> bool {
        match self.meshes.get_mut(id.0) {
            Some(mesh) => {
                mesh.transform = transform;
                true
            }
            None => {
                log::warn!("Ignoring transform for unknown mesh {} ({} registered)", id.0, self.meshes.len());
                false
            }
        }
    }

    /// Registered models
    pub fn models(&self) -> &[Model<B>] {
        &self.models
    }

    /// Registered standalone meshes
    pub fn meshes(&self) -> &[Mesh<B>] {
        &self.meshes
    }

    /// Every draw in upload order: model meshes first, then standalone meshes
    pub fn drawables(&self) -> impl Iterator<Item = Drawable<'_, B>> + '_ {
        let from_models = self.models.iter().enumerate().flat_map(|(model_index, model)| {
            model.meshes.iter().enumerate().map(move |(mesh_index, mesh)| Drawable {
                source: DrawableSource::Model {
                    model: model_index,
                    mesh: mesh_index,
                },
                mesh,
                transform: &model.transform,
            })
        });
        let standalone = self.meshes.iter().enumerate().map(|(mesh_index, mesh)| Drawable {
            source: DrawableSource::Mesh { mesh: mesh_index },
            mesh,
            transform: &mesh.transform,
        });
        from_models.chain(standalone)
    }

    /// Total number of draws
    pub fn drawable_count(&self) -> usize {
        self.models.iter().map(|m| m.meshes.len()).sum::<usize>() + self.meshes.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.meshes.is_empty()
    }

    /// Remove everything, handing ownership back for ordered destruction
    pub fn drain(&mut self) -> (Vec<Model<B>>, Vec<Mesh<B>>) {
        (std::mem::take(&mut self.models), std::mem::take(&mut self.meshes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    fn model(names: &[&'static str]) -> Model<&'static str> {
        Model::new(names.iter().map(|n| Mesh::new(*n, None)).collect())
    }

    #[test]
    fn ids_follow_creation_order() {
        let mut registry = SceneRegistry::new(16);
        assert_eq!(registry.add_model(model(&["a"])), Ok(ModelId(0)));
        assert_eq!(registry.add_model(model(&["b", "c"])), Ok(ModelId(1)));
        assert_eq!(registry.add_mesh(Mesh::new("d", None)), Ok(MeshId(0)));
        assert_eq!(registry.drawable_count(), 4);
    }

    #[test]
    fn drawables_list_model_meshes_first() {
        let mut registry = SceneRegistry::new(16);
        registry.add_mesh(Mesh::new("standalone", None)).expect("room");
        registry.add_model(model(&["m0", "m1"])).expect("room");

        let order: Vec<&str> = registry.drawables().map(|d| d.mesh.buffers).collect();
        assert_eq!(order, vec!["m0", "m1", "standalone"]);

        let sources: Vec<DrawableSource> = registry.drawables().map(|d| d.source).collect();
        assert_eq!(sources[1], DrawableSource::Model { model: 0, mesh: 1 });
        assert_eq!(sources[2], DrawableSource::Mesh { mesh: 0 });
    }

    #[test]
    fn model_meshes_use_model_transform() {
        let mut registry = SceneRegistry::new(16);
        let id = registry.add_model(model(&["a", "b"])).expect("room");
        let moved = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        assert!(registry.update_model_transform(id, moved));
        assert!(registry.drawables().all(|d| *d.transform == moved));
    }

    #[test]
    fn out_of_range_updates_are_ignored() {
        let mut registry: SceneRegistry<&str> = SceneRegistry::new(4);
        registry.add_mesh(Mesh::new("a", None)).expect("room");
        let moved = Mat4::new_scaling(2.0);
        assert!(!registry.update_mesh_transform(MeshId(3), moved));
        assert!(!registry.update_model_transform(ModelId(0), moved));
        assert_eq!(registry.meshes()[0].transform, Mat4::identity());
    }

    #[test]
    fn capacity_counts_every_mesh() {
        let mut registry = SceneRegistry::new(3);
        registry.add_model(model(&["a", "b"])).expect("room");
        let err = registry.add_model(model(&["c", "d"])).unwrap_err();
        assert_eq!(err, SceneError::CapacityExceeded { requested: 4, capacity: 3 });
        assert!(registry.add_mesh(Mesh::new("c", None)).is_ok());
        assert!(registry.add_mesh(Mesh::new("d", None)).is_err());
        assert_eq!(registry.drawable_count(), 3);
    }

    #[test]
    fn drain_empties_registry() {
        let mut registry = SceneRegistry::new(8);
        registry.add_model(model(&["a"])).expect("room");
        registry.add_mesh(Mesh::new("b", None)).expect("room");
        registry.add_model(model(&["c", "d"])).expect("room");
        let (models, meshes) = registry.drain();
        assert_eq!(models.len(), 2);
        assert_eq!(models[1].meshes[1].buffers, "d");
        assert_eq!(meshes[0].buffers, "b");
        assert!(registry.is_empty());
        assert_eq!(registry.drawable_count(), 0);

        // Room is released for reuse
        assert_eq!(registry.add_mesh(Mesh::new("e", None)).expect("room"), MeshId(0));
    }
}
