//! Per-frame draw list
//!
//! Flattens the scene registry into upload order and decides, for every
//! draw, which dynamic uniform slot it is packed into and which slot it is
//! bound at. The two only differ under [`DynamicOffsetMode::PerCollection`].

use crate::core::config::DynamicOffsetMode;
use crate::foundation::math::Mat4;
use crate::render::backends::vulkan::resources::{DynamicUniformBlock, ModelBlock, TextureId};
use crate::render::backends::vulkan::VulkanResult;
use crate::scene::{DrawableSource, Mesh, SceneRegistry};
use ash::vk;

/// One draw call
#[derive(Debug)]
pub struct DrawEntry<'a, B> {
    /// Geometry and texture
    pub mesh: &'a Mesh<B>,
    /// Effective model matrix
    pub transform: Mat4,
    /// Slot the model block is packed into
    pub upload_slot: usize,
    /// Slot whose offset is bound for this draw
    pub bound_slot: usize,
}

impl<B> DrawEntry<'_, B> {
    /// Texture sampled by this draw
    pub fn texture(&self) -> Option<TextureId> {
        self.mesh.texture
    }

    /// Uniform and push constant data for this draw
    pub fn model_block(&self) -> ModelBlock {
        ModelBlock::new(&self.transform, self.mesh.texture.is_some())
    }
}

/// Draws in upload order
#[derive(Debug)]
pub struct DrawList<'a, B> {
    entries: Vec<DrawEntry<'a, B>>,
}

impl<'a, B> DrawList<'a, B> {
    /// Walk model meshes then standalone meshes, assigning slots per `mode`
    pub fn build(registry: &'a SceneRegistry<B>, mode: DynamicOffsetMode) -> Self {
        let entries = registry
            .drawables()
            .enumerate()
            .map(|(upload_slot, drawable)| {
                let bound_slot = match (mode, drawable.source) {
                    (DynamicOffsetMode::Shared, _) => upload_slot,
                    (DynamicOffsetMode::PerCollection, DrawableSource::Model { model, .. }) => model,
                    (DynamicOffsetMode::PerCollection, DrawableSource::Mesh { mesh }) => mesh,
                };
                DrawEntry {
                    mesh: drawable.mesh,
                    transform: *drawable.transform,
                    upload_slot,
                    bound_slot,
                }
            })
            .collect();
        Self { entries }
    }

    /// Entries in upload order
    pub fn entries(&self) -> &[DrawEntry<'a, B>] {
        &self.entries
    }

    /// Number of draws
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the draws need more slots than `capacity`
    pub fn exceeds(&self, capacity: usize) -> bool {
        self.entries.len() > capacity
    }

    /// Write every draw's model block into its upload slot
    pub fn pack(&self, block: &mut DynamicUniformBlock) -> VulkanResult<()> {
        for entry in &self.entries {
            block.write(entry.upload_slot, &entry.model_block())?;
        }
        Ok(())
    }
}

/// Descriptor sets bound for one scene draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetBinding {
    /// First set number
    pub first_set: u32,
    /// Consecutive sets starting at `first_set`
    pub sets: Vec<vk::DescriptorSet>,
    /// Whether the dynamic offset applies to this bind
    pub dynamic: bool,
}

/// Binds for a scene draw
///
/// Untextured draws skip set 1 entirely; their shader never samples it.
pub fn scene_bindings(
    scene: vk::DescriptorSet,
    texture: Option<vk::DescriptorSet>,
    shadow: vk::DescriptorSet,
) -> Vec<SetBinding> {
    match texture {
        Some(texture) => vec![SetBinding {
            first_set: 0,
            sets: vec![scene, texture, shadow],
            dynamic: true,
        }],
        None => vec![
            SetBinding {
                first_set: 0,
                sets: vec![scene],
                dynamic: true,
            },
            SetBinding {
                first_set: 2,
                sets: vec![shadow],
                dynamic: false,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::scene::Model;
    use ash::vk::Handle;

    fn registry() -> SceneRegistry<&'static str> {
        let mut registry = SceneRegistry::new(16);
        registry
            .add_model(Model::new(vec![Mesh::new("m0a", Some(TextureId(0))), Mesh::new("m0b", None)]))
            .expect("room");
        registry.add_model(Model::new(vec![Mesh::new("m1a", None)])).expect("room");
        registry.add_mesh(Mesh::new("s0", None)).expect("room");
        registry.add_mesh(Mesh::new("s1", Some(TextureId(1)))).expect("room");
        registry
    }

    fn slots<B>(list: &DrawList<'_, B>) -> Vec<(usize, usize)> {
        list.entries().iter().map(|e| (e.upload_slot, e.bound_slot)).collect()
    }

    #[test]
    fn shared_mode_binds_where_uploaded() {
        let registry = registry();
        let list = DrawList::build(&registry, DynamicOffsetMode::Shared);
        assert_eq!(slots(&list), vec![(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)]);
    }

    #[test]
    fn per_collection_restarts_offsets() {
        let registry = registry();
        let list = DrawList::build(&registry, DynamicOffsetMode::PerCollection);
        assert_eq!(slots(&list), vec![(0, 0), (1, 0), (2, 1), (3, 0), (4, 1)]);
    }

    #[test]
    fn pack_writes_each_upload_slot() {
        let mut registry = registry();
        let moved = Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0));
        registry.update_mesh_transform(crate::scene::MeshId(1), moved);

        let list = DrawList::build(&registry, DynamicOffsetMode::Shared);
        let mut block = DynamicUniformBlock::new(8, 256);
        list.pack(&mut block).expect("fits");

        assert_eq!(block.read(0).expect("slot").has_texture, 1);
        assert_eq!(block.read(1).expect("slot").has_texture, 0);
        assert_eq!(block.read(4).expect("slot"), ModelBlock::new(&moved, true));
    }

    #[test]
    fn capacity_guard() {
        let registry = registry();
        let list = DrawList::build(&registry, DynamicOffsetMode::Shared);
        assert!(!list.exceeds(5));
        assert!(list.exceeds(4));
        let mut small = DynamicUniformBlock::new(4, 256);
        assert!(list.pack(&mut small).is_err());
    }

    #[test]
    fn untextured_draw_binds_two_sets() {
        let scene = vk::DescriptorSet::from_raw(1);
        let texture = vk::DescriptorSet::from_raw(2);
        let shadow = vk::DescriptorSet::from_raw(3);

        let untextured = scene_bindings(scene, None, shadow);
        assert_eq!(untextured.len(), 2);
        assert_eq!(untextured[0].sets, vec![scene]);
        assert_eq!((untextured[1].first_set, untextured[1].sets.clone()), (2, vec![shadow]));
        assert!(untextured[0].dynamic && !untextured[1].dynamic);

        let textured = scene_bindings(scene, Some(texture), shadow);
        assert_eq!(textured.len(), 1);
        assert_eq!(textured[0].sets, vec![scene, texture, shadow]);
    }
}
