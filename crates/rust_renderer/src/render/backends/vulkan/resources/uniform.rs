//! GPU uniform block layouts and the dynamic per-object block
//!
//! Every block is `#[repr(C)]` plain data laid out to match std140 in the
//! shaders. Matrices are column-major `[[f32; 4]; 4]`.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use crate::scene::DirectionalLight;

/// Round `size` up to a multiple of `alignment`
///
/// `alignment` must be zero or a power of two, as Vulkan guarantees for
/// `minUniformBufferOffsetAlignment`. Zero means no constraint.
pub fn aligned_stride(size: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        size
    } else {
        (size + alignment - 1) & !(alignment - 1)
    }
}

/// Binding 0: camera projection, view and the light-space transform
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewProjectionBlock {
    /// Projection with the Vulkan Y flip applied
    pub projection: [[f32; 4]; 4],
    /// World to view
    pub view: [[f32; 4]; 4],
    /// World to light clip space, used by the shadow pass and shadow lookup
    pub light_transform: [[f32; 4]; 4],
}

unsafe impl bytemuck::Pod for ViewProjectionBlock {}
unsafe impl bytemuck::Zeroable for ViewProjectionBlock {}

impl ViewProjectionBlock {
    /// Build from an unflipped projection
    pub fn new(projection: &Mat4, view: &Mat4, light_transform: &Mat4) -> Self {
        Self {
            projection: projection.flip_clip_y().to_cols_array(),
            view: view.to_cols_array(),
            light_transform: light_transform.to_cols_array(),
        }
    }
}

/// Binding 1 element and push-constant payload: model matrix and texture flag
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelBlock {
    /// Model to world
    pub model: [[f32; 4]; 4],
    /// 1 when the draw samples its diffuse texture, 0 otherwise
    pub has_texture: u32,
}

unsafe impl bytemuck::Pod for ModelBlock {}
unsafe impl bytemuck::Zeroable for ModelBlock {}

impl ModelBlock {
    /// Build from a transform and texture presence
    pub fn new(model: &Mat4, has_texture: bool) -> Self {
        Self {
            model: model.to_cols_array(),
            has_texture: u32::from(has_texture),
        }
    }
}

/// Binding 2: directional light
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightBlock {
    /// Light colour
    pub colour: [f32; 3],
    /// Ambient term
    pub ambient_intensity: f32,
    /// Direction the light travels
    pub direction: [f32; 3],
    /// Diffuse term
    pub diffuse_intensity: f32,
}

unsafe impl bytemuck::Pod for LightBlock {}
unsafe impl bytemuck::Zeroable for LightBlock {}

impl From<&DirectionalLight> for LightBlock {
    fn from(light: &DirectionalLight) -> Self {
        Self {
            colour: light.colour.into(),
            ambient_intensity: light.ambient_intensity,
            direction: light.direction.into(),
            diffuse_intensity: light.diffuse_intensity,
        }
    }
}

/// Binding 3: world-space camera position
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBlock {
    /// Eye position
    pub position: [f32; 3],
    _pad: f32,
}

unsafe impl bytemuck::Pod for CameraBlock {}
unsafe impl bytemuck::Zeroable for CameraBlock {}

impl CameraBlock {
    /// Build from a position
    pub fn new(position: Vec3) -> Self {
        Self {
            position: position.into(),
            _pad: 0.0,
        }
    }
}

/// Host-side staging block for per-object model data
///
/// Holds `capacity` slots of `stride` bytes. Each frame the renderer packs
/// every drawable into consecutive slots and copies the used prefix into
/// the current image's dynamic uniform buffer in one write.
#[derive(Debug, Clone)]
pub struct DynamicUniformBlock {
    bytes: Vec<u8>,
    stride: usize,
    capacity: usize,
}

impl DynamicUniformBlock {
    /// Allocate `capacity` zeroed slots aligned to `min_alignment`
    pub fn new(capacity: usize, min_alignment: u64) -> Self {
        let stride = aligned_stride(std::mem::size_of::<ModelBlock>() as u64, min_alignment) as usize;
        Self {
            bytes: vec![0; stride * capacity],
            stride,
            capacity,
        }
    }

    /// Bytes between consecutive slots
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total size in bytes
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Byte offset of slot `index`, as bound with the dynamic descriptor
    pub fn offset_of(&self, index: usize) -> u32 {
        (index * self.stride) as u32
    }

    /// Store `block` in slot `index`
    pub fn write(&mut self, index: usize, block: &ModelBlock) -> VulkanResult<()> {
        let start = self.slot_start(index)?;
        let src = bytemuck::bytes_of(block);
        self.bytes[start..start + src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Read slot `index` back
    pub fn read(&self, index: usize) -> VulkanResult<ModelBlock> {
        let start = self.slot_start(index)?;
        Ok(bytemuck::pod_read_unaligned(&self.bytes[start..start + std::mem::size_of::<ModelBlock>()]))
    }

    /// The first `count` slots, ready to copy to the GPU
    pub fn used_bytes(&self, count: usize) -> &[u8] {
        &self.bytes[..count.min(self.capacity) * self.stride]
    }

    fn slot_start(&self, index: usize) -> VulkanResult<usize> {
        if index >= self.capacity {
            return Err(VulkanError::CapacityExceeded {
                what: "dynamic uniform block",
                limit: self.capacity,
            });
        }
        Ok(index * self.stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use std::mem::size_of;

    #[test]
    fn block_sizes_match_shader_layouts() {
        assert_eq!(size_of::<ViewProjectionBlock>(), 192);
        assert_eq!(size_of::<ModelBlock>(), 68);
        assert_eq!(size_of::<LightBlock>(), 32);
        assert_eq!(size_of::<CameraBlock>(), 16);
    }

    #[test]
    fn stride_is_aligned_and_tight() {
        let sizes = [1_u64, 4, 64, 68, 100, 255, 256, 257];
        let alignments = [1_u64, 2, 4, 16, 64, 256];
        for size in sizes {
            for alignment in alignments {
                let stride = aligned_stride(size, alignment);
                assert_eq!(stride % alignment, 0, "size {size} align {alignment}");
                assert!(stride >= size);
                assert!(stride < size + alignment);
            }
        }
        assert_eq!(aligned_stride(68, 0), 68);
        assert_eq!(aligned_stride(68, 256), 256);
    }

    #[test]
    fn dynamic_block_round_trips_matrices() {
        let mut block = DynamicUniformBlock::new(16, 256);
        assert_eq!(block.stride(), 256);

        let blocks: Vec<ModelBlock> = (0..10)
            .map(|i| ModelBlock::new(&Mat4::new_translation(&Vec3::new(i as f32, 2.0 * i as f32, -1.0)), i % 2 == 0))
            .collect();
        for (i, b) in blocks.iter().enumerate() {
            block.write(i, b).expect("in range");
        }
        for (i, b) in blocks.iter().enumerate() {
            assert_eq!(block.read(i).expect("in range"), *b);
        }
        assert_eq!(block.used_bytes(10).len(), 10 * 256);
        assert_eq!(block.offset_of(3), 768);
    }

    #[test]
    fn dynamic_block_rejects_overflow() {
        let mut block = DynamicUniformBlock::new(2, 64);
        let model = ModelBlock::new(&Mat4::identity(), false);
        assert!(block.write(1, &model).is_ok());
        assert!(matches!(block.write(2, &model), Err(VulkanError::CapacityExceeded { limit: 2, .. })));
        assert!(block.read(5).is_err());
        assert_eq!(block.used_bytes(99).len(), block.size_bytes());
    }

    #[test]
    fn light_block_copies_light_fields() {
        let light = DirectionalLight::new(Vec3::new(0.0, -1.0, 0.5), Vec3::new(1.0, 0.5, 0.25), 0.3, 0.7);
        let block = LightBlock::from(&light);
        assert_eq!(block.colour, [1.0, 0.5, 0.25]);
        assert_eq!(block.direction, [0.0, -1.0, 0.5]);
        assert_eq!((block.ambient_intensity, block.diffuse_intensity), (0.3, 0.7));
    }

    #[test]
    fn view_projection_flips_only_y_scale() {
        let projection = Mat4::perspective_zo(1.0, 1.0, 0.1, 10.0);
        let block = ViewProjectionBlock::new(&projection, &Mat4::identity(), &Mat4::identity());
        assert_eq!(block.projection[1][1], -projection[(1, 1)]);
        assert_eq!(block.projection[0][0], projection[(0, 0)]);
    }
}
