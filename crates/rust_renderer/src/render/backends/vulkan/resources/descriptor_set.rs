//! Descriptor set layouts, pools and writes

use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// Builder for descriptor set layouts
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    fn add(mut self, binding: u32, descriptor_type: vk::DescriptorType, stage_flags: vk::ShaderStageFlags) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Add a static uniform buffer binding
    pub fn add_uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::UNIFORM_BUFFER, stage_flags)
    }

    /// Add a dynamic uniform buffer binding
    pub fn add_dynamic_uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, stage_flags)
    }

    /// Add a combined image sampler binding
    pub fn add_combined_image_sampler(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, stage_flags)
    }

    /// Bindings added so far
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }

    /// Create the layout
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);
        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None)? };
        Ok(DescriptorSetLayout {
            layout,
            device: device.clone(),
        })
    }
}

/// Scene uniform set: view-projection, dynamic model, light, camera
pub fn scene_layout_builder() -> DescriptorSetLayoutBuilder {
    DescriptorSetLayoutBuilder::new()
        .add_uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
        .add_dynamic_uniform_buffer(1, vk::ShaderStageFlags::FRAGMENT)
        .add_uniform_buffer(2, vk::ShaderStageFlags::FRAGMENT)
        .add_uniform_buffer(3, vk::ShaderStageFlags::FRAGMENT)
}

/// One-binding sampler set used for diffuse textures and the shadow map
pub fn sampler_layout_builder() -> DescriptorSetLayoutBuilder {
    DescriptorSetLayoutBuilder::new().add_combined_image_sampler(0, vk::ShaderStageFlags::FRAGMENT)
}

/// Descriptor set layout wrapper with RAII cleanup
pub struct DescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
    device: Device,
}

impl DescriptorSetLayout {
    /// Get layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Pool sizes for `image_count` scene uniform sets
pub fn scene_pool_sizes(image_count: u32) -> [vk::DescriptorPoolSize; 2] {
    [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: 3 * image_count,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
            descriptor_count: image_count,
        },
    ]
}

/// Pool sizes for `max_textures` texture sets plus the shadow set
pub fn sampler_pool_sizes(max_textures: u32) -> [vk::DescriptorPoolSize; 1] {
    [vk::DescriptorPoolSize {
        ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        descriptor_count: max_textures + 1,
    }]
}

/// Descriptor pool wrapper with RAII cleanup
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: Device,
    max_sets: u32,
    allocated: u32,
}

impl DescriptorPool {
    /// Create a pool for `max_sets` sets
    pub fn new(device: Device, max_sets: u32, pool_sizes: &[vk::DescriptorPoolSize]) -> VulkanResult<Self> {
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&pool_info, None)? };

        Ok(Self {
            pool,
            device,
            max_sets,
            allocated: 0,
        })
    }

    /// Allocate one set per layout
    pub fn allocate(&mut self, layouts: &[vk::DescriptorSetLayout]) -> VulkanResult<Vec<vk::DescriptorSet>> {
        let requested = layouts.len() as u32;
        if self.allocated + requested > self.max_sets {
            return Err(VulkanError::CapacityExceeded {
                what: "descriptor pool",
                limit: self.max_sets as usize,
            });
        }

        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        let sets = unsafe { self.device.allocate_descriptor_sets(&alloc_info)? };
        self.allocated += requested;
        Ok(sets)
    }

    /// Sets still available
    pub fn remaining(&self) -> u32 {
        self.max_sets - self.allocated
    }

    /// Get pool handle
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

enum PendingWrite {
    Buffer {
        set: vk::DescriptorSet,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        info: vk::DescriptorBufferInfo,
    },
    Image {
        set: vk::DescriptorSet,
        binding: u32,
        info: vk::DescriptorImageInfo,
    },
}

/// Batches descriptor writes into one `vkUpdateDescriptorSets`
#[derive(Default)]
pub struct DescriptorSetWriter {
    pending: Vec<PendingWrite>,
}

impl DescriptorSetWriter {
    /// Empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a uniform or dynamic uniform buffer range
    pub fn write_buffer(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
    ) -> Self {
        self.pending.push(PendingWrite::Buffer {
            set,
            binding,
            descriptor_type,
            info: vk::DescriptorBufferInfo { buffer, offset: 0, range },
        });
        self
    }

    /// Write a combined image sampler
    pub fn write_image(mut self, set: vk::DescriptorSet, binding: u32, image_view: vk::ImageView, sampler: vk::Sampler, layout: vk::ImageLayout) -> Self {
        self.pending.push(PendingWrite::Image {
            set,
            binding,
            info: vk::DescriptorImageInfo {
                sampler,
                image_view,
                image_layout: layout,
            },
        });
        self
    }

    /// Apply every pending write
    pub fn update(self, device: &Device) {
        let writes: Vec<vk::WriteDescriptorSet> = self
            .pending
            .iter()
            .map(|pending| match pending {
                PendingWrite::Buffer {
                    set,
                    binding,
                    descriptor_type,
                    info,
                } => vk::WriteDescriptorSet::builder()
                    .dst_set(*set)
                    .dst_binding(*binding)
                    .dst_array_element(0)
                    .descriptor_type(*descriptor_type)
                    .buffer_info(std::slice::from_ref(info))
                    .build(),
                PendingWrite::Image { set, binding, info } => vk::WriteDescriptorSet::builder()
                    .dst_set(*set)
                    .dst_binding(*binding)
                    .dst_array_element(0)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(std::slice::from_ref(info))
                    .build(),
            })
            .collect();

        unsafe {
            device.update_descriptor_sets(&writes, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_layout_bindings() {
        let builder = scene_layout_builder();
        let bindings = builder.bindings();
        assert_eq!(bindings.len(), 4);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(bindings[0].stage_flags, vk::ShaderStageFlags::VERTEX);
        assert_eq!(bindings[1].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC);
        assert!(bindings[1..].iter().all(|b| b.stage_flags == vk::ShaderStageFlags::FRAGMENT));
        assert_eq!(bindings.iter().map(|b| b.binding).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn pool_sizes_cover_every_set() {
        let scene = scene_pool_sizes(3);
        assert_eq!(scene[0].descriptor_count, 9);
        assert_eq!(scene[1].descriptor_count, 3);

        let samplers = sampler_pool_sizes(512);
        assert_eq!(samplers[0].ty, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(samplers[0].descriptor_count, 513);
    }

    #[test]
    fn sampler_layout_is_single_fragment_binding() {
        let builder = sampler_layout_builder();
        assert_eq!(builder.bindings().len(), 1);
        assert_eq!(builder.bindings()[0].stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }
}
