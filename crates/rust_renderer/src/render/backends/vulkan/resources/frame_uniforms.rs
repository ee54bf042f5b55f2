//! Per-swapchain-image uniform buffers and their scene descriptor sets
//!
//! Image `i` owns its own four buffers and descriptor set, so frames in
//! flight never write the same memory. Buffers are host-visible and
//! coherent; every update maps, copies and unmaps.

use super::buffer::Buffer;
use super::descriptor_set::{scene_pool_sizes, DescriptorPool, DescriptorSetLayout, DescriptorSetWriter};
use super::uniform::{CameraBlock, LightBlock, ViewProjectionBlock};
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};
use std::mem::size_of;

/// Uniform buffers for one swapchain image
pub struct ImageUniforms {
    /// Binding 0
    pub view_projection: Buffer,
    /// Binding 1, `stride * capacity` bytes
    pub model: Buffer,
    /// Binding 2
    pub light: Buffer,
    /// Binding 3
    pub camera: Buffer,
}

/// Data written into one image's buffers each frame
pub struct UniformUpdate<'a> {
    /// View-projection block
    pub view_projection: &'a ViewProjectionBlock,
    /// Packed model slots
    pub models: &'a [u8],
    /// Light block
    pub light: &'a LightBlock,
    /// Camera block
    pub camera: &'a CameraBlock,
}

/// Uniform buffers and scene sets for every swapchain image
pub struct FrameUniforms {
    descriptor_sets: Vec<vk::DescriptorSet>,
    // Sets are freed with the pool
    pool: DescriptorPool,
    images: Vec<ImageUniforms>,
}

impl FrameUniforms {
    /// Allocate buffers and descriptor sets for `image_count` images
    ///
    /// `model_stride` is the dynamic offset granularity and also the range
    /// bound at binding 1.
    pub fn new(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        layout: &DescriptorSetLayout,
        image_count: usize,
        model_stride: vk::DeviceSize,
        model_capacity: usize,
    ) -> VulkanResult<Self> {
        let uniform = vk::BufferUsageFlags::UNIFORM_BUFFER;
        let images = (0..image_count)
            .map(|_| -> VulkanResult<ImageUniforms> {
                Ok(ImageUniforms {
                    view_projection: Buffer::host_visible(device.clone(), memory_properties, size_of::<ViewProjectionBlock>() as u64, uniform)?,
                    model: Buffer::host_visible(device.clone(), memory_properties, model_stride * model_capacity as u64, uniform)?,
                    light: Buffer::host_visible(device.clone(), memory_properties, size_of::<LightBlock>() as u64, uniform)?,
                    camera: Buffer::host_visible(device.clone(), memory_properties, size_of::<CameraBlock>() as u64, uniform)?,
                })
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let count = image_count as u32;
        let mut pool = DescriptorPool::new(device.clone(), count, &scene_pool_sizes(count))?;
        let layouts = vec![layout.handle(); image_count];
        let descriptor_sets = pool.allocate(&layouts)?;

        let mut writer = DescriptorSetWriter::new();
        for (set, buffers) in descriptor_sets.iter().zip(&images) {
            writer = writer
                .write_buffer(*set, 0, vk::DescriptorType::UNIFORM_BUFFER, buffers.view_projection.handle(), size_of::<ViewProjectionBlock>() as u64)
                .write_buffer(*set, 1, vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, buffers.model.handle(), model_stride)
                .write_buffer(*set, 2, vk::DescriptorType::UNIFORM_BUFFER, buffers.light.handle(), size_of::<LightBlock>() as u64)
                .write_buffer(*set, 3, vk::DescriptorType::UNIFORM_BUFFER, buffers.camera.handle(), size_of::<CameraBlock>() as u64);
        }
        writer.update(device);

        log::debug!("Created uniform buffers and scene descriptor sets for {} images", image_count);

        Ok(Self {
            descriptor_sets,
            pool,
            images,
        })
    }

    /// Number of images covered
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Scene descriptor set for `image`
    pub fn descriptor_set(&self, image: usize) -> VulkanResult<vk::DescriptorSet> {
        self.descriptor_sets.get(image).copied().ok_or_else(|| image_out_of_range(image))
    }

    /// Write this frame's data into `image`'s buffers
    pub fn update(&self, image: usize, update: &UniformUpdate<'_>) -> VulkanResult<()> {
        let buffers = self.images.get(image).ok_or_else(|| image_out_of_range(image))?;
        buffers.view_projection.write(update.view_projection)?;
        buffers.model.write_bytes(0, update.models)?;
        buffers.light.write(update.light)?;
        buffers.camera.write(update.camera)?;
        log::trace!("Updated uniforms for image {} ({} model bytes, pool has {} free sets)", image, update.models.len(), self.pool.remaining());
        Ok(())
    }
}

fn image_out_of_range(image: usize) -> VulkanError {
    VulkanError::InvalidOperation {
        reason: format!("no uniform buffers for swapchain image {image}"),
    }
}
