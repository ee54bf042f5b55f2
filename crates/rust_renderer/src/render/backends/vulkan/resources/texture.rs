//! Diffuse textures and samplers
//!
//! A texture is uploaded once through a staging buffer, gets a full mip
//! chain generated on the GPU, and is exposed to shaders through its own
//! sampler descriptor set. Textures are addressed by [`TextureId`], the
//! index of creation.

use super::buffer::Buffer;
use super::descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetWriter};
use super::image::{self, ImageDesc, ImageTarget};
use crate::assets::TextureData;
use crate::render::backends::vulkan::rendering::commands::CommandPool;
use crate::render::backends::vulkan::VulkanResult;
use ash::{vk, Device};

/// Index of a texture in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// Upper bound on texture anisotropy
pub const MAX_ANISOTROPY: f32 = 16.0;

/// Sampler used by every diffuse texture
pub fn texture_sampler_info(device_max_anisotropy: f32) -> vk::SamplerCreateInfo {
    vk::SamplerCreateInfo::builder()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(vk::LOD_CLAMP_NONE)
        .anisotropy_enable(true)
        .max_anisotropy(MAX_ANISOTROPY.min(device_max_anisotropy))
        .build()
}

/// Sampler for the shadow map
pub fn shadow_sampler_info() -> vk::SamplerCreateInfo {
    vk::SamplerCreateInfo::builder()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(1.0)
        .anisotropy_enable(false)
        .max_anisotropy(1.0)
        .build()
}

/// Sampler wrapper with RAII cleanup
pub struct Sampler {
    device: Device,
    sampler: vk::Sampler,
}

impl Sampler {
    /// Create from a filled-in create info
    pub fn new(device: Device, info: &vk::SamplerCreateInfo) -> VulkanResult<Self> {
        let sampler = unsafe { device.create_sampler(info, None)? };
        Ok(Self { device, sampler })
    }

    /// Get sampler handle
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}

/// Shared state needed to create textures
pub struct TextureUpload<'a> {
    /// Logical device
    pub device: &'a Device,
    /// Memory properties for allocation
    pub memory_properties: &'a vk::PhysicalDeviceMemoryProperties,
    /// Pool for one-time upload commands
    pub command_pool: &'a CommandPool,
    /// Graphics queue
    pub queue: vk::Queue,
    /// Sampler shared by all textures
    pub sampler: &'a Sampler,
    /// Pool the texture's set is allocated from
    pub descriptor_pool: &'a mut DescriptorPool,
    /// Texture sampler set layout
    pub layout: &'a DescriptorSetLayout,
}

/// Uploaded texture with its sampler descriptor set
pub struct Texture {
    descriptor_set: vk::DescriptorSet,
    target: ImageTarget,
    width: u32,
    height: u32,
}

impl Texture {
    /// Upload `data`, generate mips and write its descriptor set
    pub fn new(upload: TextureUpload<'_>, data: &TextureData) -> VulkanResult<Self> {
        data.validate()?;
        let mip_levels = data.mip_levels();

        let staging = Buffer::host_visible(
            upload.device.clone(),
            upload.memory_properties,
            data.size_bytes() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
        )?;
        staging.write_bytes(0, &data.pixels)?;

        let desc = ImageDesc {
            width: data.width,
            height: data.height,
            mip_levels,
            format: vk::Format::R8G8B8A8_UNORM,
            tiling: vk::ImageTiling::OPTIMAL,
            usage: vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            properties: vk::MemoryPropertyFlags::DEVICE_LOCAL,
            samples: vk::SampleCountFlags::TYPE_1,
        };
        let target = ImageTarget::new(upload.device.clone(), upload.memory_properties, &desc, vk::ImageAspectFlags::COLOR)?;
        let image = target.image.handle();

        upload.command_pool.submit_one_time(upload.queue, |recorder| {
            image::transition_layout(
                recorder,
                image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                0,
                mip_levels,
            )?;
            recorder.copy_buffer_to_image(staging.handle(), image, data.width, data.height);
            image::generate_mipmaps(recorder, image, data.width, data.height, mip_levels)
        })?;

        let descriptor_set = upload.descriptor_pool.allocate(&[upload.layout.handle()])?[0];
        DescriptorSetWriter::new()
            .write_image(
                descriptor_set,
                0,
                target.view.handle(),
                upload.sampler.handle(),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )
            .update(upload.device);

        log::debug!("Uploaded texture {}x{} with {} mip levels", data.width, data.height, mip_levels);

        Ok(Self {
            descriptor_set,
            target,
            width: data.width,
            height: data.height,
        })
    }

    /// Sampler descriptor set
    pub fn descriptor_set(&self) -> vk::DescriptorSet {
        self.descriptor_set
    }

    /// Image view
    pub fn view(&self) -> vk::ImageView {
        self.target.view.handle()
    }

    /// Dimensions in texels
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
