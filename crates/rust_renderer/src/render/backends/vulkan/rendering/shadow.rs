//! Offscreen shadow map target
//!
//! Lives for the renderer's whole lifetime; swapchain rebuilds leave it alone.

use crate::render::backends::vulkan::rendering::render_pass::{Framebuffer, RenderPass};
use crate::render::backends::vulkan::resources::descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetWriter};
use crate::render::backends::vulkan::resources::texture::{shadow_sampler_info, Sampler};
use crate::render::backends::vulkan::resources::{ImageDesc, ImageTarget};
use crate::render::backends::vulkan::VulkanResult;
use ash::{vk, Device};

/// Depth image, pass and framebuffer used to render the shadow map
pub struct ShadowTarget {
    descriptor_set: vk::DescriptorSet,
    framebuffer: Framebuffer,
    render_pass: RenderPass,
    sampler: Sampler,
    depth: ImageTarget,
    dim: u32,
}

impl ShadowTarget {
    /// Create a `dim` x `dim` depth map and its sampler set from `pool`
    pub fn new(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        depth_format: vk::Format,
        dim: u32,
        pool: &mut DescriptorPool,
        layout: &DescriptorSetLayout,
    ) -> VulkanResult<Self> {
        let extent = vk::Extent2D { width: dim, height: dim };
        let desc = ImageDesc::attachment(
            extent,
            depth_format,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            vk::SampleCountFlags::TYPE_1,
        );
        let depth = ImageTarget::new(device.clone(), memory_properties, &desc, vk::ImageAspectFlags::DEPTH)?;
        let sampler = Sampler::new(device.clone(), &shadow_sampler_info())?;
        let render_pass = RenderPass::shadow(device.clone(), depth_format)?;
        let framebuffer = Framebuffer::new(device.clone(), render_pass.handle(), &[depth.view.handle()], extent)?;

        let descriptor_set = pool.allocate(&[layout.handle()])?[0];
        DescriptorSetWriter::new()
            .write_image(
                descriptor_set,
                0,
                depth.view.handle(),
                sampler.handle(),
                vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            )
            .update(device);

        log::debug!("Created {}x{} shadow map ({:?})", dim, dim, depth_format);

        Ok(Self {
            descriptor_set,
            framebuffer,
            render_pass,
            sampler,
            depth,
            dim,
        })
    }

    /// Shadow render pass
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.handle()
    }

    /// Framebuffer over the depth map
    pub fn framebuffer(&self) -> vk::Framebuffer {
        self.framebuffer.handle()
    }

    /// Sampler set exposing the depth map to the scene pass
    pub fn descriptor_set(&self) -> vk::DescriptorSet {
        self.descriptor_set
    }

    /// Square extent of the map
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.dim,
            height: self.dim,
        }
    }
}
