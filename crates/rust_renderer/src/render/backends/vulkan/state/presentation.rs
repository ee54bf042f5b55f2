//! Everything that depends on the swapchain
//!
//! [`PresentationTargets`] is dropped and rebuilt as a unit whenever the
//! surface changes. Its fields are declared in destruction order.

use crate::core::config::ShaderConfig;
use crate::render::backends::vulkan::initialization::VulkanContext;
use crate::render::backends::vulkan::rendering::{
    CommandBuffers, CommandPool, Framebuffer, GraphicsPipeline, PipelineBuilder, RenderPass, ShaderModule,
};
use crate::render::backends::vulkan::resources::{ImageDesc, ImageTarget};
use crate::render::backends::vulkan::state::swapchain::Swapchain;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::vk;

/// Inputs that stay fixed across swapchain rebuilds
pub struct PresentationDesc<'a> {
    /// Current framebuffer size in pixels
    pub framebuffer_size: (u32, u32),
    /// MSAA sample count for the scene pass
    pub samples: vk::SampleCountFlags,
    /// Whether per-sample shading is enabled
    pub sample_shading: bool,
    /// Depth attachment format
    pub depth_format: vk::Format,
    /// Shader locations for the scene pipeline
    pub shaders: &'a ShaderConfig,
    /// Scene, texture sampler and shadow sampler layouts
    pub set_layouts: [vk::DescriptorSetLayout; 3],
}

/// Image counts of each per-image collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetCounts {
    /// Swapchain images
    pub images: usize,
    /// Scene framebuffers
    pub scene_framebuffers: usize,
    /// Overlay framebuffers
    pub overlay_framebuffers: usize,
    /// Scene command buffers
    pub scene_command_buffers: usize,
    /// Overlay command buffers
    pub overlay_command_buffers: usize,
}

impl TargetCounts {
    /// Every per-image collection has one entry per swapchain image
    pub fn is_consistent(&self) -> bool {
        [
            self.scene_framebuffers,
            self.overlay_framebuffers,
            self.scene_command_buffers,
            self.overlay_command_buffers,
        ]
        .iter()
        .all(|&count| count == self.images)
    }
}

/// Swapchain plus the passes, pipeline, framebuffers and command buffers built on it
pub struct PresentationTargets {
    overlay_command_buffers: CommandBuffers,
    scene_command_buffers: CommandBuffers,
    overlay_framebuffers: Vec<Framebuffer>,
    scene_framebuffers: Vec<Framebuffer>,
    scene_pipeline: GraphicsPipeline,
    overlay_pass: RenderPass,
    scene_pass: RenderPass,
    depth: ImageTarget,
    colour: ImageTarget,
    swapchain: Swapchain,
    samples: vk::SampleCountFlags,
}

impl PresentationTargets {
    /// Build the swapchain and everything layered on it
    pub fn new(context: &VulkanContext, command_pool: &CommandPool, desc: &PresentationDesc<'_>) -> VulkanResult<Self> {
        let device = context.raw_device();
        let memory_properties = context.memory_properties();

        let swapchain = Swapchain::new(
            device,
            &context.device.swapchain_loader,
            &context.surface,
            context.physical_device.device,
            context.device.queue_families,
            desc.framebuffer_size,
        )?;
        let extent = swapchain.extent();
        let colour_format = swapchain.format();

        let colour = ImageTarget::new(
            device.clone(),
            memory_properties,
            &ImageDesc::attachment(
                extent,
                colour_format,
                vk::ImageUsageFlags::TRANSIENT_ATTACHMENT | vk::ImageUsageFlags::COLOR_ATTACHMENT,
                desc.samples,
            ),
            vk::ImageAspectFlags::COLOR,
        )?;
        let depth = ImageTarget::new(
            device.clone(),
            memory_properties,
            &ImageDesc::attachment(extent, desc.depth_format, vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT, desc.samples),
            vk::ImageAspectFlags::DEPTH,
        )?;

        let scene_pass = RenderPass::scene(device.clone(), colour_format, desc.depth_format, desc.samples)?;
        let overlay_pass = RenderPass::overlay(device.clone(), colour_format)?;

        let scene_pipeline = {
            let vertex = ShaderModule::from_file(device.clone(), &desc.shaders.scene_vertex_path())?;
            let fragment = ShaderModule::from_file(device.clone(), &desc.shaders.scene_fragment_path())?;
            PipelineBuilder::scene(&vertex, &fragment, &desc.set_layouts, desc.samples, desc.sample_shading)
                .build(device, scene_pass.handle())?
        };

        let scene_framebuffers = swapchain
            .image_views()
            .iter()
            .map(|view| {
                Framebuffer::new(
                    device.clone(),
                    scene_pass.handle(),
                    &[colour.view.handle(), depth.view.handle(), view.handle()],
                    extent,
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;
        let overlay_framebuffers = swapchain
            .image_views()
            .iter()
            .map(|view| Framebuffer::new(device.clone(), overlay_pass.handle(), &[view.handle()], extent))
            .collect::<VulkanResult<Vec<_>>>()?;

        let image_count = swapchain.image_count() as u32;
        let scene_command_buffers = CommandBuffers::new(command_pool, image_count)?;
        let overlay_command_buffers = CommandBuffers::new(command_pool, image_count)?;

        let targets = Self {
            overlay_command_buffers,
            scene_command_buffers,
            overlay_framebuffers,
            scene_framebuffers,
            scene_pipeline,
            overlay_pass,
            scene_pass,
            depth,
            colour,
            swapchain,
            samples: desc.samples,
        };

        let counts = targets.counts();
        if !counts.is_consistent() {
            return Err(VulkanError::InvalidOperation {
                reason: format!("per-image resources out of step: {:?}", counts),
            });
        }
        Ok(targets)
    }

    /// Sizes of the per-image collections
    pub fn counts(&self) -> TargetCounts {
        TargetCounts {
            images: self.swapchain.image_count(),
            scene_framebuffers: self.scene_framebuffers.len(),
            overlay_framebuffers: self.overlay_framebuffers.len(),
            scene_command_buffers: self.scene_command_buffers.len(),
            overlay_command_buffers: self.overlay_command_buffers.len(),
        }
    }

    /// The swapchain
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    /// Image count
    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    /// Image extent
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Scene sample count
    pub fn samples(&self) -> vk::SampleCountFlags {
        self.samples
    }

    /// Multisampled scene pass
    pub fn scene_pass(&self) -> vk::RenderPass {
        self.scene_pass.handle()
    }

    /// Overlay pass
    pub fn overlay_pass(&self) -> vk::RenderPass {
        self.overlay_pass.handle()
    }

    /// Scene pipeline
    pub fn scene_pipeline(&self) -> &GraphicsPipeline {
        &self.scene_pipeline
    }

    /// Scene framebuffer for `image`
    pub fn scene_framebuffer(&self, image: usize) -> VulkanResult<vk::Framebuffer> {
        Self::framebuffer_at(&self.scene_framebuffers, image)
    }

    /// Overlay framebuffer for `image`
    pub fn overlay_framebuffer(&self, image: usize) -> VulkanResult<vk::Framebuffer> {
        Self::framebuffer_at(&self.overlay_framebuffers, image)
    }

    /// Command buffer holding the shadow and scene passes for `image`
    pub fn scene_command_buffer(&self, image: usize) -> VulkanResult<vk::CommandBuffer> {
        self.scene_command_buffers.get(image)
    }

    /// Command buffer the overlay records into for `image`
    pub fn overlay_command_buffer(&self, image: usize) -> VulkanResult<vk::CommandBuffer> {
        self.overlay_command_buffers.get(image)
    }

    fn framebuffer_at(framebuffers: &[Framebuffer], image: usize) -> VulkanResult<vk::Framebuffer> {
        framebuffers
            .get(image)
            .map(Framebuffer::handle)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("no framebuffer for image {}", image),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::vulkan::renderer::{
        AcquireOutcome, FrameBackend, FrameLoop, FrameOutcome, PresentOutcome,
    };
    use crate::render::backends::vulkan::state::swapchain::{choose_extent, choose_image_count};
    use crate::render::backends::vulkan::VulkanResult;

    fn counts(images: usize) -> TargetCounts {
        TargetCounts {
            images,
            scene_framebuffers: images,
            overlay_framebuffers: images,
            scene_command_buffers: images,
            overlay_command_buffers: images,
        }
    }

    #[test]
    fn matching_counts_are_consistent() {
        assert!(counts(3).is_consistent());
    }

    #[test]
    fn any_mismatch_is_reported() {
        let mut short = counts(3);
        short.overlay_framebuffers = 2;
        assert!(!short.is_consistent());

        let mut extra = counts(2);
        extra.scene_command_buffers = 3;
        assert!(!extra.is_consistent());
    }

    /// Backend whose rebuild re-derives the swapchain from fixed capabilities
    struct RebuildingBackend {
        capabilities: vk::SurfaceCapabilitiesKHR,
        framebuffer: (u32, u32),
        builds: Vec<(TargetCounts, vk::Extent2D)>,
        next_image: usize,
        stale_presents: usize,
    }

    impl RebuildingBackend {
        fn new(capabilities: vk::SurfaceCapabilitiesKHR, framebuffer: (u32, u32)) -> Self {
            let mut backend = Self {
                capabilities,
                framebuffer,
                builds: Vec::new(),
                next_image: 0,
                stale_presents: 0,
            };
            backend.build();
            backend
        }

        fn build(&mut self) {
            let images = choose_image_count(&self.capabilities) as usize;
            let extent = choose_extent(&self.capabilities, self.framebuffer);
            self.builds.push((counts(images), extent));
            self.next_image = 0;
        }

        fn current(&self) -> (TargetCounts, vk::Extent2D) {
            self.builds[self.builds.len() - 1]
        }
    }

    impl FrameBackend for RebuildingBackend {
        fn wait_for_slot(&mut self, _slot: usize) -> VulkanResult<()> {
            Ok(())
        }

        fn reset_slot(&mut self, _slot: usize) -> VulkanResult<()> {
            Ok(())
        }

        fn acquire(&mut self, _slot: usize) -> VulkanResult<AcquireOutcome> {
            let images = self.current().0.images;
            let image_index = self.next_image as u32;
            self.next_image = (self.next_image + 1) % images;
            Ok(AcquireOutcome::Acquired { image_index, suboptimal: false })
        }

        fn wait_for_image(&mut self, image: usize, _slot: usize) -> VulkanResult<()> {
            assert!(image < self.current().0.images);
            Ok(())
        }

        fn update_uniforms(&mut self, _image: usize) -> VulkanResult<()> {
            Ok(())
        }

        fn record(&mut self, image: usize) -> VulkanResult<()> {
            assert!(image < self.current().0.scene_command_buffers);
            Ok(())
        }

        fn submit(&mut self, _slot: usize, _image: usize) -> VulkanResult<()> {
            Ok(())
        }

        fn present(&mut self, _slot: usize, _image: usize) -> VulkanResult<PresentOutcome> {
            if self.stale_presents > 0 {
                self.stale_presents -= 1;
                return Ok(PresentOutcome::Stale);
            }
            Ok(PresentOutcome::Presented)
        }

        fn rebuild_swapchain(&mut self) -> VulkanResult<()> {
            self.build();
            Ok(())
        }
    }

    #[test]
    fn rebuilds_reproduce_counts_and_extent() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            ..Default::default()
        };
        let mut backend = RebuildingBackend::new(capabilities, (800, 600));
        let mut frame_loop = FrameLoop::new(2);

        // One rebuild from a resize at acquire, one from a stale present
        frame_loop.notify_framebuffer_resized();
        assert_eq!(frame_loop.run_frame(&mut backend).expect("frame"), FrameOutcome::SwapchainRebuilt);
        backend.stale_presents = 1;
        assert_eq!(frame_loop.run_frame(&mut backend).expect("frame"), FrameOutcome::RenderedAndRebuilt);
        assert_eq!(frame_loop.run_frame(&mut backend).expect("frame"), FrameOutcome::Rendered);

        assert_eq!(backend.builds.len(), 3);
        let (initial_counts, initial_extent) = backend.builds[0];
        assert_eq!(initial_counts.images, 3);
        assert_eq!((initial_extent.width, initial_extent.height), (800, 600));
        for (target_counts, extent) in &backend.builds {
            assert!(target_counts.is_consistent());
            assert_eq!(*target_counts, initial_counts);
            assert_eq!(*extent, initial_extent);
        }
    }
}
