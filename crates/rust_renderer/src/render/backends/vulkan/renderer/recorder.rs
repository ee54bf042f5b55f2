//! Command buffer recording for one swapchain image
//!
//! The scene command buffer holds the shadow pass followed by the scene
//! pass. The overlay gets its own command buffer, begun inside the overlay
//! pass and handed to the overlay collaborator.

use crate::render::api::{OverlayFrame, OverlayRenderer, OverlayState};
use crate::render::backends::vulkan::rendering::{
    scene_bindings, ActiveRenderPass, CommandRecorder, DrawList, GraphicsPipeline, ShadowTarget,
};
use crate::render::backends::vulkan::resources::{DynamicUniformBlock, GpuMeshBuffers, Texture};
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// Everything the shadow and scene passes read
pub struct SceneRecording<'a> {
    /// Draws in upload order
    pub draws: &'a DrawList<'a, GpuMeshBuffers>,
    /// Packed model blocks, for dynamic offsets
    pub dynamic_block: &'a DynamicUniformBlock,
    /// Scene uniform set of this image
    pub scene_set: vk::DescriptorSet,
    /// Loaded textures, indexed by `TextureId`
    pub textures: &'a [Texture],
    /// Shadow map target
    pub shadow: &'a ShadowTarget,
    /// Depth-only pipeline for the shadow pass
    pub offscreen_pipeline: &'a GraphicsPipeline,
    /// Multisampled scene pipeline
    pub scene_pipeline: &'a GraphicsPipeline,
    /// Scene render pass
    pub scene_pass: vk::RenderPass,
    /// Scene framebuffer of this image
    pub scene_framebuffer: vk::Framebuffer,
    /// Swapchain extent
    pub extent: vk::Extent2D,
    /// Colour the scene is cleared to
    pub clear_color: [f32; 4],
    /// Constant and slope depth bias for the shadow pass
    pub depth_bias: (f32, f32),
}

/// Record the shadow pass then the scene pass into `command_buffer`
pub fn record_scene(device: &Device, command_buffer: vk::CommandBuffer, scene: &SceneRecording<'_>) -> VulkanResult<()> {
    let mut recorder = CommandRecorder::begin(device, command_buffer, vk::CommandBufferUsageFlags::empty())?;

    {
        let clears = [vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
        }];
        let mut pass = recorder.begin_render_pass(
            scene.shadow.render_pass(),
            scene.shadow.framebuffer(),
            scene.shadow.extent(),
            &clears,
        );
        pass.set_viewport_and_scissor(scene.shadow.extent());
        pass.set_depth_bias(scene.depth_bias.0, 0.0, scene.depth_bias.1);
        pass.bind_pipeline(scene.offscreen_pipeline.handle());
        for entry in scene.draws.entries() {
            let layout = scene.offscreen_pipeline.layout();
            let offset = scene.dynamic_block.offset_of(entry.bound_slot);
            pass.bind_descriptor_sets(layout, 0, &[scene.scene_set], &[offset]);
            draw_mesh(&mut pass, layout, &entry.mesh.buffers, bytemuck::bytes_of(&entry.model_block()));
        }
    }

    {
        let clears = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: scene.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: scene.clear_color,
                },
            },
        ];
        let mut pass = recorder.begin_render_pass(scene.scene_pass, scene.scene_framebuffer, scene.extent, &clears);
        pass.set_viewport_and_scissor(scene.extent);
        pass.bind_pipeline(scene.scene_pipeline.handle());
        let layout = scene.scene_pipeline.layout();

        for entry in scene.draws.entries() {
            let texture_set = match entry.texture() {
                Some(id) => Some(
                    scene
                        .textures
                        .get(id.0)
                        .map(Texture::descriptor_set)
                        .ok_or_else(|| VulkanError::InvalidOperation {
                            reason: format!("draw references missing texture {}", id.0),
                        })?,
                ),
                None => None,
            };
            let dynamic_offsets = [scene.dynamic_block.offset_of(entry.bound_slot)];
            for binding in scene_bindings(scene.scene_set, texture_set, scene.shadow.descriptor_set()) {
                let offsets: &[u32] = if binding.dynamic { &dynamic_offsets } else { &[] };
                pass.bind_descriptor_sets(layout, binding.first_set, &binding.sets, offsets);
            }
            draw_mesh(&mut pass, layout, &entry.mesh.buffers, bytemuck::bytes_of(&entry.model_block()));
        }
    }

    recorder.end()?;
    Ok(())
}

fn draw_mesh(pass: &mut ActiveRenderPass<'_, '_>, layout: vk::PipelineLayout, mesh: &GpuMeshBuffers, model: &[u8]) {
    pass.bind_geometry(mesh.vertex_buffer(), mesh.index_buffer());
    pass.push_constants(layout, vk::ShaderStageFlags::ALL_GRAPHICS, model);
    pass.draw_indexed(mesh.index_count());
}

/// Where the overlay draws for one image
pub struct OverlayRecording {
    /// Overlay render pass
    pub render_pass: vk::RenderPass,
    /// Overlay framebuffer of this image
    pub framebuffer: vk::Framebuffer,
    /// Swapchain extent
    pub extent: vk::Extent2D,
    /// Swapchain image index
    pub image_index: u32,
}

/// Begin the overlay pass and let `overlay` fill it
pub fn record_overlay(
    device: &Device,
    command_buffer: vk::CommandBuffer,
    target: &OverlayRecording,
    overlay: &mut dyn OverlayRenderer,
    state: &mut OverlayState,
) -> VulkanResult<()> {
    let mut recorder = CommandRecorder::begin(device, command_buffer, vk::CommandBufferUsageFlags::empty())?;
    {
        let pass = recorder.begin_render_pass(target.render_pass, target.framebuffer, target.extent, &[]);
        let frame = OverlayFrame {
            command_buffer: pass.command_buffer(),
            image_index: target.image_index,
            extent: target.extent,
        };
        overlay.record(&frame, state);
    }
    recorder.end()?;
    Ok(())
}
