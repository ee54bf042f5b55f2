//! Graphics pipeline construction
//!
//! [`PipelineBuilder`] covers the two pipelines the renderer needs: the
//! multisampled scene pipeline and the depth-only offscreen pipeline that
//! renders the shadow map. Both share the vertex layout, the dynamic
//! viewport/scissor state and the per-draw push constant range.

use crate::render::backends::vulkan::rendering::shader::ShaderModule;
use crate::render::backends::vulkan::rendering::vertex_layout::VulkanVertexLayout;
use crate::render::backends::vulkan::resources::ModelBlock;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};
use std::mem::size_of;

/// Push constant range carrying a [`ModelBlock`]
pub fn model_push_constant_range() -> vk::PushConstantRange {
    vk::PushConstantRange {
        stage_flags: vk::ShaderStageFlags::ALL_GRAPHICS,
        offset: 0,
        size: size_of::<ModelBlock>() as u32,
    }
}

/// Dynamic states, with depth bias only for the offscreen pipeline
pub fn dynamic_states(depth_bias: bool) -> Vec<vk::DynamicState> {
    let mut states = vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    if depth_bias {
        states.push(vk::DynamicState::DEPTH_BIAS);
    }
    states
}

/// Builder for [`GraphicsPipeline`]
pub struct PipelineBuilder<'a> {
    vertex_shader: &'a ShaderModule,
    fragment_shader: Option<&'a ShaderModule>,
    set_layouts: Vec<vk::DescriptorSetLayout>,
    samples: vk::SampleCountFlags,
    sample_shading: bool,
    depth_compare: vk::CompareOp,
    depth_bias: bool,
}

impl<'a> PipelineBuilder<'a> {
    /// Start from a vertex shader with single sampling and a LESS depth test
    pub fn new(vertex_shader: &'a ShaderModule) -> Self {
        Self {
            vertex_shader,
            fragment_shader: None,
            set_layouts: Vec::new(),
            samples: vk::SampleCountFlags::TYPE_1,
            sample_shading: false,
            depth_compare: vk::CompareOp::LESS,
            depth_bias: false,
        }
    }

    /// Multisampled scene pipeline with a fragment stage and three set layouts
    pub fn scene(
        vertex_shader: &'a ShaderModule,
        fragment_shader: &'a ShaderModule,
        set_layouts: &[vk::DescriptorSetLayout; 3],
        samples: vk::SampleCountFlags,
        sample_shading: bool,
    ) -> Self {
        Self::new(vertex_shader)
            .fragment_shader(fragment_shader)
            .set_layouts(set_layouts)
            .samples(samples)
            .sample_shading(sample_shading)
    }

    /// Vertex-only shadow pipeline with depth bias
    pub fn offscreen(vertex_shader: &'a ShaderModule, scene_layout: vk::DescriptorSetLayout) -> Self {
        Self::new(vertex_shader)
            .set_layouts(&[scene_layout])
            .depth_compare(vk::CompareOp::LESS_OR_EQUAL)
            .depth_bias(true)
    }

    /// Add a fragment stage and one colour attachment
    pub fn fragment_shader(mut self, shader: &'a ShaderModule) -> Self {
        self.fragment_shader = Some(shader);
        self
    }

    /// Descriptor set layouts in set order
    pub fn set_layouts(mut self, layouts: &[vk::DescriptorSetLayout]) -> Self {
        self.set_layouts = layouts.to_vec();
        self
    }

    /// Rasterization sample count
    pub fn samples(mut self, samples: vk::SampleCountFlags) -> Self {
        self.samples = samples;
        self
    }

    /// Per-sample shading with a minimum fraction of 1.0
    pub fn sample_shading(mut self, enabled: bool) -> Self {
        self.sample_shading = enabled;
        self
    }

    /// Depth comparison
    pub fn depth_compare(mut self, op: vk::CompareOp) -> Self {
        self.depth_compare = op;
        self
    }

    /// Enable dynamic depth bias
    pub fn depth_bias(mut self, enabled: bool) -> Self {
        self.depth_bias = enabled;
        self
    }

    /// Create the layout and pipeline for subpass 0 of `render_pass`
    pub fn build(self, device: &Device, render_pass: vk::RenderPass) -> VulkanResult<GraphicsPipeline> {
        let push_constant_ranges = [model_push_constant_range()];
        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&self.set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None)? };

        // Owned from here so an error below still releases the layout
        let mut pipeline = GraphicsPipeline {
            device: device.clone(),
            pipeline: vk::Pipeline::null(),
            layout,
        };
        pipeline.pipeline = self.create_pipeline(device, render_pass, layout)?;
        Ok(pipeline)
    }

    fn create_pipeline(
        &self,
        device: &Device,
        render_pass: vk::RenderPass,
        layout: vk::PipelineLayout,
    ) -> VulkanResult<vk::Pipeline> {
        let mut stages = vec![self.vertex_shader.stage_info(vk::ShaderStageFlags::VERTEX)];
        if let Some(fragment) = self.fragment_shader {
            stages.push(fragment.stage_info(vk::ShaderStageFlags::FRAGMENT));
        }

        let bindings = [VulkanVertexLayout::binding_description()];
        let attributes = VulkanVertexLayout::attribute_descriptions();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(self.depth_bias);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .rasterization_samples(self.samples)
            .sample_shading_enable(self.sample_shading)
            .min_sample_shading(1.0);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(self.depth_compare)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = if self.fragment_shader.is_some() {
            vec![vk::PipelineColorBlendAttachmentState::builder()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(false)
                .build()]
        } else {
            Vec::new()
        };
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let states = dynamic_states(self.depth_bias);
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
                .map_err(|(_, err)| VulkanError::Api(err))?
        };

        log::debug!(
            "Created graphics pipeline ({} stages, {:?}, depth bias {})",
            stages.len(),
            self.samples,
            self.depth_bias
        );

        pipelines
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::InitializationFailed("pipeline creation returned nothing".to_string()))
    }
}

/// Graphics pipeline wrapper that owns its layout
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Get pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            if self.pipeline != vk::Pipeline::null() {
                self.device.destroy_pipeline(self.pipeline, None);
            }
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_range_covers_model_block() {
        let range = model_push_constant_range();
        assert_eq!(range.offset, 0);
        assert_eq!(range.size, 68);
        assert_eq!(range.stage_flags, vk::ShaderStageFlags::ALL_GRAPHICS);
    }

    #[test]
    fn depth_bias_is_dynamic_only_when_requested() {
        assert_eq!(dynamic_states(false), vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR]);
        assert!(dynamic_states(true).contains(&vk::DynamicState::DEPTH_BIAS));
    }
}
