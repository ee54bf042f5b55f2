//! Command pool and command buffer recording
//!
//! [`CommandRecorder`] wraps a primary command buffer between begin and end.
//! Render passes are scoped by [`ActiveRenderPass`], which ends the pass
//! when dropped, so a pass can never be left open.

use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool whose buffers can be reset individually
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe { device.create_command_pool(&pool_create_info, None)? };

        Ok(Self { device, command_pool })
    }

    /// Allocate primary command buffers
    pub fn allocate(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        Ok(unsafe { self.device.allocate_command_buffers(&alloc_info)? })
    }

    /// Return command buffers to the pool
    pub fn free(&self, command_buffers: &[vk::CommandBuffer]) {
        if !command_buffers.is_empty() {
            unsafe { self.device.free_command_buffers(self.command_pool, command_buffers) };
        }
    }

    /// Record with `record`, submit to `queue` and wait for completion
    ///
    /// Nothing is submitted if `record` fails.
    pub fn submit_one_time<F>(&self, queue: vk::Queue, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&mut CommandRecorder<'_>) -> VulkanResult<()>,
    {
        let command_buffers = self.allocate(1)?;
        let result = self.record_and_submit(queue, command_buffers[0], record);
        self.free(&command_buffers);
        result
    }

    fn record_and_submit<F>(&self, queue: vk::Queue, command_buffer: vk::CommandBuffer, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&mut CommandRecorder<'_>) -> VulkanResult<()>,
    {
        let mut recorder = CommandRecorder::begin(&self.device, command_buffer, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        record(&mut recorder)?;
        recorder.end()?;

        let buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&buffers).build();
        unsafe {
            self.device.queue_submit(queue, &[submit_info], vk::Fence::null())?;
            self.device.queue_wait_idle(queue)?;
        }
        Ok(())
    }

    /// Get the command pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Command buffers returned to their pool on drop
pub struct CommandBuffers {
    device: Device,
    pool: vk::CommandPool,
    buffers: Vec<vk::CommandBuffer>,
}

impl CommandBuffers {
    /// Allocate `count` primary buffers from `pool`
    pub fn new(pool: &CommandPool, count: u32) -> VulkanResult<Self> {
        Ok(Self {
            device: pool.device.clone(),
            pool: pool.command_pool,
            buffers: pool.allocate(count)?,
        })
    }

    /// Buffer at `index`
    pub fn get(&self, index: usize) -> VulkanResult<vk::CommandBuffer> {
        self.buffers.get(index).copied().ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("no command buffer for image {} of {}", index, self.buffers.len()),
        })
    }

    /// Number of buffers
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether no buffers were allocated
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl Drop for CommandBuffers {
    fn drop(&mut self) {
        if !self.buffers.is_empty() {
            unsafe { self.device.free_command_buffers(self.pool, &self.buffers) };
        }
    }
}

/// Command buffer in the recording state
pub struct CommandRecorder<'a> {
    device: &'a Device,
    command_buffer: vk::CommandBuffer,
    recording: bool,
}

impl<'a> CommandRecorder<'a> {
    /// Begin recording into `command_buffer`
    pub fn begin(device: &'a Device, command_buffer: vk::CommandBuffer, flags: vk::CommandBufferUsageFlags) -> VulkanResult<Self> {
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(flags);
        unsafe { device.begin_command_buffer(command_buffer, &begin_info)? };
        Ok(Self {
            device,
            command_buffer,
            recording: true,
        })
    }

    /// Finish recording
    pub fn end(mut self) -> VulkanResult<vk::CommandBuffer> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            });
        }
        unsafe { self.device.end_command_buffer(self.command_buffer)? };
        self.recording = false;
        Ok(self.command_buffer)
    }

    /// Raw handle, for collaborators that record their own commands
    pub fn handle(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// Begin an inline render pass
    pub fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    ) -> ActiveRenderPass<'_, 'a> {
        let render_pass_begin = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(self.command_buffer, &render_pass_begin, vk::SubpassContents::INLINE);
        }

        ActiveRenderPass { recorder: self }
    }

    /// Copy `size` bytes between buffers
    pub fn copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, size: vk::DeviceSize) {
        let region = vk::BufferCopy { src_offset: 0, dst_offset: 0, size };
        unsafe { self.device.cmd_copy_buffer(self.command_buffer, src, dst, &[region]) };
    }

    /// Copy a tightly packed buffer into mip 0 of a colour image
    pub fn copy_buffer_to_image(&mut self, buffer: vk::Buffer, image: vk::Image, width: u32, height: u32) {
        let region = vk::BufferImageCopy::builder()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D { width, height, depth: 1 })
            .build();

        unsafe {
            self.device.cmd_copy_buffer_to_image(
                self.command_buffer,
                buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
    }

    /// Record one image memory barrier
    pub fn image_barrier(&mut self, src_stage: vk::PipelineStageFlags, dst_stage: vk::PipelineStageFlags, barrier: vk::ImageMemoryBarrier) {
        unsafe {
            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }

    /// Linear blit between two mip levels of the same image
    pub fn blit_image(&mut self, image: vk::Image, blit: vk::ImageBlit) {
        unsafe {
            self.device.cmd_blit_image(
                self.command_buffer,
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[blit],
                vk::Filter::LINEAR,
            );
        }
    }
}

/// Render pass scope; ends the pass on drop
pub struct ActiveRenderPass<'r, 'a> {
    recorder: &'r mut CommandRecorder<'a>,
}

impl ActiveRenderPass<'_, '_> {
    /// Command buffer being recorded
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.recorder.command_buffer
    }

    /// Full-extent viewport and scissor
    pub fn set_viewport_and_scissor(&mut self, extent: vk::Extent2D) {
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        unsafe {
            self.recorder.device.cmd_set_viewport(self.recorder.command_buffer, 0, &[viewport]);
            self.recorder.device.cmd_set_scissor(self.recorder.command_buffer, 0, &[scissor]);
        }
    }

    /// Dynamic depth bias
    pub fn set_depth_bias(&mut self, constant: f32, clamp: f32, slope: f32) {
        unsafe {
            self.recorder
                .device
                .cmd_set_depth_bias(self.recorder.command_buffer, constant, clamp, slope);
        }
    }

    /// Bind graphics pipeline
    pub fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        unsafe {
            self.recorder
                .device
                .cmd_bind_pipeline(self.recorder.command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
    }

    /// Bind one vertex buffer and a u32 index buffer
    pub fn bind_geometry(&mut self, vertex_buffer: vk::Buffer, index_buffer: vk::Buffer) {
        unsafe {
            self.recorder
                .device
                .cmd_bind_vertex_buffers(self.recorder.command_buffer, 0, &[vertex_buffer], &[0]);
            self.recorder
                .device
                .cmd_bind_index_buffer(self.recorder.command_buffer, index_buffer, 0, vk::IndexType::UINT32);
        }
    }

    /// Bind descriptor sets starting at `first_set`
    pub fn bind_descriptor_sets(&mut self, layout: vk::PipelineLayout, first_set: u32, sets: &[vk::DescriptorSet], dynamic_offsets: &[u32]) {
        unsafe {
            self.recorder.device.cmd_bind_descriptor_sets(
                self.recorder.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                first_set,
                sets,
                dynamic_offsets,
            );
        }
    }

    /// Push constants to shaders
    pub fn push_constants(&mut self, layout: vk::PipelineLayout, stages: vk::ShaderStageFlags, data: &[u8]) {
        unsafe {
            self.recorder
                .device
                .cmd_push_constants(self.recorder.command_buffer, layout, stages, 0, data);
        }
    }

    /// Draw indexed
    pub fn draw_indexed(&mut self, index_count: u32) {
        unsafe {
            self.recorder
                .device
                .cmd_draw_indexed(self.recorder.command_buffer, index_count, 1, 0, 0, 0);
        }
    }
}

impl Drop for ActiveRenderPass<'_, '_> {
    fn drop(&mut self) {
        unsafe {
            self.recorder.device.cmd_end_render_pass(self.recorder.command_buffer);
        }
    }
}
