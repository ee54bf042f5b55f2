//! GPU vertex and index buffers for one mesh

use super::buffer::Buffer;
use crate::assets::MeshData;
use crate::render::backends::vulkan::rendering::commands::CommandPool;
use crate::render::backends::vulkan::VulkanResult;
use ash::{vk, Device};

/// Device-local geometry owned by one drawable
pub struct GpuMeshBuffers {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
}

impl GpuMeshBuffers {
    /// Upload a mesh through staging buffers
    pub fn new(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        queue: vk::Queue,
        mesh: &MeshData,
    ) -> VulkanResult<Self> {
        mesh.validate()?;

        let vertex_buffer = Buffer::device_local_with_data(
            device.clone(),
            memory_properties,
            command_pool,
            queue,
            bytemuck::cast_slice(&mesh.vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = Buffer::device_local_with_data(
            device.clone(),
            memory_properties,
            command_pool,
            queue,
            bytemuck::cast_slice(&mesh.indices),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;

        log::debug!("Uploaded mesh with {} vertices, {} indices", mesh.vertices.len(), mesh.indices.len());

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
        })
    }

    /// Vertex buffer handle
    pub fn vertex_buffer(&self) -> vk::Buffer {
        self.vertex_buffer.handle()
    }

    /// Index buffer handle
    pub fn index_buffer(&self) -> vk::Buffer {
        self.index_buffer.handle()
    }

    /// Number of indices to draw
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
