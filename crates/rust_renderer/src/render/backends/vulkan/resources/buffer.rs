//! Buffer management for vertex, index, uniform and staging data

use super::memory;
use crate::render::backends::vulkan::rendering::commands::CommandPool;
use crate::render::backends::vulkan::VulkanResult;
use ash::{vk, Device};

/// Buffer wrapper with memory management
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a buffer and bind freshly allocated memory to it
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None)? };
        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let memory = match memory::allocate(&device, memory_properties, requirements, properties) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        // From here on Drop releases both handles
        let buffer = Self { device, buffer, memory, size };
        unsafe { buffer.device.bind_buffer_memory(buffer.buffer, buffer.memory, 0)? };
        Ok(buffer)
    }

    /// Host-visible coherent buffer
    pub fn host_visible(device: Device, memory_properties: &vk::PhysicalDeviceMemoryProperties, size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> VulkanResult<Self> {
        Self::new(
            device,
            memory_properties,
            size,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )
    }

    /// Device-local buffer filled through a temporary staging buffer
    pub fn device_local_with_data(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        queue: vk::Queue,
        data: &[u8],
        usage: vk::BufferUsageFlags,
    ) -> VulkanResult<Self> {
        let size = data.len() as vk::DeviceSize;
        let staging = Self::host_visible(device.clone(), memory_properties, size, vk::BufferUsageFlags::TRANSFER_SRC)?;
        staging.write_bytes(0, data)?;

        let buffer = Self::new(
            device,
            memory_properties,
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        command_pool.submit_one_time(queue, |recorder| {
            recorder.copy_buffer(staging.handle(), buffer.handle(), size);
            Ok(())
        })?;

        Ok(buffer)
    }

    /// Map, copy `data` at `offset`, unmap
    pub fn write_bytes(&self, offset: vk::DeviceSize, data: &[u8]) -> VulkanResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let len = data.len() as vk::DeviceSize;
        debug_assert!(offset + len <= self.size, "write past end of buffer");
        unsafe {
            let ptr = self.device.map_memory(self.memory, offset, len, vk::MemoryMapFlags::empty())?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.cast::<u8>(), data.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    /// Map, copy one plain-data value at offset 0, unmap
    pub fn write<T: bytemuck::Pod>(&self, value: &T) -> VulkanResult<()> {
        self.write_bytes(0, bytemuck::bytes_of(value))
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
