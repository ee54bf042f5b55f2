//! Memory type selection

use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::vk;

/// First memory type allowed by `type_filter` that has all of `properties`
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    let count = memory_properties.memory_type_count.min(vk::MAX_MEMORY_TYPES as u32);
    (0..count)
        .find(|&i| {
            type_filter & (1 << i) != 0 && memory_properties.memory_types[i as usize].property_flags.contains(properties)
        })
        .ok_or(VulkanError::NoCompatibleMemoryType { type_filter, properties })
}

/// Allocate memory satisfying `requirements` with `properties`
pub fn allocate(
    device: &ash::Device,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    requirements: vk::MemoryRequirements,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<vk::DeviceMemory> {
    let memory_type_index = find_memory_type(memory_properties, requirements.memory_type_bits, properties)?;
    let alloc_info = vk::MemoryAllocateInfo::builder()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);
    Ok(unsafe { device.allocate_memory(&alloc_info, None)? })
}
