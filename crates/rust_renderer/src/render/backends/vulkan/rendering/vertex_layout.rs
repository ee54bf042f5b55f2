//! Vertex input description for [`Vertex`]

use crate::render::primitives::Vertex;
use ash::vk;
use std::mem::{offset_of, size_of};

/// Vulkan vertex layout for the renderer's vertex type
pub struct VulkanVertexLayout;

impl VulkanVertexLayout {
    /// One interleaved binding advancing per vertex
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Position, colour, uv and normal at locations 0 to 3
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 4] {
        let attribute = |location, format, offset: usize| vk::VertexInputAttributeDescription {
            binding: 0,
            location,
            format,
            offset: offset as u32,
        };
        [
            attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, position)),
            attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, color)),
            attribute(2, vk::Format::R32G32_SFLOAT, offset_of!(Vertex, tex_coord)),
            attribute(3, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, normal)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_matches_vertex_size() {
        assert_eq!(VulkanVertexLayout::binding_description().stride, 44);
    }

    #[test]
    fn attributes_are_packed_in_order() {
        let offsets: Vec<u32> = VulkanVertexLayout::attribute_descriptions().iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 32]);
        let locations: Vec<u32> = VulkanVertexLayout::attribute_descriptions().iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2, 3]);
    }
}
