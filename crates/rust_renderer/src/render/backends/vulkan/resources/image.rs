//! Images, image views and layout transitions

use super::memory;
use crate::render::backends::vulkan::rendering::commands::CommandRecorder;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// Creation parameters for [`Image::new`]
#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Mip level count
    pub mip_levels: u32,
    /// Texel format
    pub format: vk::Format,
    /// Tiling mode
    pub tiling: vk::ImageTiling,
    /// Usage flags
    pub usage: vk::ImageUsageFlags,
    /// Memory property flags
    pub properties: vk::MemoryPropertyFlags,
    /// Sample count
    pub samples: vk::SampleCountFlags,
}

impl ImageDesc {
    /// Single-mip, optimally tiled, device-local image
    pub fn attachment(extent: vk::Extent2D, format: vk::Format, usage: vk::ImageUsageFlags, samples: vk::SampleCountFlags) -> Self {
        Self {
            width: extent.width,
            height: extent.height,
            mip_levels: 1,
            format,
            tiling: vk::ImageTiling::OPTIMAL,
            usage,
            properties: vk::MemoryPropertyFlags::DEVICE_LOCAL,
            samples,
        }
    }
}

/// 2D image with its own memory
pub struct Image {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    format: vk::Format,
    mip_levels: u32,
}

impl Image {
    /// Create an image and bind freshly allocated memory to it
    pub fn new(device: Device, memory_properties: &vk::PhysicalDeviceMemoryProperties, desc: &ImageDesc) -> VulkanResult<Self> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: desc.width,
                height: desc.height,
                depth: 1,
            })
            .mip_levels(desc.mip_levels)
            .array_layers(1)
            .format(desc.format)
            .tiling(desc.tiling)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(desc.usage)
            .samples(desc.samples)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let image = unsafe { device.create_image(&image_info, None)? };
        let requirements = unsafe { device.get_image_memory_requirements(image) };

        let memory = match memory::allocate(&device, memory_properties, requirements, desc.properties) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let image = Self {
            device,
            image,
            memory,
            format: desc.format,
            mip_levels: desc.mip_levels,
        };
        unsafe { image.device.bind_image_memory(image.image, image.memory, 0)? };
        Ok(image)
    }

    /// View over every mip level
    pub fn create_view(&self, aspect: vk::ImageAspectFlags) -> VulkanResult<ImageView> {
        ImageView::new(self.device.clone(), self.image, self.format, aspect, self.mip_levels)
    }

    /// Get image handle
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Texel format
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Mip level count
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Image view wrapper with RAII cleanup
pub struct ImageView {
    device: Device,
    view: vk::ImageView,
}

impl ImageView {
    /// Create a 2D view
    pub fn new(device: Device, image: vk::Image, format: vk::Format, aspect: vk::ImageAspectFlags, mip_levels: u32) -> VulkanResult<Self> {
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: mip_levels,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = unsafe { device.create_image_view(&create_info, None)? };
        Ok(Self { device, view })
    }

    /// Get view handle
    pub fn handle(&self) -> vk::ImageView {
        self.view
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image_view(self.view, None);
        }
    }
}

/// Image plus a view over it
pub struct ImageTarget {
    /// View, dropped before the image
    pub view: ImageView,
    /// Image
    pub image: Image,
}

impl ImageTarget {
    /// Create an image and a view with `aspect`
    pub fn new(device: Device, memory_properties: &vk::PhysicalDeviceMemoryProperties, desc: &ImageDesc, aspect: vk::ImageAspectFlags) -> VulkanResult<Self> {
        let image = Image::new(device, memory_properties, desc)?;
        let view = image.create_view(aspect)?;
        Ok(Self { view, image })
    }
}

/// Access masks and stages for the layout transitions the texture path uses
pub fn transition_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Option<(vk::AccessFlags, vk::AccessFlags, vk::PipelineStageFlags, vk::PipelineStageFlags)> {
    match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Some((
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        )),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => Some((
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        )),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL) => Some((
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::TRANSFER,
        )),
        (vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => Some((
            vk::AccessFlags::TRANSFER_READ,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        )),
        _ => None,
    }
}

fn color_levels(base_mip_level: u32, level_count: u32) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level,
        level_count,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Record a layout transition for `level_count` colour mips starting at `base_mip_level`
pub fn transition_layout(
    recorder: &mut CommandRecorder<'_>,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    base_mip_level: u32,
    level_count: u32,
) -> VulkanResult<()> {
    let (src_access, dst_access, src_stage, dst_stage) = transition_masks(old_layout, new_layout).ok_or_else(|| VulkanError::InvalidOperation {
        reason: format!("unsupported layout transition {old_layout:?} -> {new_layout:?}"),
    })?;

    let barrier = vk::ImageMemoryBarrier::builder()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_levels(base_mip_level, level_count))
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .build();

    recorder.image_barrier(src_stage, dst_stage, barrier);
    Ok(())
}

/// Halved extent for the next mip level, never below 1
pub fn next_mip_extent(width: i32, height: i32) -> (i32, i32) {
    ((width / 2).max(1), (height / 2).max(1))
}

/// Blit each mip level from the previous one
///
/// Expects every level in TRANSFER_DST_OPTIMAL with level 0 filled. Leaves
/// every level in SHADER_READ_ONLY_OPTIMAL.
pub fn generate_mipmaps(recorder: &mut CommandRecorder<'_>, image: vk::Image, width: u32, height: u32, mip_levels: u32) -> VulkanResult<()> {
    let mut mip_width = width as i32;
    let mut mip_height = height as i32;

    for level in 1..mip_levels {
        transition_layout(
            recorder,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            level - 1,
            1,
        )?;

        let (next_width, next_height) = next_mip_extent(mip_width, mip_height);
        let blit = vk::ImageBlit::builder()
            .src_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D { x: mip_width, y: mip_height, z: 1 },
            ])
            .src_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level - 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .dst_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D { x: next_width, y: next_height, z: 1 },
            ])
            .dst_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level,
                base_array_layer: 0,
                layer_count: 1,
            })
            .build();
        recorder.blit_image(image, blit);

        transition_layout(
            recorder,
            image,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            level - 1,
            1,
        )?;

        mip_width = next_width;
        mip_height = next_height;
    }

    // The last level was only ever a blit destination
    transition_layout(
        recorder,
        image,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        mip_levels.saturating_sub(1),
        1,
    )
}

/// First candidate whose optimal-tiling features include `features`
pub fn choose_supported_format<F>(candidates: &[vk::Format], features: vk::FormatFeatureFlags, optimal_features: F) -> VulkanResult<vk::Format>
where
    F: Fn(vk::Format) -> vk::FormatFeatureFlags,
{
    candidates
        .iter()
        .copied()
        .find(|&format| optimal_features(format).contains(features))
        .ok_or_else(|| VulkanError::InitializationFailed("no supported depth format".to_string()))
}

/// Depth formats in preference order
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 4] = [
    vk::Format::D16_UNORM,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D32_SFLOAT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Depth format usable as an optimally tiled attachment on this device
///
/// The shadow map samples the same format, so sampling support is required too.
pub fn find_depth_format(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> VulkanResult<vk::Format> {
    depth_format_from(|format| {
        unsafe { instance.get_physical_device_format_properties(physical_device, format) }.optimal_tiling_features
    })
}

fn depth_format_from<F>(optimal_features: F) -> VulkanResult<vk::Format>
where
    F: Fn(vk::Format) -> vk::FormatFeatureFlags,
{
    choose_supported_format(
        &DEPTH_FORMAT_CANDIDATES,
        vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT | vk::FormatFeatureFlags::SAMPLED_IMAGE,
        optimal_features,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_format_follows_preference_order() {
        let all = |_| vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
        assert_eq!(
            choose_supported_format(&DEPTH_FORMAT_CANDIDATES, vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT, all).ok(),
            Some(vk::Format::D16_UNORM)
        );

        let only_d32 = |format| {
            if format == vk::Format::D32_SFLOAT {
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT | vk::FormatFeatureFlags::SAMPLED_IMAGE
            } else {
                vk::FormatFeatureFlags::empty()
            }
        };
        assert_eq!(
            choose_supported_format(&DEPTH_FORMAT_CANDIDATES, vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT, only_d32).ok(),
            Some(vk::Format::D32_SFLOAT)
        );
    }

    #[test]
    fn depth_format_fails_when_unsupported() {
        let none = |_| vk::FormatFeatureFlags::empty();
        assert!(choose_supported_format(&DEPTH_FORMAT_CANDIDATES, vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT, none).is_err());
    }

    #[test]
    fn texture_transitions_are_known() {
        assert!(transition_masks(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL).is_some());
        assert!(transition_masks(vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL).is_some());
        assert!(transition_masks(vk::ImageLayout::UNDEFINED, vk::ImageLayout::PRESENT_SRC_KHR).is_none());
    }

    #[test]
    fn mip_extents_halve_down_to_one() {
        assert_eq!(next_mip_extent(512, 128), (256, 64));
        assert_eq!(next_mip_extent(3, 1), (1, 1));
        assert_eq!(next_mip_extent(1, 1), (1, 1));
    }

    #[test]
    fn depth_format_must_be_sampleable() {
        let attachment_only_d16 = |format: vk::Format| match format {
            vk::Format::D16_UNORM => vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::Format::D32_SFLOAT => {
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT | vk::FormatFeatureFlags::SAMPLED_IMAGE
            }
            _ => vk::FormatFeatureFlags::empty(),
        };
        assert_eq!(depth_format_from(attachment_only_d16).ok(), Some(vk::Format::D32_SFLOAT));

        let never_sampled = |_: vk::Format| vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
        assert!(depth_format_from(never_sampled).is_err());
    }
}
