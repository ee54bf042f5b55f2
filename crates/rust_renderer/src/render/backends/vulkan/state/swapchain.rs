//! Swapchain creation and the choices that feed it
//!
//! The `choose_*` functions are pure so the negotiation rules can be tested
//! against fabricated surface capabilities.

use crate::render::backends::vulkan::initialization::{QueueFamilyIndices, SurfaceHandle};
use crate::render::backends::vulkan::resources::ImageView;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

/// Preferred 8-bit format, falling back to the first reported
pub fn choose_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    let preferred = vk::SurfaceFormatKHR {
        format: vk::Format::R8G8B8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    match available {
        [] => None,
        [only] if only.format == vk::Format::UNDEFINED => Some(preferred),
        _ => available
            .iter()
            .find(|f| {
                matches!(f.format, vk::Format::R8G8B8A8_UNORM | vk::Format::B8G8R8A8_UNORM)
                    && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
            .or_else(|| available.first())
            .copied(),
    }
}

/// MAILBOX when offered, FIFO otherwise
pub fn choose_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Surface extent, or the framebuffer size clamped when the surface leaves it open
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, framebuffer_size: (u32, u32)) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    let (width, height) = framebuffer_size;
    vk::Extent2D {
        width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum when there is one
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// Result of acquiring a presentable image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image ready to render into
    Acquired {
        /// Swapchain image index
        image_index: u32,
        /// Surface no longer matches exactly but is still usable
        suboptimal: bool,
    },
    /// Swapchain must be rebuilt before rendering
    OutOfDate,
}

/// Result of presenting an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Image queued for display
    Presented,
    /// Presented or not, the swapchain is out of date or suboptimal
    Stale,
}

/// Swapchain with per-image views
pub struct Swapchain {
    image_views: Vec<ImageView>,
    images: Vec<vk::Image>,
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Negotiate and create a swapchain for `surface`
    pub fn new(
        device: &Device,
        loader: &SwapchainLoader,
        surface: &SurfaceHandle,
        physical_device: vk::PhysicalDevice,
        queue_families: QueueFamilyIndices,
        framebuffer_size: (u32, u32),
    ) -> VulkanResult<Self> {
        let capabilities = surface.capabilities(physical_device)?;
        let format = choose_surface_format(&surface.formats(physical_device)?)
            .ok_or_else(|| VulkanError::InitializationFailed("surface reports no formats".to_string()))?;
        let present_mode = choose_present_mode(&surface.present_modes(physical_device)?);
        let extent = choose_extent(&capabilities, framebuffer_size);
        let image_count = choose_image_count(&capabilities);

        let family_indices = [queue_families.graphics, queue_families.present];
        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.handle)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        create_info = if queue_families.is_shared() {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        };

        let swapchain = unsafe { loader.create_swapchain(&create_info, None)? };
        let mut this = Self {
            image_views: Vec::new(),
            images: Vec::new(),
            loader: loader.clone(),
            swapchain,
            format,
            extent,
        };

        this.images = unsafe { loader.get_swapchain_images(swapchain)? };
        this.image_views = this
            .images
            .iter()
            .map(|&image| ImageView::new(device.clone(), image, format.format, vk::ImageAspectFlags::COLOR, 1))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::info!(
            "Created swapchain: {} images, {}x{}, {:?}, {:?}",
            this.images.len(),
            extent.width,
            extent.height,
            format.format,
            present_mode
        );

        Ok(this)
    }

    /// Acquire the next image, signalling `semaphore`
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> VulkanResult<AcquireOutcome> {
        match unsafe { self.loader.acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null()) } {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    /// Queue `image_index` for presentation after `wait` is signalled
    pub fn present(&self, queue: vk::Queue, wait: vk::Semaphore, image_index: u32) -> VulkanResult<PresentOutcome> {
        let wait_semaphores = [wait];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.loader.queue_present(queue, &present_info) } {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
            Err(e) => Err(VulkanError::Presentation(e)),
        }
    }

    /// Number of images
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Per-image views
    pub fn image_views(&self) -> &[ImageView] {
        &self.image_views
    }

    /// Surface format
    pub fn format(&self) -> vk::Format {
        self.format.format
    }

    /// Image extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.image_views.clear();
        unsafe {
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    fn capabilities(min: u32, max: u32, current: vk::Extent2D) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: current,
            min_image_extent: vk::Extent2D { width: 16, height: 16 },
            max_image_extent: vk::Extent2D { width: 1920, height: 1080 },
            ..Default::default()
        }
    }

    #[test]
    fn undefined_format_means_free_choice() {
        let chosen = choose_surface_format(&[format(vk::Format::UNDEFINED, vk::ColorSpaceKHR::SRGB_NONLINEAR)]);
        assert_eq!(chosen.map(|f| f.format), Some(vk::Format::R8G8B8A8_UNORM));
    }

    #[test]
    fn preferred_format_wins_over_first() {
        let formats = [
            format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(choose_surface_format(&formats).map(|f| f.format), Some(vk::Format::B8G8R8A8_UNORM));
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [
            format(vk::Format::A2B10G10R10_UNORM_PACK32, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(choose_surface_format(&formats), Some(formats[0]));
        assert_eq!(choose_surface_format(&[]), None);
    }

    #[test]
    fn mailbox_preferred_over_fifo() {
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(choose_present_mode(&[vk::PresentModeKHR::IMMEDIATE]), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn extent_uses_current_unless_sentinel() {
        let fixed = capabilities(2, 3, vk::Extent2D { width: 800, height: 600 });
        assert_eq!(choose_extent(&fixed, (1024, 768)), vk::Extent2D { width: 800, height: 600 });

        let open = capabilities(2, 3, vk::Extent2D { width: u32::MAX, height: u32::MAX });
        assert_eq!(choose_extent(&open, (800, 600)), vk::Extent2D { width: 800, height: 600 });
        assert_eq!(choose_extent(&open, (4000, 8)), vk::Extent2D { width: 1920, height: 16 });
    }

    #[test]
    fn image_count_is_min_plus_one_clamped() {
        let extent = vk::Extent2D { width: 800, height: 600 };
        assert_eq!(choose_image_count(&capabilities(2, 8, extent)), 3);
        assert_eq!(choose_image_count(&capabilities(3, 3, extent)), 3);
        assert_eq!(choose_image_count(&capabilities(2, 0, extent)), 3);
    }
}
