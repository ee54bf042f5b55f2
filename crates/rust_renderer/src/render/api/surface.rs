//! Windowing collaborator

use crate::render::backends::vulkan::VulkanResult;
use ash::vk;

/// A window the renderer can present to
///
/// Resize notification is push-based: the owner of the window forwards
/// framebuffer-size events to `VulkanRenderer::notify_framebuffer_resized`.
pub trait RenderSurface {
    /// Current framebuffer size in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    /// Block until at least one window event arrives
    ///
    /// Used while the framebuffer is zero-sized (minimised).
    fn wait_events(&mut self);

    /// Instance extensions needed to create a surface for this window
    fn required_instance_extensions(&self) -> VulkanResult<Vec<String>>;

    /// Create a presentable surface on `instance`
    fn create_surface(&mut self, instance: vk::Instance) -> VulkanResult<vk::SurfaceKHR>;
}
