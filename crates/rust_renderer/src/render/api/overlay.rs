//! UI overlay collaborator
//!
//! The overlay draws into the presentable image after the scene pass has
//! resolved into it. It receives the handles it needs once at startup and
//! again after every swapchain rebuild, and records into a command buffer
//! the renderer has already begun inside the overlay render pass.

use ash::vk;

/// Handles an overlay needs to build its own GPU state
///
/// The overlay owns its descriptor pool and pipelines; these are the
/// renderer-owned objects it must be compatible with.
#[derive(Debug, Clone, Copy)]
pub struct OverlayTargets {
    /// Vulkan instance handle
    pub instance: vk::Instance,
    /// Selected physical device
    pub physical_device: vk::PhysicalDevice,
    /// Logical device handle
    pub device: vk::Device,
    /// Graphics queue family index
    pub queue_family: u32,
    /// Graphics queue
    pub queue: vk::Queue,
    /// Overlay render pass (load existing colour, present at the end)
    pub render_pass: vk::RenderPass,
    /// Swapchain image count
    pub image_count: u32,
    /// Swapchain extent
    pub extent: vk::Extent2D,
}

/// What the overlay records into for one frame
#[derive(Debug, Clone, Copy)]
pub struct OverlayFrame {
    /// Command buffer inside an active overlay render pass
    pub command_buffer: vk::CommandBuffer,
    /// Swapchain image index being drawn
    pub image_index: u32,
    /// Current extent
    pub extent: vk::Extent2D,
}

/// UI toggles owned by the application and passed into each frame
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayState {
    /// Show the built-in demo window
    pub show_demo_window: bool,
    /// Show the secondary window
    pub show_another_window: bool,
    /// Colour edited through the UI
    pub clear_color: [f32; 4],
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            show_demo_window: true,
            show_another_window: false,
            clear_color: [0.45, 0.55, 0.60, 1.00],
        }
    }
}

/// Immediate-mode UI renderer
pub trait OverlayRenderer {
    /// Called after startup and after every swapchain rebuild
    fn on_targets_changed(&mut self, targets: &OverlayTargets);

    /// Emit draw commands for this frame
    fn record(&mut self, frame: &OverlayFrame, state: &mut OverlayState);
}

/// Overlay that draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOverlay;

impl OverlayRenderer for NullOverlay {
    fn on_targets_changed(&mut self, targets: &OverlayTargets) {
        log::debug!("Overlay targets: {} images, {}x{}", targets.image_count, targets.extent.width, targets.extent.height);
    }

    fn record(&mut self, _frame: &OverlayFrame, _state: &mut OverlayState) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_state_defaults() {
        let state = OverlayState::default();
        assert!(state.show_demo_window);
        assert!(!state.show_another_window);
    }

    #[test]
    fn null_overlay_leaves_state_untouched() {
        let mut overlay = NullOverlay;
        let mut state = OverlayState::default();
        let frame = OverlayFrame {
            command_buffer: vk::CommandBuffer::null(),
            image_index: 0,
            extent: vk::Extent2D { width: 800, height: 600 },
        };
        overlay.record(&frame, &mut state);
        assert_eq!(state, OverlayState::default());
    }
}
