//! Window management using GLFW
//!
//! Provides window creation, event polling and Vulkan surface creation.

use crate::core::config::WindowConfig;
use crate::render::api::RenderSurface;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::vk;
use thiserror::Error;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialised
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The window could not be created
    #[error("Window creation failed")]
    CreationFailed,

    /// Any other GLFW failure
    #[error("GLFW error: {0}")]
    Glfw(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window wrapper
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl Window {
    /// Create a resizable window without a client API
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Created window '{}' ({}x{})", config.title, config.width, config.height);

        Ok(Self { glfw, window, events })
    }

    /// Whether the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Request the window to close
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Process pending events
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    /// Drain queued window events
    pub fn flush_events(&self) -> glfw::FlushedMessages<'_, (f64, glfw::WindowEvent)> {
        glfw::flush_messages(&self.events)
    }

    /// Seconds since GLFW initialisation
    pub fn time(&self) -> f64 {
        self.glfw.get_time()
    }
}

impl RenderSurface for Window {
    fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    fn wait_events(&mut self) {
        self.glfw.wait_events();
    }

    fn required_instance_extensions(&self) -> VulkanResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| VulkanError::Surface(WindowError::Glfw("Vulkan is not supported".to_string()).to_string()))
    }

    fn create_surface(&mut self, instance: vk::Instance) -> VulkanResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(VulkanError::Surface(format!("Failed to create Vulkan surface: {result:?}")))
        }
    }
}
