//! # Rust Renderer
//!
//! A Vulkan renderer for lit, textured 3D scenes with a directional-light
//! shadow map, multisampled scene rendering and an immediate-mode UI overlay.
//!
//! ## Frame structure
//!
//! Each frame renders three passes into one swapchain image:
//!
//! 1. **Shadow** - depth-only render of every drawable from the light
//! 2. **Scene** - MSAA colour and depth, resolved into the swapchain image
//! 3. **Overlay** - UI drawn on top of the resolved image, then presented
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_renderer::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RendererConfig::default();
//!     let mut window = Window::new(&config.window)?;
//!     let mut renderer = VulkanRenderer::new(&mut window, config, Box::new(NullOverlay))?;
//!
//!     let mut camera = Camera::perspective(Vec3::new(0.0, 4.0, 8.0), 45.0, 4.0 / 3.0, 0.1, 100.0);
//!     camera.look_at(Vec3::zeros());
//!     let mut ui = OverlayState::default();
//!
//!     while !window.should_close() {
//!         window.poll_events();
//!         renderer.draw(&mut window, &FrameInput::from_camera(&camera), &mut ui)?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod assets;
pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        assets::{ImageCrateDecoder, MeshData, ModelData, TextureData, TextureDecoder},
        config::Config,
        core::config::{DynamicOffsetMode, RendererConfig, ShaderConfig},
        foundation::math::{Mat4, Mat4Ext, Vec3},
        render::{
            api::{CameraSource, FrameInput, NullOverlay, OverlayRenderer, OverlayState, RenderSurface},
            backends::vulkan::{FrameOutcome, TextureId, VulkanError, VulkanRenderer, VulkanResult},
            primitives::{Camera, Vertex},
            Window,
        },
        scene::{DirectionalLight, MeshId, ModelId},
    };
}
