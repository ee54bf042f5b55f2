//! Vulkan backend implementation
//!
//! Organized into initialization, resources, rendering, state and the
//! renderer that ties them together.

/// Backend error type
pub mod error;

/// Instance, surface and device bootstrap
pub mod initialization;

/// Vulkan resource management (buffers, images, textures, descriptors, uniforms)
pub mod resources;

/// Render passes, pipelines, shaders and command recording
pub mod rendering;

/// Swapchain-dependent targets and frame synchronisation
pub mod state;

/// Main Vulkan renderer implementation
pub mod renderer;

pub use error::{VulkanError, VulkanResult};
pub use renderer::{FrameOutcome, VulkanRenderer};

pub use initialization::VulkanContext;
pub use resources::{GpuMeshBuffers, Texture, TextureId};
