//! Rendering: collaborator traits, primitives, window and the Vulkan backend

pub mod api;
pub mod backends;
pub mod primitives;
pub mod window;

pub use window::{Window, WindowError};
