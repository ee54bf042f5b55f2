//! Instance, surface and device bootstrap

pub mod context;
pub mod device;
pub mod instance;

pub use context::{SurfaceHandle, VulkanContext};
pub use device::{LogicalDevice, PhysicalDeviceInfo, QueueFamilyIndices};
pub use instance::VulkanInstance;
