//! Device context: instance, surface, physical and logical device
//!
//! Created once at startup and immutable until shutdown. Fields drop in
//! declaration order, so the surface goes first, then the device, then the
//! debug messenger and instance.

use super::device::{LogicalDevice, PhysicalDeviceInfo};
use super::instance::VulkanInstance;
use crate::core::config::RendererConfig;
use crate::render::api::RenderSurface;
use crate::render::backends::vulkan::VulkanResult;
use ash::extensions::khr::Surface;
use ash::{vk, Device, Instance};

/// Presentable surface with its extension loader
pub struct SurfaceHandle {
    /// Surface extension loader
    pub loader: Surface,
    /// Surface handle
    pub handle: vk::SurfaceKHR,
}

impl SurfaceHandle {
    /// Surface capabilities for a physical device
    pub fn capabilities(&self, physical_device: vk::PhysicalDevice) -> VulkanResult<vk::SurfaceCapabilitiesKHR> {
        Ok(unsafe { self.loader.get_physical_device_surface_capabilities(physical_device, self.handle)? })
    }

    /// Supported surface formats
    pub fn formats(&self, physical_device: vk::PhysicalDevice) -> VulkanResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(unsafe { self.loader.get_physical_device_surface_formats(physical_device, self.handle)? })
    }

    /// Supported present modes
    pub fn present_modes(&self, physical_device: vk::PhysicalDevice) -> VulkanResult<Vec<vk::PresentModeKHR>> {
        Ok(unsafe { self.loader.get_physical_device_surface_present_modes(physical_device, self.handle)? })
    }
}

impl Drop for SurfaceHandle {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
    }
}

/// Main Vulkan context that owns all core Vulkan resources
pub struct VulkanContext {
    /// Window surface
    pub surface: SurfaceHandle,
    /// Selected physical device
    pub physical_device: PhysicalDeviceInfo,
    /// Logical device and queues
    pub device: LogicalDevice,
    /// Instance and debug messenger
    pub instance: VulkanInstance,
}

impl VulkanContext {
    /// Bootstrap Vulkan for `window`
    pub fn new(window: &mut dyn RenderSurface, config: &RendererConfig) -> VulkanResult<Self> {
        let instance = VulkanInstance::new(
            window,
            &config.application_name,
            config.application_version,
            config.validation_enabled(),
        )?;

        let surface = SurfaceHandle {
            loader: Surface::new(&instance.entry, &instance.instance),
            handle: window.create_surface(instance.instance.handle())?,
        };

        let physical_device = PhysicalDeviceInfo::select_suitable_device(&instance.instance, surface.handle, &surface.loader)?;
        let device = LogicalDevice::new(&instance.instance, &physical_device)?;

        Ok(Self {
            surface,
            physical_device,
            device,
            instance,
        })
    }

    /// Vulkan instance
    pub fn instance(&self) -> &Instance {
        &self.instance.instance
    }

    /// Logical device function table
    pub fn raw_device(&self) -> &Device {
        &self.device.device
    }

    /// Graphics queue
    pub fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// Present queue
    pub fn present_queue(&self) -> vk::Queue {
        self.device.present_queue
    }

    /// Memory properties of the selected device
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.physical_device.memory_properties
    }

    /// Block until the device is idle
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.device.wait_idle()
    }
}
