//! Physical device selection and logical device creation
//!
//! Selection works in two steps. Each physical device is first captured
//! into a [`DeviceCandidate`] snapshot (queue families, extensions, surface
//! support, features); the suitability predicates then run on that snapshot
//! without touching Vulkan, so they can be tested on fabricated devices.

use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Instance};
use std::ffi::CStr;

/// Queue family capabilities relevant to selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilySupport {
    /// Capability flags
    pub flags: vk::QueueFlags,
    /// Number of queues in the family
    pub queue_count: u32,
    /// Whether the family can present to the surface
    pub present: bool,
}

/// Graphics and present family indices (may coincide)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// Family used for drawing and transfers
    pub graphics: u32,
    /// Family used for presentation
    pub present: u32,
}

impl QueueFamilyIndices {
    /// Whether one queue serves both roles
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Distinct family indices, graphics first
    pub fn unique(&self) -> Vec<u32> {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Why a device was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unsuitable {
    /// No family with GRAPHICS and at least one queue
    NoGraphicsQueue,
    /// No family that can present to the surface
    NoPresentQueue,
    /// Required device extensions are absent
    MissingExtensions(Vec<String>),
    /// The surface reports no formats or no present modes
    InadequateSwapchain,
    /// `samplerAnisotropy` is not supported
    NoAnisotropy,
}

/// Snapshot of everything selection needs to know about one device
#[derive(Debug, Clone, Default)]
pub struct DeviceCandidate {
    /// Device name for logging
    pub name: String,
    /// Queue families in index order
    pub queue_families: Vec<QueueFamilySupport>,
    /// Supported device extension names
    pub extensions: Vec<String>,
    /// Number of surface formats
    pub surface_format_count: usize,
    /// Number of present modes
    pub present_mode_count: usize,
    /// Anisotropic filtering support
    pub sampler_anisotropy: bool,
}

/// Device extensions the renderer cannot run without
pub fn required_device_extensions() -> [&'static CStr; 1] {
    [SwapchainLoader::name()]
}

impl DeviceCandidate {
    /// First graphics family and first present family with queues
    pub fn find_queue_families(&self) -> Result<QueueFamilyIndices, Unsuitable> {
        let usable = |f: &&QueueFamilySupport| f.queue_count > 0;
        let graphics = self
            .queue_families
            .iter()
            .enumerate()
            .find(|(_, f)| usable(f) && f.flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|(i, _)| i as u32)
            .ok_or(Unsuitable::NoGraphicsQueue)?;
        let present = self
            .queue_families
            .iter()
            .enumerate()
            .find(|(_, f)| usable(f) && f.present)
            .map(|(i, _)| i as u32)
            .ok_or(Unsuitable::NoPresentQueue)?;
        Ok(QueueFamilyIndices { graphics, present })
    }

    /// Required extensions the device does not list
    pub fn missing_extensions(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.extensions.iter().any(|ext| ext == *name))
            .map(|name| (*name).to_string())
            .collect()
    }

    /// Run every predicate, returning the queue families on success
    pub fn check(&self, required_extensions: &[&str]) -> Result<QueueFamilyIndices, Unsuitable> {
        let families = self.find_queue_families()?;
        let missing = self.missing_extensions(required_extensions);
        if !missing.is_empty() {
            return Err(Unsuitable::MissingExtensions(missing));
        }
        if self.surface_format_count == 0 || self.present_mode_count == 0 {
            return Err(Unsuitable::InadequateSwapchain);
        }
        if !self.sampler_anisotropy {
            return Err(Unsuitable::NoAnisotropy);
        }
        Ok(families)
    }
}

/// Index and queue families of the first suitable candidate
pub fn select_first_suitable(candidates: &[DeviceCandidate], required_extensions: &[&str]) -> VulkanResult<(usize, QueueFamilyIndices)> {
    for (index, candidate) in candidates.iter().enumerate() {
        match candidate.check(required_extensions) {
            Ok(families) => return Ok((index, families)),
            Err(reason) => log::debug!("Skipping GPU '{}': {:?}", candidate.name, reason),
        }
    }
    Err(VulkanError::NoSuitableDevice)
}

/// Highest sample count supported by both colour and depth framebuffers
pub fn max_usable_sample_count(limits: &vk::PhysicalDeviceLimits) -> vk::SampleCountFlags {
    let counts = limits.framebuffer_color_sample_counts & limits.framebuffer_depth_sample_counts;
    [
        vk::SampleCountFlags::TYPE_64,
        vk::SampleCountFlags::TYPE_32,
        vk::SampleCountFlags::TYPE_16,
        vk::SampleCountFlags::TYPE_8,
        vk::SampleCountFlags::TYPE_4,
        vk::SampleCountFlags::TYPE_2,
    ]
    .into_iter()
    .find(|&flag| counts.contains(flag))
    .unwrap_or(vk::SampleCountFlags::TYPE_1)
}

/// Clamp a requested sample count to the device maximum
///
/// Non power-of-two requests round down to the next power of two.
pub fn clamp_sample_count(requested: u32, max_usable: vk::SampleCountFlags) -> vk::SampleCountFlags {
    let requested = if requested == 0 { 1 } else { 1 << requested.ilog2() };
    let clamped = requested.min(max_usable.as_raw()).max(1);
    vk::SampleCountFlags::from_raw(clamped)
}

/// Physical device selection and capabilities
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported device features
    pub features: vk::PhysicalDeviceFeatures,
    /// Memory heaps and types
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Graphics and present families
    pub queue_families: QueueFamilyIndices,
    /// Required alignment of dynamic uniform offsets
    pub min_uniform_buffer_offset_alignment: vk::DeviceSize,
    /// Maximum sampler anisotropy
    pub max_sampler_anisotropy: f32,
    /// Highest MSAA count usable for colour + depth
    pub max_usable_samples: vk::SampleCountFlags,
}

impl PhysicalDeviceInfo {
    /// Select the first device that can render and present to `surface`
    pub fn select_suitable_device(instance: &Instance, surface: vk::SurfaceKHR, surface_loader: &Surface) -> VulkanResult<Self> {
        let devices = unsafe { instance.enumerate_physical_devices()? };
        let candidates = devices
            .iter()
            .map(|&device| Self::snapshot(instance, device, surface, surface_loader))
            .collect::<VulkanResult<Vec<_>>>()?;

        let required: Vec<&str> = required_device_extensions()
            .iter()
            .filter_map(|name| name.to_str().ok())
            .collect();
        let (index, queue_families) = select_first_suitable(&candidates, &required)?;
        let device = devices[index];

        let properties = unsafe { instance.get_physical_device_properties(device) };
        let features = unsafe { instance.get_physical_device_features(device) };
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };

        let info = Self {
            device,
            properties,
            features,
            memory_properties,
            queue_families,
            min_uniform_buffer_offset_alignment: properties.limits.min_uniform_buffer_offset_alignment,
            max_sampler_anisotropy: properties.limits.max_sampler_anisotropy,
            max_usable_samples: max_usable_sample_count(&properties.limits),
        };

        log::info!(
            "Selected GPU: {} (graphics family {}, present family {}, max samples {:?}, uniform alignment {})",
            candidates[index].name,
            queue_families.graphics,
            queue_families.present,
            info.max_usable_samples,
            info.min_uniform_buffer_offset_alignment
        );

        Ok(info)
    }

    /// Whether per-sample shading can be enabled
    pub fn supports_sample_shading(&self) -> bool {
        self.features.sample_rate_shading == vk::TRUE
    }

    fn snapshot(instance: &Instance, device: vk::PhysicalDevice, surface: vk::SurfaceKHR, surface_loader: &Surface) -> VulkanResult<DeviceCandidate> {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let features = unsafe { instance.get_physical_device_features(device) };
        let families = unsafe { instance.get_physical_device_queue_family_properties(device) };

        let queue_families = families
            .iter()
            .enumerate()
            .map(|(index, family)| -> VulkanResult<QueueFamilySupport> {
                let present = unsafe { surface_loader.get_physical_device_surface_support(device, index as u32, surface)? };
                Ok(QueueFamilySupport {
                    flags: family.queue_flags,
                    queue_count: family.queue_count,
                    present,
                })
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let extensions = unsafe { instance.enumerate_device_extension_properties(device)? }
            .iter()
            .map(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }.to_string_lossy().into_owned())
            .collect();

        let surface_format_count = unsafe { surface_loader.get_physical_device_surface_formats(device, surface)? }.len();
        let present_mode_count = unsafe { surface_loader.get_physical_device_surface_present_modes(device, surface)? }.len();

        Ok(DeviceCandidate {
            name: unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy().into_owned(),
            queue_families,
            extensions,
            surface_format_count,
            present_mode_count,
            sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
        })
    }
}

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
    /// Queue family indices
    pub queue_families: QueueFamilyIndices,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
}

impl LogicalDevice {
    /// Create the device with one queue per distinct family
    pub fn new(instance: &Instance, physical_device: &PhysicalDeviceInfo) -> VulkanResult<Self> {
        let families = physical_device.queue_families;
        let priorities = [1.0_f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let required_extensions = required_device_extensions().map(CStr::as_ptr);

        let device_features = vk::PhysicalDeviceFeatures::builder()
            .sampler_anisotropy(true)
            .sample_rate_shading(physical_device.supports_sample_shading())
            .build();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&required_extensions)
            .enabled_features(&device_features);

        let device = unsafe { instance.create_device(physical_device.device, &create_info, None)? };

        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };
        let swapchain_loader = SwapchainLoader::new(instance, &device);

        log::debug!("Created logical device with {} queue(s)", queue_infos.len());

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            queue_families: families,
            swapchain_loader,
        })
    }

    /// Block until all queued work has finished
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
        log::debug!("Logical device destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SWAPCHAIN: &str = "VK_KHR_swapchain";

    fn family(flags: vk::QueueFlags, queue_count: u32, present: bool) -> QueueFamilySupport {
        QueueFamilySupport { flags, queue_count, present }
    }

    fn good_device(name: &str) -> DeviceCandidate {
        DeviceCandidate {
            name: name.to_string(),
            queue_families: vec![family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, 1, true)],
            extensions: vec![SWAPCHAIN.to_string()],
            surface_format_count: 2,
            present_mode_count: 1,
            sampler_anisotropy: true,
        }
    }

    #[test]
    fn shared_family_is_one_queue() {
        let families = good_device("a").check(&[SWAPCHAIN]).expect("suitable");
        assert!(families.is_shared());
        assert_eq!(families.unique(), vec![0]);
    }

    #[test]
    fn separate_present_family_is_found() {
        let mut device = good_device("split");
        device.queue_families = vec![
            family(vk::QueueFlags::COMPUTE, 2, true),
            family(vk::QueueFlags::GRAPHICS, 1, false),
        ];
        let families = device.check(&[SWAPCHAIN]).expect("suitable");
        assert_eq!(families, QueueFamilyIndices { graphics: 1, present: 0 });
        assert_eq!(families.unique(), vec![1, 0]);
    }

    #[test]
    fn each_predicate_rejects() {
        let mut no_graphics = good_device("g");
        no_graphics.queue_families = vec![family(vk::QueueFlags::COMPUTE, 1, true)];
        assert_eq!(no_graphics.check(&[SWAPCHAIN]), Err(Unsuitable::NoGraphicsQueue));

        let mut empty_family = good_device("q");
        empty_family.queue_families = vec![family(vk::QueueFlags::GRAPHICS, 0, true)];
        assert_eq!(empty_family.check(&[SWAPCHAIN]), Err(Unsuitable::NoGraphicsQueue));

        let mut no_present = good_device("p");
        no_present.queue_families = vec![family(vk::QueueFlags::GRAPHICS, 1, false)];
        assert_eq!(no_present.check(&[SWAPCHAIN]), Err(Unsuitable::NoPresentQueue));

        let mut no_ext = good_device("e");
        no_ext.extensions.clear();
        assert_eq!(no_ext.check(&[SWAPCHAIN]), Err(Unsuitable::MissingExtensions(vec![SWAPCHAIN.to_string()])));

        let mut no_modes = good_device("m");
        no_modes.present_mode_count = 0;
        assert_eq!(no_modes.check(&[SWAPCHAIN]), Err(Unsuitable::InadequateSwapchain));

        let mut no_aniso = good_device("a");
        no_aniso.sampler_anisotropy = false;
        assert_eq!(no_aniso.check(&[SWAPCHAIN]), Err(Unsuitable::NoAnisotropy));
    }

    #[test]
    fn selection_returns_first_suitable() {
        let mut bad = good_device("bad");
        bad.sampler_anisotropy = false;
        let candidates = vec![bad, good_device("first"), good_device("second")];
        let (index, _) = select_first_suitable(&candidates, &[SWAPCHAIN]).expect("found");
        assert_eq!(index, 1);
        assert!(candidates[index].check(&[SWAPCHAIN]).is_ok());
    }

    #[test]
    fn selection_fails_without_candidates() {
        let mut bad = good_device("bad");
        bad.extensions.clear();
        assert!(matches!(select_first_suitable(&[bad], &[SWAPCHAIN]), Err(VulkanError::NoSuitableDevice)));
        assert!(matches!(select_first_suitable(&[], &[SWAPCHAIN]), Err(VulkanError::NoSuitableDevice)));
    }

    #[test]
    fn max_samples_uses_common_counts() {
        let limits = vk::PhysicalDeviceLimits {
            framebuffer_color_sample_counts: vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_4 | vk::SampleCountFlags::TYPE_8,
            framebuffer_depth_sample_counts: vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_4,
            ..Default::default()
        };
        assert_eq!(max_usable_sample_count(&limits), vk::SampleCountFlags::TYPE_4);
        assert_eq!(max_usable_sample_count(&vk::PhysicalDeviceLimits::default()), vk::SampleCountFlags::TYPE_1);
    }

    #[test]
    fn requested_samples_are_clamped() {
        let max = vk::SampleCountFlags::TYPE_8;
        assert_eq!(clamp_sample_count(4, max), vk::SampleCountFlags::TYPE_4);
        assert_eq!(clamp_sample_count(16, max), vk::SampleCountFlags::TYPE_8);
        assert_eq!(clamp_sample_count(6, max), vk::SampleCountFlags::TYPE_4);
        assert_eq!(clamp_sample_count(0, max), vk::SampleCountFlags::TYPE_1);
        assert_eq!(clamp_sample_count(4, vk::SampleCountFlags::TYPE_1), vk::SampleCountFlags::TYPE_1);
    }
}
