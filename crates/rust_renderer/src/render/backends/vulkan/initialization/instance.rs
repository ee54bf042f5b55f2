//! Vulkan instance and debug messenger

use crate::render::api::RenderSurface;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry, Instance};
use std::ffi::{c_char, CStr, CString};

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Debug-utils messenger, present only when validation is enabled
pub struct DebugMessenger {
    loader: DebugUtils,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    fn new(entry: &Entry, instance: &Instance) -> VulkanResult<Self> {
        let loader = DebugUtils::new(entry, instance);
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None)? };
        Ok(Self { loader, messenger })
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug: Option<DebugMessenger>,
}

impl VulkanInstance {
    /// Create an instance with the window's required extensions
    ///
    /// With `enable_validation` the Khronos validation layer and a debug
    /// messenger routing into `log` are added. Missing validation support
    /// downgrades to a warning rather than failing startup.
    pub fn new(surface: &dyn RenderSurface, app_name: &str, app_version: (u32, u32, u32), enable_validation: bool) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to load Vulkan: {e}")))?;

        let app_name_cstr = to_cstring(app_name)?;
        let engine_name_cstr = to_cstring("RustRenderer")?;
        let (major, minor, patch) = app_version;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let validation = enable_validation && Self::validation_layer_available(&entry)?;
        if enable_validation && !validation {
            log::warn!("{} requested but not installed; continuing without it", VALIDATION_LAYER);
        }

        let mut extension_names = surface
            .required_instance_extensions()?
            .iter()
            .map(|name| to_cstring(name))
            .collect::<VulkanResult<Vec<_>>>()?;
        if validation {
            extension_names.push(DebugUtils::name().to_owned());
        }
        let extension_ptrs: Vec<*const c_char> = extension_names.iter().map(|ext| ext.as_ptr()).collect();

        let layer_names = if validation { vec![to_cstring(VALIDATION_LAYER)?] } else { Vec::new() };
        let layer_ptrs: Vec<*const c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { entry.create_instance(&create_info, None)? };

        let debug = if validation {
            match DebugMessenger::new(&entry, &instance) {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        log::info!(
            "Created Vulkan instance for '{}' with {} extensions (validation {})",
            app_name,
            extension_names.len(),
            if validation { "on" } else { "off" }
        );

        Ok(Self { entry, instance, debug })
    }

    /// Whether the debug messenger is active
    pub fn has_debug_messenger(&self) -> bool {
        self.debug.is_some()
    }

    fn validation_layer_available(entry: &Entry) -> VulkanResult<bool> {
        let layers = entry.enumerate_instance_layer_properties()?;
        Ok(layers.iter().any(|layer| {
            let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
            name.to_bytes() == VALIDATION_LAYER.as_bytes()
        }))
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        self.debug.take();
        unsafe {
            self.instance.destroy_instance(None);
        }
        log::debug!("Vulkan instance destroyed");
    }
}

fn to_cstring(value: &str) -> VulkanResult<CString> {
    CString::new(value).map_err(|_| VulkanError::InitializationFailed(format!("interior NUL in {value:?}")))
}

/// Routes validation messages into `log` by severity
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
    } else if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::trace!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}
