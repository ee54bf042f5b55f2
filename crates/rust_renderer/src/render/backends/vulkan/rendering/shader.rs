//! SPIR-V shader modules

use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};
use std::ffi::CStr;
use std::fs::File;
use std::path::Path;

/// Entry point shared by every shader
pub const ENTRY_POINT: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// Shader module wrapper with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a module from SPIR-V words
    pub fn from_words(device: Device, words: &[u32]) -> VulkanResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(words);
        let module = unsafe { device.create_shader_module(&create_info, None)? };
        Ok(Self { device, module })
    }

    /// Load a compiled SPIR-V file
    pub fn from_file(device: Device, path: &Path) -> VulkanResult<Self> {
        let shader_error = |source| VulkanError::Shader {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(shader_error)?;
        let words = ash::util::read_spv(&mut file).map_err(shader_error)?;
        log::debug!("Loaded shader {} ({} words)", path.display(), words.len());
        Self::from_words(device, &words)
    }

    /// Get shader module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Stage description using the `main` entry point
    pub fn stage_info(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(ENTRY_POINT)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
