//! Vulkan backend error type

use crate::assets::AssetError;
use crate::scene::SceneError;
use ash::vk;
use std::path::PathBuf;
use thiserror::Error;

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Startup could not complete
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No physical device satisfies the suitability checks
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// No memory type matches the resource requirements
    #[error("No memory type matches filter {type_filter:#b} with {properties:?}")]
    NoCompatibleMemoryType {
        /// Allowed memory type bits
        type_filter: u32,
        /// Requested property flags
        properties: vk::MemoryPropertyFlags,
    },

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// A fixed-size pool or block is full
    #[error("{what} capacity of {limit} exceeded")]
    CapacityExceeded {
        /// Which resource ran out
        what: &'static str,
        /// Configured limit
        limit: usize,
    },

    /// Presentation failed with something other than a stale swapchain
    #[error("Presentation failed: {0:?}")]
    Presentation(vk::Result),

    /// SPIR-V file could not be read or parsed
    #[error("Shader {path:?}: {source}")]
    Shader {
        /// Shader file
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Asset loading failed
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// The windowing collaborator could not provide a surface
    #[error("Surface error: {0}")]
    Surface(String),
}

impl From<vk::Result> for VulkanError {
    fn from(result: vk::Result) -> Self {
        Self::Api(result)
    }
}

impl From<SceneError> for VulkanError {
    fn from(error: SceneError) -> Self {
        match error {
            SceneError::CapacityExceeded { capacity, .. } => Self::CapacityExceeded {
                what: "drawable",
                limit: capacity,
            },
        }
    }
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;
