//! # Renderer Configuration
//!
//! Fully-resolved startup parameters for the renderer: window size, shader
//! locations, multisampling, frame pacing and the per-object uniform capacity.
//! Everything is serde-friendly so a `renderer.toml` or `renderer.ron` can
//! override the defaults through [`Config`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use crate::config::{Config, ConfigError};

/// Default number of frame slots cycled by the frame loop
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Default capacity of the dynamic per-object uniform block and texture pool
pub const MAX_OBJECTS: usize = 512;

/// Default edge length of the square shadow map
pub const SHADOWMAP_DIM: u32 = 2048;

/// How per-draw dynamic uniform offsets are assigned
///
/// Model meshes are uploaded first, standalone meshes after them. `Shared`
/// binds every draw at the slot it was uploaded to. `PerCollection` restarts
/// the bound offset for each collection (model index for model meshes, list
/// index for standalone meshes), which collides with the upload order as soon
/// as both collections are non-empty. It exists to reproduce older output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicOffsetMode {
    /// One running index across models and meshes
    #[default]
    Shared,
    /// Legacy restart per collection
    PerCollection,
}

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Shadow Demo".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// # Shader Configuration
///
/// SPIR-V file names for the scene and shadow pipelines plus the directory
/// they live in. Compilation happens outside the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Directory containing the SPIR-V files
    pub directory: PathBuf,
    /// Scene pipeline vertex shader
    pub scene_vertex: String,
    /// Scene pipeline fragment shader
    pub scene_fragment: String,
    /// Shadow pipeline vertex shader
    pub shadow_vertex: String,
}

impl ShaderConfig {
    /// Locate the shader directory by probing common locations
    ///
    /// Useful when the demo runs from the workspace root or from its own
    /// crate directory.
    pub fn with_path_resolution() -> Self {
        let mut config = Self {
            directory: PathBuf::from("shaders"),
            scene_vertex: "shader.vert.spv".to_string(),
            scene_fragment: "shader.frag.spv".to_string(),
            shadow_vertex: "offscreen.vert.spv".to_string(),
        };

        let candidates = ["target/shaders", "shaders", "resources/shaders", "../resources/shaders"];
        if let Some(found) = candidates
            .iter()
            .map(PathBuf::from)
            .find(|dir| dir.join(&config.scene_vertex).exists())
        {
            config.directory = found;
        }
        config
    }

    /// Full path of the scene vertex shader
    pub fn scene_vertex_path(&self) -> PathBuf {
        self.directory.join(&self.scene_vertex)
    }

    /// Full path of the scene fragment shader
    pub fn scene_fragment_path(&self) -> PathBuf {
        self.directory.join(&self.scene_fragment)
    }

    /// Full path of the shadow vertex shader
    pub fn shadow_vertex_path(&self) -> PathBuf {
        self.directory.join(&self.shadow_vertex)
    }

    /// Check that every shader file exists
    pub fn validate_files(&self) -> Result<(), ConfigError> {
        for path in [self.scene_vertex_path(), self.scene_fragment_path(), self.shadow_vertex_path()] {
            if !Path::new(&path).exists() {
                return Err(ConfigError::Invalid(format!("shader not found: {}", path.display())));
            }
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution()
    }
}

/// # Renderer Configuration
///
/// Startup parameters consumed by `VulkanRenderer::new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Number of frame slots
    pub max_frames_in_flight: usize,
    /// Requested MSAA sample count, clamped to what the device supports
    pub sample_count: u32,
    /// Capacity of the dynamic uniform block and texture pool
    pub max_objects: usize,
    /// Shadow map edge length in texels
    pub shadow_map_dim: u32,
    /// Constant depth bias applied in the shadow pass
    pub depth_bias_constant: f32,
    /// Slope-scaled depth bias applied in the shadow pass
    pub depth_bias_slope: f32,
    /// Dynamic offset assignment
    pub dynamic_offset_mode: DynamicOffsetMode,
    /// Scene pass clear colour
    pub clear_color: [f32; 4],
    /// Whether to enable Vulkan validation layers (None picks by build type)
    pub enable_validation: Option<bool>,
    /// Window parameters
    pub window: WindowConfig,
    /// Shader locations
    pub shaders: ShaderConfig,
}

impl RendererConfig {
    /// Create a configuration with defaults and the given application name
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            application_version: (1, 0, 0),
            max_frames_in_flight: MAX_FRAMES_IN_FLIGHT,
            sample_count: 4,
            max_objects: MAX_OBJECTS,
            shadow_map_dim: SHADOWMAP_DIM,
            depth_bias_constant: 1.25,
            depth_bias_slope: 1.75,
            dynamic_offset_mode: DynamicOffsetMode::default(),
            clear_color: [0.1, 0.1, 0.1, 1.0],
            enable_validation: None,
            window: WindowConfig::default(),
            shaders: ShaderConfig::default(),
        }
    }

    /// Set window size
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Set custom shader configuration
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Set maximum frames in flight
    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight = frames;
        self
    }

    /// Set the requested MSAA sample count
    pub fn with_sample_count(mut self, samples: u32) -> Self {
        self.sample_count = samples;
        self
    }

    /// Set the per-object capacity
    pub fn with_max_objects(mut self, max_objects: usize) -> Self {
        self.max_objects = max_objects;
        self
    }

    /// Set dynamic offset assignment
    pub fn with_dynamic_offset_mode(mut self, mode: DynamicOffsetMode) -> Self {
        self.dynamic_offset_mode = mode;
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Whether validation should be enabled for this build
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("application name cannot be empty".to_string()));
        }
        if self.max_frames_in_flight == 0 {
            return Err(ConfigError::Invalid("max_frames_in_flight must be at least 1".to_string()));
        }
        if self.max_objects == 0 {
            return Err(ConfigError::Invalid("max_objects must be at least 1".to_string()));
        }
        if self.shadow_map_dim == 0 {
            return Err(ConfigError::Invalid("shadow_map_dim must be non-zero".to_string()));
        }
        if !self.sample_count.is_power_of_two() || self.sample_count > 64 {
            return Err(ConfigError::Invalid(format!(
                "sample_count must be a power of two up to 64, got {}",
                self.sample_count
            )));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid("window size must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Rust Renderer Application")
    }
}

impl Config for RendererConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_frames_in_flight, MAX_FRAMES_IN_FLIGHT);
        assert_eq!(config.dynamic_offset_mode, DynamicOffsetMode::Shared);
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(RendererConfig::default().with_max_frames_in_flight(0).validate().is_err());
        assert!(RendererConfig::default().with_max_objects(0).validate().is_err());
        assert!(RendererConfig::default().with_sample_count(3).validate().is_err());
        assert!(RendererConfig::default().with_sample_count(128).validate().is_err());
        assert!(RendererConfig::default().with_window_size(0, 600).validate().is_err());
        assert!(RendererConfig::default().with_sample_count(1).validate().is_ok());
    }

    #[test]
    fn toml_round_trip_keeps_values() {
        let config = RendererConfig::new("toml test")
            .with_sample_count(8)
            .with_dynamic_offset_mode(DynamicOffsetMode::PerCollection);
        let text = toml::to_string_pretty(&config).expect("serialize");
        let parsed: RendererConfig = toml::from_str(&text).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let parsed: RendererConfig = toml::from_str(
            "sample_count = 2\ndynamic_offset_mode = \"per_collection\"\n[window]\nwidth = 1024\n",
        )
        .expect("parse");
        assert_eq!(parsed.sample_count, 2);
        assert_eq!(parsed.window.width, 1024);
        assert_eq!(parsed.window.height, 600);
        assert_eq!(parsed.dynamic_offset_mode, DynamicOffsetMode::PerCollection);
        assert_eq!(parsed.max_objects, MAX_OBJECTS);
    }

    #[test]
    fn ron_file_round_trip() {
        let path = std::env::temp_dir().join(format!("rust_renderer_cfg_{}.ron", std::process::id()));
        let config = RendererConfig::new("ron test").with_max_objects(64);
        config.save_to_file(&path).expect("save");
        let loaded = RendererConfig::load_from_file(&path).expect("load");
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let result = RendererConfig::default().save_to_file("renderer.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn shader_paths_join_directory() {
        let shaders = ShaderConfig {
            directory: PathBuf::from("spv"),
            scene_vertex: "a.spv".to_string(),
            scene_fragment: "b.spv".to_string(),
            shadow_vertex: "c.spv".to_string(),
        };
        assert_eq!(shaders.scene_vertex_path(), PathBuf::from("spv").join("a.spv"));
        assert_eq!(shaders.shadow_vertex_path(), PathBuf::from("spv").join("c.spv"));
    }
}
