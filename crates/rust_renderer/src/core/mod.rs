//! Core engine types: startup configuration

pub mod config;

pub use config::{
    DynamicOffsetMode, RendererConfig, ShaderConfig, WindowConfig, MAX_FRAMES_IN_FLIGHT, MAX_OBJECTS,
    SHADOWMAP_DIM,
};
