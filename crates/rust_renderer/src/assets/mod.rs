//! Asset-side collaborators
//!
//! The renderer never parses model or image formats itself. It consumes
//! already-decoded data: RGBA8 pixel buffers for textures and vertex/index
//! lists grouped by material for models.

pub mod image_loader;
pub mod model;

pub use image_loader::{ImageCrateDecoder, TextureData, TextureDecoder};
pub use model::{MeshData, ModelData};

use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File was read but could not be decoded
    #[error("Failed to decode {path}: {reason}")]
    Decode {
        /// Source file
        path: String,
        /// Decoder message
        reason: String,
    },

    /// Mesh with no vertices or indices
    #[error("Mesh has no geometry")]
    EmptyMesh,

    /// Pixel buffer size does not match its dimensions
    #[error("Texture data is {actual} bytes, expected {expected}")]
    TextureSize {
        /// Bytes implied by width * height * 4
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },
}
