//! Texture decoding
//!
//! [`TextureDecoder`] turns a file path into RGBA8 pixels. The default
//! implementation uses the `image` crate.

use super::AssetError;
use std::path::Path;

/// Decoded RGBA8 pixels ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Tightly packed RGBA8 rows
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Wrap an existing pixel buffer, checking its size
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, AssetError> {
        let data = Self { width, height, pixels };
        data.validate()?;
        Ok(data)
    }

    /// Create a solid colour texture
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Result<Self, AssetError> {
        let pixel_count = width as usize * height as usize;
        Self::new(
            width,
            height,
            color.iter().copied().cycle().take(pixel_count * 4).collect(),
        )
    }

    /// Check for a non-zero extent and exactly `width * height * 4` bytes
    pub fn validate(&self) -> Result<(), AssetError> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.pixels.len() != expected || expected == 0 {
            return Err(AssetError::TextureSize {
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }

    /// Size of the pixel data in bytes
    pub fn size_bytes(&self) -> usize {
        self.pixels.len()
    }

    /// Number of mip levels for a full chain down to 1x1
    pub fn mip_levels(&self) -> u32 {
        self.width.max(self.height).max(1).ilog2() + 1
    }
}

/// Supplies decoded pixels for a texture path
pub trait TextureDecoder {
    /// Decode the file at `path` into RGBA8
    fn decode(&self, path: &Path) -> Result<TextureData, AssetError>;
}

/// Decoder backed by the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl TextureDecoder for ImageCrateDecoder {
    fn decode(&self, path: &Path) -> Result<TextureData, AssetError> {
        log::debug!("Decoding texture {:?}", path);

        let img = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(io) => AssetError::Io(io),
            other => AssetError::Decode {
                path: path.display().to_string(),
                reason: other.to_string(),
            },
        })?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::info!("Loaded texture {}x{} from {:?}", width, height, path);

        TextureData::new(width, height, rgba.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_color_fills_every_pixel() {
        let texture = TextureData::solid_color(4, 2, [255, 0, 0, 255]).expect("valid size");
        assert_eq!(texture.size_bytes(), 4 * 2 * 4);
        assert!(texture.pixels.chunks(4).all(|px| px == [255, 0, 0, 255]));
    }

    #[test]
    fn mip_levels_follow_largest_edge() {
        let levels = |w, h| TextureData::solid_color(w, h, [0; 4]).expect("valid size").mip_levels();
        assert_eq!(levels(1, 1), 1);
        assert_eq!(levels(256, 256), 9);
        assert_eq!(levels(300, 20), 9);
    }

    #[test]
    fn solid_color_rejects_zero_extent() {
        assert!(matches!(
            TextureData::solid_color(0, 4, [0; 4]),
            Err(AssetError::TextureSize { expected: 0, actual: 0 })
        ));
    }

    #[test]
    fn validate_catches_edited_fields() {
        let mut texture = TextureData::solid_color(2, 2, [9; 4]).expect("valid size");
        assert!(texture.validate().is_ok());

        texture.pixels.pop();
        assert!(matches!(
            texture.validate(),
            Err(AssetError::TextureSize { expected: 16, actual: 15 })
        ));

        texture.pixels = vec![0; 16];
        texture.width = 0;
        assert!(texture.validate().is_err());
    }

    #[test]
    fn new_rejects_mismatched_buffers() {
        assert!(TextureData::new(2, 2, vec![0; 15]).is_err());
        assert!(TextureData::new(0, 0, Vec::new()).is_err());
        assert!(TextureData::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = ImageCrateDecoder.decode(Path::new("definitely/not/here.png"));
        assert!(matches!(result, Err(AssetError::Io(_))));
    }
}
