//! GPU resource wrappers: memory, buffers, images, descriptors, uniforms

pub mod buffer;
pub mod descriptor_set;
pub mod frame_uniforms;
pub mod image;
pub mod memory;
pub mod mesh;
pub mod texture;
pub mod uniform;

pub use buffer::Buffer;
pub use descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter};
pub use frame_uniforms::FrameUniforms;
pub use image::{Image, ImageDesc, ImageTarget, ImageView};
pub use mesh::GpuMeshBuffers;
pub use texture::{Sampler, Texture, TextureId};
pub use uniform::{aligned_stride, CameraBlock, DynamicUniformBlock, LightBlock, ModelBlock, ViewProjectionBlock};
