//! Render passes, pipelines, command recording and draw preparation

pub mod commands;
pub mod draw_list;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod shadow;
pub mod vertex_layout;

pub use commands::{ActiveRenderPass, CommandBuffers, CommandPool, CommandRecorder};
pub use draw_list::{scene_bindings, DrawEntry, DrawList, SetBinding};
pub use pipeline::{GraphicsPipeline, PipelineBuilder};
pub use render_pass::{Framebuffer, RenderPass};
pub use shader::ShaderModule;
pub use shadow::ShadowTarget;
pub use vertex_layout::VulkanVertexLayout;
