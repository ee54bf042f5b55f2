//! # Vulkan Renderer
//!
//! Owns every GPU object and exposes the application-facing operations:
//! asset upload, scene edits, lighting and `draw`. The per-frame protocol
//! lives in [`frame_loop`]; this module supplies the Vulkan side of it.
//!
//! ## Lifetime
//!
//! Startup creates, in order: context, command pool, descriptor layouts and
//! the sampler pool, samplers, the shadow map and offscreen pipeline, the
//! presentation targets, per-image uniforms and frame sync. Every object has
//! an RAII owner, so a failure part way through releases what was built.
//!
//! Teardown waits for the device and then releases in the reverse
//! direction, following the field order of the internal state.

pub mod frame_loop;
pub mod recorder;

pub use frame_loop::{AcquireOutcome, FrameBackend, FrameLoop, FrameOutcome, PresentOutcome, SlotState};

use crate::assets::{ImageCrateDecoder, MeshData, ModelData, TextureData, TextureDecoder};
use crate::core::config::{DynamicOffsetMode, RendererConfig};
use crate::foundation::math::{Mat4, Vec3};
use crate::render::api::{FrameInput, OverlayRenderer, OverlayState, OverlayTargets, RenderSurface};
use crate::render::backends::vulkan::initialization::device::clamp_sample_count;
use crate::render::backends::vulkan::initialization::VulkanContext;
use crate::render::backends::vulkan::rendering::{
    CommandPool, DrawList, GraphicsPipeline, PipelineBuilder, ShaderModule, ShadowTarget,
};
use crate::render::backends::vulkan::resources::descriptor_set::{
    sampler_layout_builder, sampler_pool_sizes, scene_layout_builder,
};
use crate::render::backends::vulkan::resources::frame_uniforms::UniformUpdate;
use crate::render::backends::vulkan::resources::image::find_depth_format;
use crate::render::backends::vulkan::resources::texture::{texture_sampler_info, TextureUpload};
use crate::render::backends::vulkan::resources::{
    CameraBlock, DescriptorPool, DescriptorSetLayout, DynamicUniformBlock, FrameUniforms, GpuMeshBuffers, LightBlock,
    Sampler, Texture, TextureId, ViewProjectionBlock,
};
use crate::render::backends::vulkan::state::{FrameSyncSet, PresentationDesc, PresentationTargets, TargetCounts};
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use crate::scene::{DirectionalLight, Mesh, MeshId, Model, ModelId, SceneRegistry};
use ash::vk;
use recorder::{OverlayRecording, SceneRecording};
use std::path::Path;

/// GPU state, declared in destruction order
struct RenderState {
    presentation: Option<PresentationTargets>,
    overlay: Box<dyn OverlayRenderer>,
    offscreen_pipeline: GraphicsPipeline,
    shadow: ShadowTarget,
    sampler_pool: DescriptorPool,
    sampler_layout: DescriptorSetLayout,
    scene_layout: DescriptorSetLayout,
    texture_sampler: Sampler,
    textures: Vec<Texture>,
    registry: SceneRegistry<GpuMeshBuffers>,
    uniforms: FrameUniforms,
    dynamic_block: DynamicUniformBlock,
    sync: FrameSyncSet,
    command_pool: CommandPool,
    decoder: Box<dyn TextureDecoder>,
    fallback_texture: Option<TextureId>,
    light: DirectionalLight,
    samples: vk::SampleCountFlags,
    sample_shading: bool,
    depth_format: vk::Format,
    config: RendererConfig,
    context: VulkanContext,
}

/// Vulkan renderer with a shadow pass, an MSAA scene pass and a UI overlay
pub struct VulkanRenderer {
    frame_loop: FrameLoop,
    state: RenderState,
}

impl VulkanRenderer {
    /// Bootstrap Vulkan on `surface` and build every startup resource
    pub fn new(
        surface: &mut dyn RenderSurface,
        config: RendererConfig,
        overlay: Box<dyn OverlayRenderer>,
    ) -> VulkanResult<Self> {
        config
            .validate()
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;
        if config.dynamic_offset_mode == DynamicOffsetMode::PerCollection {
            log::warn!("Per-collection dynamic offsets overlap when models and standalone meshes are both present");
        }

        let context = VulkanContext::new(surface, &config)?;
        let device = context.raw_device().clone();
        let memory_properties = *context.memory_properties();
        let physical = &context.physical_device;

        let samples = clamp_sample_count(config.sample_count, physical.max_usable_samples);
        if samples.as_raw() != config.sample_count {
            log::warn!("Requested {}x MSAA, using {:?}", config.sample_count, samples);
        }
        let sample_shading = physical.supports_sample_shading() && samples != vk::SampleCountFlags::TYPE_1;
        let depth_format = find_depth_format(context.instance(), physical.device)?;

        let command_pool = CommandPool::new(device.clone(), context.device.queue_families.graphics)?;
        let scene_layout = scene_layout_builder().build(&device)?;
        let sampler_layout = sampler_layout_builder().build(&device)?;
        let max_objects = config.max_objects as u32;
        let mut sampler_pool = DescriptorPool::new(device.clone(), max_objects + 1, &sampler_pool_sizes(max_objects))?;
        let texture_sampler = Sampler::new(device.clone(), &texture_sampler_info(physical.max_sampler_anisotropy))?;

        let shadow = ShadowTarget::new(
            &device,
            &memory_properties,
            depth_format,
            config.shadow_map_dim,
            &mut sampler_pool,
            &sampler_layout,
        )?;
        let offscreen_pipeline = {
            let vertex = ShaderModule::from_file(device.clone(), &config.shaders.shadow_vertex_path())?;
            PipelineBuilder::offscreen(&vertex, scene_layout.handle()).build(&device, shadow.render_pass())?
        };

        let dynamic_block = DynamicUniformBlock::new(config.max_objects, physical.min_uniform_buffer_offset_alignment);

        let presentation = PresentationTargets::new(
            &context,
            &command_pool,
            &PresentationDesc {
                framebuffer_size: surface.framebuffer_size(),
                samples,
                sample_shading,
                depth_format,
                shaders: &config.shaders,
                set_layouts: [scene_layout.handle(), sampler_layout.handle(), sampler_layout.handle()],
            },
        )?;
        let image_count = presentation.image_count();

        let uniforms = FrameUniforms::new(
            &device,
            &memory_properties,
            &scene_layout,
            image_count,
            dynamic_block.stride() as vk::DeviceSize,
            config.max_objects,
        )?;
        let sync = FrameSyncSet::new(device, config.max_frames_in_flight, image_count)?;

        let mut state = RenderState {
            presentation: None,
            overlay,
            offscreen_pipeline,
            shadow,
            sampler_pool,
            sampler_layout,
            scene_layout,
            texture_sampler,
            textures: Vec::new(),
            registry: SceneRegistry::new(config.max_objects),
            uniforms,
            dynamic_block,
            sync,
            command_pool,
            decoder: Box::new(ImageCrateDecoder),
            fallback_texture: None,
            light: DirectionalLight::default(),
            samples,
            sample_shading,
            depth_format,
            config,
            context,
        };

        let overlay_targets = state.overlay_targets(&presentation);
        state.overlay.on_targets_changed(&overlay_targets);
        state.presentation = Some(presentation);

        log::info!(
            "Vulkan renderer ready: {} swapchain images, {} frames in flight, {:?} MSAA",
            image_count,
            state.config.max_frames_in_flight,
            samples
        );

        Ok(Self {
            frame_loop: FrameLoop::new(state.config.max_frames_in_flight),
            state,
        })
    }

    /// Decode an image file and upload it as a texture
    pub fn create_texture(&mut self, path: &Path) -> VulkanResult<TextureId> {
        let data = self.state.decoder.decode(path)?;
        self.state.upload_texture(&data)
    }

    /// Upload already decoded RGBA8 pixels as a texture
    pub fn create_texture_from_data(&mut self, data: &TextureData) -> VulkanResult<TextureId> {
        self.state.upload_texture(data)
    }

    /// Replace the decoder used by [`Self::create_texture`]
    pub fn set_texture_decoder(&mut self, decoder: Box<dyn TextureDecoder>) {
        self.state.decoder = decoder;
    }

    /// Texture given to model materials that name none
    pub fn set_fallback_texture(&mut self, texture: Option<TextureId>) {
        self.state.fallback_texture = texture;
    }

    /// Upload a standalone mesh
    pub fn create_mesh(&mut self, mesh: &MeshData, texture: Option<TextureId>) -> VulkanResult<MeshId> {
        self.state.registry.ensure_room(1)?;
        self.state.check_texture(texture)?;
        let buffers = self.state.upload_mesh(mesh)?;
        Ok(self.state.registry.add_mesh(Mesh::new(buffers, texture))?)
    }

    /// Upload a model, loading one texture per textured material
    ///
    /// The model is registered only once every mesh is on the GPU.
    pub fn create_model(&mut self, model: &ModelData) -> VulkanResult<ModelId> {
        model.validate()?;
        self.state.registry.ensure_room(model.meshes.len())?;

        let materials = model
            .material_textures
            .iter()
            .map(|path| path.as_deref().map(|path| self.state.decoder.decode(path)).transpose())
            .collect::<Result<Vec<_>, _>>()?;
        let fallback = self.state.fallback_texture;
        let meshes = upload_model(&mut self.state, &model.meshes, &materials, fallback)?;

        let id = self.state.registry.add_model(Model::new(meshes))?;
        log::info!("Created model {} with {} meshes", id.0, model.meshes.len());
        Ok(id)
    }

    /// Set a model's transform; unknown ids are ignored and return false
    pub fn update_model_transform(&mut self, id: ModelId, transform: Mat4) -> bool {
        self.state.registry.update_model_transform(id, transform)
    }

    /// Set a standalone mesh's transform; unknown ids are ignored and return false
    pub fn update_mesh_transform(&mut self, id: MeshId, transform: Mat4) -> bool {
        self.state.registry.update_mesh_transform(id, transform)
    }

    /// Replace the directional light
    pub fn set_directional_light(&mut self, light: DirectionalLight) {
        self.state.light = light;
    }

    /// Change only the given light parameters
    pub fn update_directional_light(
        &mut self,
        direction: Option<Vec3>,
        colour: Option<Vec3>,
        ambient_intensity: Option<f32>,
        diffuse_intensity: Option<f32>,
    ) {
        self.state.light.update(direction, colour, ambient_intensity, diffuse_intensity);
    }

    /// Current directional light
    pub fn directional_light(&self) -> &DirectionalLight {
        &self.state.light
    }

    /// Rebuild the swapchain at the next opportunity
    pub fn notify_framebuffer_resized(&mut self) {
        self.frame_loop.notify_framebuffer_resized();
    }

    /// Render and present one frame
    ///
    /// Out-of-date and suboptimal swapchains are rebuilt here and reported in
    /// the outcome rather than as errors.
    pub fn draw(
        &mut self,
        surface: &mut dyn RenderSurface,
        input: &FrameInput,
        overlay_state: &mut OverlayState,
    ) -> VulkanResult<FrameOutcome> {
        let mut frame = FrameContext {
            state: &mut self.state,
            surface,
            input,
            overlay_state,
        };
        self.frame_loop.run_frame(&mut frame)
    }

    /// Rebuild every swapchain-dependent object now
    pub fn rebuild_swapchain(&mut self, surface: &mut dyn RenderSurface) -> VulkanResult<()> {
        self.state.rebuild_swapchain(surface)
    }

    /// Block until the GPU is idle
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.state.context.wait_idle()
    }

    /// Frame loop state
    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    /// Number of registered draws
    pub fn drawable_count(&self) -> usize {
        self.state.registry.drawable_count()
    }

    /// Number of uploaded textures
    pub fn texture_count(&self) -> usize {
        self.state.textures.len()
    }

    /// Scene MSAA sample count in use
    pub fn sample_count(&self) -> vk::SampleCountFlags {
        self.state.samples
    }

    /// Sizes of the per-image collections
    pub fn target_counts(&self) -> Option<TargetCounts> {
        self.state.presentation.as_ref().map(PresentationTargets::counts)
    }

    /// Swapchain extent
    pub fn swapchain_extent(&self) -> Option<vk::Extent2D> {
        self.state.presentation.as_ref().map(PresentationTargets::extent)
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        log::info!(
            "Destroying Vulkan renderer ({} drawables, {} textures, {} frames presented)",
            self.state.registry.drawable_count(),
            self.state.textures.len(),
            self.frame_loop.frames_presented()
        );
        if let Err(e) = self.state.context.wait_idle() {
            log::error!("Device wait failed during shutdown: {}", e);
        }
        self.state.presentation = None;
        // Models before standalone meshes, in creation order
        let (models, meshes) = self.state.registry.drain();
        drop(models);
        drop(meshes);
    }
}

/// Destination for a model's geometry and material textures
trait ModelUploader {
    type Buffers;

    fn upload_mesh(&mut self, mesh: &MeshData) -> VulkanResult<Self::Buffers>;

    fn upload_texture(&mut self, data: &TextureData) -> VulkanResult<TextureId>;

    fn texture_count(&self) -> usize;

    /// Drop textures created after the first `len`
    fn truncate_textures(&mut self, len: usize);
}

impl ModelUploader for RenderState {
    type Buffers = GpuMeshBuffers;

    fn upload_mesh(&mut self, mesh: &MeshData) -> VulkanResult<GpuMeshBuffers> {
        RenderState::upload_mesh(self, mesh)
    }

    fn upload_texture(&mut self, data: &TextureData) -> VulkanResult<TextureId> {
        RenderState::upload_texture(self, data)
    }

    fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn truncate_textures(&mut self, len: usize) {
        self.textures.truncate(len);
    }
}

/// Upload every mesh, then the material textures, pairing them up
///
/// Geometry goes first so a failed mesh upload registers no texture. A failed
/// texture upload drops the textures this call already created.
fn upload_model<U: ModelUploader>(
    uploader: &mut U,
    meshes: &[MeshData],
    materials: &[Option<TextureData>],
    fallback: Option<TextureId>,
) -> VulkanResult<Vec<Mesh<U::Buffers>>> {
    let buffers = meshes
        .iter()
        .map(|mesh| uploader.upload_mesh(mesh))
        .collect::<VulkanResult<Vec<_>>>()?;

    let mark = uploader.texture_count();
    let mut textures = Vec::with_capacity(materials.len());
    for material in materials {
        let texture = match material {
            Some(data) => match uploader.upload_texture(data) {
                Ok(id) => Some(id),
                Err(e) => {
                    uploader.truncate_textures(mark);
                    return Err(e);
                }
            },
            None => fallback,
        };
        textures.push(texture);
    }

    Ok(buffers
        .into_iter()
        .zip(meshes)
        .map(|(buffers, mesh)| Mesh::new(buffers, textures.get(mesh.material_index).copied().flatten()))
        .collect())
}

impl RenderState {
    fn presentation(&self) -> VulkanResult<&PresentationTargets> {
        self.presentation.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "swapchain is being rebuilt".to_string(),
        })
    }

    fn overlay_targets(&self, targets: &PresentationTargets) -> OverlayTargets {
        OverlayTargets {
            instance: self.context.instance().handle(),
            physical_device: self.context.physical_device.device,
            device: self.context.raw_device().handle(),
            queue_family: self.context.device.queue_families.graphics,
            queue: self.context.graphics_queue(),
            render_pass: targets.overlay_pass(),
            image_count: targets.image_count() as u32,
            extent: targets.extent(),
        }
    }

    fn check_texture(&self, texture: Option<TextureId>) -> VulkanResult<()> {
        match texture {
            Some(id) if id.0 >= self.textures.len() => Err(VulkanError::InvalidOperation {
                reason: format!("texture {} does not exist ({} loaded)", id.0, self.textures.len()),
            }),
            _ => Ok(()),
        }
    }

    fn upload_texture(&mut self, data: &TextureData) -> VulkanResult<TextureId> {
        let texture = Texture::new(
            TextureUpload {
                device: self.context.raw_device(),
                memory_properties: self.context.memory_properties(),
                command_pool: &self.command_pool,
                queue: self.context.graphics_queue(),
                sampler: &self.texture_sampler,
                descriptor_pool: &mut self.sampler_pool,
                layout: &self.sampler_layout,
            },
            data,
        )?;
        self.textures.push(texture);
        Ok(TextureId(self.textures.len() - 1))
    }

    fn upload_mesh(&self, mesh: &MeshData) -> VulkanResult<GpuMeshBuffers> {
        GpuMeshBuffers::new(
            self.context.raw_device(),
            self.context.memory_properties(),
            &self.command_pool,
            self.context.graphics_queue(),
            mesh,
        )
    }

    fn rebuild_swapchain(&mut self, surface: &mut dyn RenderSurface) -> VulkanResult<()> {
        let mut framebuffer_size = surface.framebuffer_size();
        while framebuffer_size.0 == 0 || framebuffer_size.1 == 0 {
            surface.wait_events();
            framebuffer_size = surface.framebuffer_size();
        }

        self.context.wait_idle()?;
        self.presentation = None;

        let targets = PresentationTargets::new(
            &self.context,
            &self.command_pool,
            &PresentationDesc {
                framebuffer_size,
                samples: self.samples,
                sample_shading: self.sample_shading,
                depth_format: self.depth_format,
                shaders: &self.config.shaders,
                set_layouts: [
                    self.scene_layout.handle(),
                    self.sampler_layout.handle(),
                    self.sampler_layout.handle(),
                ],
            },
        )?;

        let image_count = targets.image_count();
        if image_count != self.uniforms.image_count() {
            log::info!("Swapchain image count changed {} -> {}", self.uniforms.image_count(), image_count);
            self.uniforms = FrameUniforms::new(
                self.context.raw_device(),
                self.context.memory_properties(),
                &self.scene_layout,
                image_count,
                self.dynamic_block.stride() as vk::DeviceSize,
                self.config.max_objects,
            )?;
        }
        self.sync.reset_for_swapchain(image_count)?;

        let overlay_targets = self.overlay_targets(&targets);
        self.overlay.on_targets_changed(&overlay_targets);

        let extent = targets.extent();
        log::info!("Rebuilt swapchain at {}x{} with {} images", extent.width, extent.height, image_count);
        self.presentation = Some(targets);
        Ok(())
    }
}

/// Borrowed view of the renderer for one frame
struct FrameContext<'a> {
    state: &'a mut RenderState,
    surface: &'a mut dyn RenderSurface,
    input: &'a FrameInput,
    overlay_state: &'a mut OverlayState,
}

impl FrameBackend for FrameContext<'_> {
    fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()> {
        self.state.sync.slot(slot).in_flight.wait(u64::MAX)
    }

    fn reset_slot(&mut self, slot: usize) -> VulkanResult<()> {
        self.state.sync.slot(slot).in_flight.reset()
    }

    fn acquire(&mut self, slot: usize) -> VulkanResult<AcquireOutcome> {
        let semaphore = self.state.sync.slot(slot).image_available.handle();
        self.state.presentation()?.swapchain().acquire_next_image(semaphore)
    }

    fn wait_for_image(&mut self, image: usize, slot: usize) -> VulkanResult<()> {
        self.state.sync.claim_image(image, slot)
    }

    fn update_uniforms(&mut self, image: usize) -> VulkanResult<()> {
        let state = &mut *self.state;
        let draws = DrawList::build(&state.registry, state.config.dynamic_offset_mode);
        if draws.exceeds(state.dynamic_block.capacity()) {
            return Err(VulkanError::CapacityExceeded {
                what: "dynamic uniform block",
                limit: state.dynamic_block.capacity(),
            });
        }
        draws.pack(&mut state.dynamic_block)?;

        let view_projection = ViewProjectionBlock::new(&self.input.projection, &self.input.view, &state.light.light_transform());
        let light = LightBlock::from(&state.light);
        let camera = CameraBlock::new(self.input.camera_position);

        state.uniforms.update(
            image,
            &UniformUpdate {
                view_projection: &view_projection,
                models: state.dynamic_block.used_bytes(draws.len()),
                light: &light,
                camera: &camera,
            },
        )
    }

    fn record(&mut self, image: usize) -> VulkanResult<()> {
        let state = &mut *self.state;
        let device = &state.context.device.device;
        let targets = state.presentation.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "swapchain is being rebuilt".to_string(),
        })?;

        let draws = DrawList::build(&state.registry, state.config.dynamic_offset_mode);
        let scene = SceneRecording {
            draws: &draws,
            dynamic_block: &state.dynamic_block,
            scene_set: state.uniforms.descriptor_set(image)?,
            textures: &state.textures,
            shadow: &state.shadow,
            offscreen_pipeline: &state.offscreen_pipeline,
            scene_pipeline: targets.scene_pipeline(),
            scene_pass: targets.scene_pass(),
            scene_framebuffer: targets.scene_framebuffer(image)?,
            extent: targets.extent(),
            clear_color: state.config.clear_color,
            depth_bias: (state.config.depth_bias_constant, state.config.depth_bias_slope),
        };
        recorder::record_scene(device, targets.scene_command_buffer(image)?, &scene)?;

        let overlay = OverlayRecording {
            render_pass: targets.overlay_pass(),
            framebuffer: targets.overlay_framebuffer(image)?,
            extent: targets.extent(),
            image_index: image as u32,
        };
        recorder::record_overlay(
            device,
            targets.overlay_command_buffer(image)?,
            &overlay,
            state.overlay.as_mut(),
            &mut *self.overlay_state,
        )
    }

    fn submit(&mut self, slot: usize, image: usize) -> VulkanResult<()> {
        let targets = self.state.presentation()?;
        let sync = self.state.sync.slot(slot);

        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [targets.scene_command_buffer(image)?, targets.overlay_command_buffer(image)?];
        let signal_semaphores = [sync.render_finished.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.state.context.raw_device().queue_submit(
                self.state.context.graphics_queue(),
                &[submit_info],
                sync.in_flight.handle(),
            )?;
        }
        Ok(())
    }

    fn present(&mut self, slot: usize, image: usize) -> VulkanResult<PresentOutcome> {
        let wait = self.state.sync.slot(slot).render_finished.handle();
        self.state
            .presentation()?
            .swapchain()
            .present(self.state.context.present_queue(), wait, image as u32)
    }

    fn rebuild_swapchain(&mut self) -> VulkanResult<()> {
        self.state.rebuild_swapchain(self.surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::primitives::Vertex;

    #[derive(Default)]
    struct RecordingUploader {
        events: Vec<&'static str>,
        textures: usize,
        fail_mesh: Option<usize>,
        fail_texture: Option<usize>,
        meshes_uploaded: usize,
    }

    impl ModelUploader for RecordingUploader {
        type Buffers = usize;

        fn upload_mesh(&mut self, _mesh: &MeshData) -> VulkanResult<usize> {
            self.events.push("mesh");
            if self.fail_mesh == Some(self.meshes_uploaded) {
                return Err(VulkanError::Api(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
            }
            self.meshes_uploaded += 1;
            Ok(self.meshes_uploaded - 1)
        }

        fn upload_texture(&mut self, _data: &TextureData) -> VulkanResult<TextureId> {
            self.events.push("texture");
            if self.fail_texture == Some(self.textures) {
                return Err(VulkanError::Api(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
            }
            self.textures += 1;
            Ok(TextureId(self.textures - 1))
        }

        fn texture_count(&self) -> usize {
            self.textures
        }

        fn truncate_textures(&mut self, len: usize) {
            self.textures = self.textures.min(len);
        }
    }

    fn triangle(material: usize) -> MeshData {
        let vertices = vec![Vertex::default(); 3];
        MeshData::new(vertices, vec![0, 1, 2]).expect("valid mesh").with_material(material)
    }

    fn pixels() -> Option<TextureData> {
        Some(TextureData::solid_color(1, 1, [255; 4]).expect("valid size"))
    }

    #[test]
    fn meshes_upload_before_textures() {
        let mut uploader = RecordingUploader::default();
        let meshes = [triangle(0), triangle(1)];

        let built = upload_model(&mut uploader, &meshes, &[pixels(), None], Some(TextureId(7))).expect("upload");

        assert_eq!(uploader.events, vec!["mesh", "mesh", "texture"]);
        assert_eq!(built[0].texture, Some(TextureId(0)));
        assert_eq!(built[1].texture, Some(TextureId(7)));
    }

    #[test]
    fn failed_mesh_registers_no_texture() {
        let mut uploader = RecordingUploader { fail_mesh: Some(1), ..Default::default() };
        let meshes = [triangle(0), triangle(0)];

        assert!(upload_model(&mut uploader, &meshes, &[pixels()], None).is_err());
        assert_eq!(uploader.textures, 0);
        assert!(!uploader.events.contains(&"texture"));
    }

    #[test]
    fn failed_texture_rolls_back_earlier_ones() {
        let mut uploader = RecordingUploader { textures: 2, fail_texture: Some(3), ..Default::default() };
        let meshes = [triangle(0), triangle(1)];

        assert!(upload_model(&mut uploader, &meshes, &[pixels(), pixels()], None).is_err());
        assert_eq!(uploader.textures, 2);
    }
}
