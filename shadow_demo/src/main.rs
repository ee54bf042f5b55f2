//! Shadow demo application
//!
//! A spinning cube above a ground plane, lit by a directional light that
//! slowly orbits the scene. Escape quits, L pauses the light orbit.

use glfw::{Action, Key, WindowEvent};
use rust_renderer::assets::AssetError;
use rust_renderer::config::ConfigError;
use rust_renderer::prelude::*;
use rust_renderer::render::WindowError;
use std::time::Instant;
use thiserror::Error;

const CONFIG_PATH: &str = "renderer.toml";

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Renderer(#[from] VulkanError),
}

fn cube_mesh() -> Result<MeshData, AssetError> {
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, right, up) in faces {
        let base = vertices.len() as u32;
        for (u, v) in [(-1.0_f32, -1.0_f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = [
                normal[0] + right[0] * u + up[0] * v,
                normal[1] + right[1] * u + up[1] * v,
                normal[2] + right[2] * u + up[2] * v,
            ];
            vertices.push(
                Vertex::new(position, [0.9, 0.6, 0.3], [(u + 1.0) * 0.5, (1.0 - v) * 0.5]).with_normal(normal),
            );
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    MeshData::new(vertices, indices)
}

fn ground_mesh(half_extent: f32) -> Result<MeshData, AssetError> {
    let normal = [0.0, 1.0, 0.0];
    let colour = [0.7, 0.7, 0.7];
    let vertices = vec![
        Vertex::new([-half_extent, 0.0, half_extent], colour, [0.0, 4.0]).with_normal(normal),
        Vertex::new([half_extent, 0.0, half_extent], colour, [4.0, 4.0]).with_normal(normal),
        Vertex::new([half_extent, 0.0, -half_extent], colour, [4.0, 0.0]).with_normal(normal),
        Vertex::new([-half_extent, 0.0, -half_extent], colour, [0.0, 0.0]).with_normal(normal),
    ];
    MeshData::new(vertices, vec![0, 1, 2, 2, 3, 0])
}

fn checker_texture(size: u32, cell: u32) -> Result<TextureData, AssetError> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let shade = if ((x / cell) + (y / cell)) % 2 == 0 { 220 } else { 90 };
            pixels.extend_from_slice(&[shade, shade, shade, 255]);
        }
    }
    TextureData::new(size, size, pixels)
}

fn run() -> Result<(), DemoError> {
    let config = RendererConfig::load_or_default(CONFIG_PATH)?;
    let mut window = Window::new(&config.window)?;
    let (width, height) = (config.window.width, config.window.height);
    let mut renderer = VulkanRenderer::new(&mut window, config, Box::new(NullOverlay))?;

    let checker = renderer.create_texture_from_data(&checker_texture(256, 32)?)?;
    let ground = renderer.create_mesh(&ground_mesh(10.0)?, Some(checker))?;
    let cube = renderer.create_model(&ModelData {
        meshes: vec![cube_mesh()?],
        material_textures: vec![None],
    })?;
    log::info!("Scene ready: ground {:?}, cube {:?}", ground, cube);

    let mut camera = Camera::perspective(Vec3::new(6.0, 6.0, 10.0), 45.0, width as f32 / height as f32, 0.1, 100.0);
    camera.look_at(Vec3::zeros());

    let mut ui = OverlayState::default();
    let start = Instant::now();
    let mut light_paused = false;
    let mut light_angle = 0.0_f32;
    let mut last_frame = start;

    while !window.should_close() {
        window.poll_events();
        let events: Vec<_> = window.flush_events().collect();
        for (_, event) in events {
            match event {
                WindowEvent::Key(Key::Escape, _, Action::Press, _) => window.set_should_close(true),
                WindowEvent::Key(Key::L, _, Action::Press, _) => light_paused = !light_paused,
                WindowEvent::FramebufferSize(w, h) => {
                    renderer.notify_framebuffer_resized();
                    if w > 0 && h > 0 {
                        camera.set_viewport(w as u32, h as u32);
                    }
                }
                _ => {}
            }
        }

        let now = Instant::now();
        let dt = (now - last_frame).as_secs_f32();
        last_frame = now;
        if !light_paused {
            light_angle += dt * 0.3;
        }
        renderer.update_directional_light(
            Some(Vec3::new(light_angle.cos() * 2.0, -1.5, light_angle.sin() * 2.0)),
            None,
            None,
            None,
        );

        let t = (now - start).as_secs_f32();
        let spin = Mat4::new_translation(&Vec3::new(0.0, 1.5, 0.0)) * Mat4::new_rotation(Vec3::new(0.0, t, t * 0.5));
        renderer.update_model_transform(cube, spin);

        if let FrameOutcome::SwapchainRebuilt = renderer.draw(&mut window, &FrameInput::from_camera(&camera), &mut ui)? {
            log::debug!("Frame skipped for swapchain rebuild");
        }
    }

    renderer.wait_idle()?;
    Ok(())
}

fn main() {
    rust_renderer::foundation::logging::init();

    if let Err(e) = run() {
        log::error!("Shadow demo failed: {}", e);
        std::process::exit(1);
    }
}
