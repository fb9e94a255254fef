//! wgpu rendering
//!
//! Every drawable is the same unit quad drawn with one shader program; only the
//! `transform`, `tint` and `textured` uniforms change between draws.

pub mod gpu;
pub mod mesh;
pub mod program;
pub mod texture;
pub mod vertex;

use std::sync::Arc;

use winit::window::Window;

pub use gpu::GpuContext;
pub use mesh::QuadMesh;
pub use program::ShaderProgram;
pub use texture::{DecodedImage, Texture, TextureError};
pub use vertex::Vertex;

use crate::scene::Drawable;
use crate::settings::{ShaderPaths, Settings};
use crate::shader::ShaderError;

/// Built-in WGSL sources
pub mod shaders {
    pub const QUAD_VERTEX: &str = include_str!("shaders/quad.vert.wgsl");
    pub const QUAD_FRAGMENT: &str = include_str!("shaders/quad.frag.wgsl");
}

#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// Owns the GPU context, the program, the quad and its textures
pub struct Renderer {
    gpu: GpuContext,
    program: ShaderProgram,
    mesh: QuadMesh,
    clear_color: wgpu::Color,
    // Bound into the program's texture group; kept alive here
    _textures: Vec<(String, Texture)>,
    _fallback: Texture,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, settings: &Settings) -> Result<Self, RendererError> {
        let gpu = GpuContext::new(window, settings.window.vsync).await?;
        let mut program = load_program(&gpu, &settings.shaders)?;
        let mesh = QuadMesh::new(&gpu.device);

        let fallback = Texture::white(&gpu.device, &gpu.queue);
        let textures: Vec<(String, Texture)> = program
            .texture_names()
            .map(|name| {
                let source = settings.texture_for(name);
                let texture = Texture::load_or_white(&gpu.device, &gpu.queue, name, source);
                (name.to_string(), texture)
            })
            .collect();
        program.bind_textures(&gpu.device, &textures, &fallback);

        // Set once; persists across draws
        program.set_float("mix_amount", settings.mix_amount);

        let [r, g, b, a] = settings.clear_color.map(f64::from);
        Ok(Self {
            gpu,
            program,
            mesh,
            clear_color: wgpu::Color { r, g, b, a },
            _textures: textures,
            _fallback: fallback,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        self.gpu.size
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        self.gpu.resize(new_width, new_height);
    }

    pub fn reconfigure(&mut self) {
        self.gpu.reconfigure();
    }

    /// Clear, draw every quad, present
    pub fn render(&mut self, draws: &[Drawable]) -> Result<(), wgpu::SurfaceError> {
        let output = self.gpu.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });

        self.program.begin_frame();
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            self.program.activate(&mut render_pass);
            self.mesh.bind(&mut render_pass);
            for draw in draws {
                self.program.set_mat4("transform", draw.transform);
                self.program.set_vec4("tint", draw.tint);
                self.program.set_bool("textured", draw.textured);
                self.program.draw_indexed(&mut render_pass, &self.mesh);
            }
        }
        self.program.end_frame(&self.gpu.queue);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

/// The configured program, or the built-in one if it fails
fn load_program(gpu: &GpuContext, paths: &ShaderPaths) -> Result<ShaderProgram, ShaderError> {
    if let (Some(vertex), Some(fragment)) = (&paths.vertex, &paths.fragment) {
        match ShaderProgram::from_files(&gpu.device, gpu.format(), vertex, fragment) {
            Ok(program) => {
                log::info!("Loaded shaders {} and {}", vertex.display(), fragment.display());
                return Ok(program);
            }
            Err(e) => log::error!("{e}; falling back to built-in shaders"),
        }
    } else if paths.vertex.is_some() || paths.fragment.is_some() {
        log::warn!("Both shader paths are needed; using built-in shaders");
    }
    ShaderProgram::from_sources(
        &gpu.device,
        gpu.format(),
        shaders::QUAD_VERTEX,
        shaders::QUAD_FRAGMENT,
    )
}
