//! GPU shader program
//!
//! Wraps a [`LinkedProgram`] in a render pipeline. Uniforms are staged on the
//! CPU and snapshotted per draw into a ring buffer bound with dynamic offsets,
//! so a value set before a draw is what that draw sees, and it stays set for
//! later draws until overwritten.

use std::num::NonZeroU64;
use std::path::Path;

use glam::{Mat4, Vec4};
use naga::ScalarKind;

use super::mesh::QuadMesh;
use super::texture::Texture;
use super::vertex::Vertex;
use crate::consts::MAX_DRAWS_PER_FRAME;
use crate::shader::{
    self, CompiledStage, LinkedProgram, ProgramBinding, ResourceKind, ShaderError, TEXTURE_GROUP,
    UNIFORM_GROUP, UniformValue, sampler_name,
};

/// Per-draw copies of one uniform buffer
struct UniformRing {
    binding: u32,
    /// Bytes per draw, aligned for dynamic offsets
    stride: u32,
    buffer: wgpu::Buffer,
    staging: Vec<u8>,
}

pub struct ShaderProgram {
    linked: LinkedProgram,
    pipeline: wgpu::RenderPipeline,
    texture_layout: Option<wgpu::BindGroupLayout>,
    rings: Vec<UniformRing>,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group: Option<wgpu::BindGroup>,
    draws: u32,
    overflow_logged: bool,
}

impl ShaderProgram {
    /// Build the pipeline for a linked program drawing [`Vertex`] meshes.
    ///
    /// Device validation errors are captured and returned as
    /// [`ShaderError::Link`] instead of reaching the uncaptured error handler.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        linked: LinkedProgram,
    ) -> Result<Self, ShaderError> {
        check_vertex_inputs(linked.vertex(), &Vertex::desc())?;
        check_fragment_outputs(linked.fragment())?;
        check_uniform_sizes(&linked, device.limits().max_uniform_buffer_binding_size)?;

        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let program = Self::create(device, format, linked);
        if let Some(error) = pollster::block_on(scope.pop()) {
            return Err(ShaderError::Link(format!("device rejected the program: {error}")));
        }
        Ok(program)
    }

    fn create(device: &wgpu::Device, format: wgpu::TextureFormat, linked: LinkedProgram) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &layout_entries(linked.bindings_in(UNIFORM_GROUP)),
        });
        let texture_layout = linked.bindings_in(TEXTURE_GROUP).next().map(|_| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("texture_bind_group_layout"),
                entries: &layout_entries(linked.bindings_in(TEXTURE_GROUP)),
            })
        });

        let min_alignment = device.limits().min_uniform_buffer_offset_alignment;
        let rings: Vec<UniformRing> = linked
            .uniforms()
            .blocks()
            .iter()
            .map(|block| {
                let stride = block.layout.size.div_ceil(min_alignment) * min_alignment;
                let size = stride as u64 * MAX_DRAWS_PER_FRAME as u64;
                UniformRing {
                    binding: block.binding,
                    stride,
                    buffer: device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some("uniform_ring"),
                        size,
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    }),
                    staging: vec![0; size as usize],
                }
            })
            .collect();

        let uniform_entries: Vec<wgpu::BindGroupEntry> = rings
            .iter()
            .zip(linked.uniforms().blocks())
            .map(|(ring, block)| wgpu::BindGroupEntry {
                binding: ring.binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &ring.buffer,
                    offset: 0,
                    size: NonZeroU64::new(block.layout.size as u64),
                }),
            })
            .collect();
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &uniform_layout,
            entries: &uniform_entries,
        });

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vertex_shader"),
            source: wgpu::ShaderSource::Wgsl(linked.vertex().source().into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fragment_shader"),
            source: wgpu::ShaderSource::Wgsl(linked.fragment().source().into()),
        });

        let mut bind_group_layouts = vec![&uniform_layout];
        if let Some(layout) = &texture_layout {
            bind_group_layouts.push(layout);
        }
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("program_pipeline_layout"),
            bind_group_layouts: &bind_group_layouts,
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("program_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some(linked.vertex().entry_point()),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some(linked.fragment().entry_point()),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::info!(
            "Shader program ready: {} uniform buffers, {} textures",
            rings.len(),
            linked.texture_names().count()
        );

        Self {
            linked,
            pipeline,
            texture_layout,
            rings,
            uniform_bind_group,
            texture_bind_group: None,
            draws: 0,
            overflow_logged: false,
        }
    }

    pub fn from_sources(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        Self::new(device, format, shader::build(vertex_source, fragment_source)?)
    }

    pub fn from_files(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        Self::new(device, format, shader::build_from_files(vertex_path, fragment_path)?)
    }

    pub fn linked(&self) -> &LinkedProgram {
        &self.linked
    }

    /// Texture uniforms the program samples, in binding order
    pub fn texture_names(&self) -> impl Iterator<Item = &str> {
        self.linked.texture_names()
    }

    /// Make this program current for the following draws on `pass`
    pub fn activate(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
    }

    /// Set a uniform by name. Unknown names are ignored.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.linked.uniforms_mut().set(name, value);
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set_uniform(name, value);
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set_uniform(name, value);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set_uniform(name, value);
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.set_uniform(name, value);
    }

    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.set_uniform(name, value);
    }

    /// Bind a texture to every texture uniform, by name. A name missing from
    /// `textures` gets `fallback`.
    pub fn bind_textures(
        &mut self,
        device: &wgpu::Device,
        textures: &[(String, Texture)],
        fallback: &Texture,
    ) {
        let Some(layout) = &self.texture_layout else {
            return;
        };
        let lookup = |name: &str| {
            textures
                .iter()
                .find(|(n, _)| n == name)
                .map_or(fallback, |(_, texture)| texture)
        };

        let entries: Vec<wgpu::BindGroupEntry> = self
            .linked
            .bindings_in(TEXTURE_GROUP)
            .map(|binding| {
                let resource = match binding.kind {
                    ResourceKind::Sampler => {
                        let texture = self
                            .linked
                            .texture_names()
                            .find(|t| sampler_name(t) == binding.name)
                            .map_or(fallback, lookup);
                        wgpu::BindingResource::Sampler(&texture.sampler)
                    }
                    _ => wgpu::BindingResource::TextureView(&lookup(&binding.name).view),
                };
                wgpu::BindGroupEntry {
                    binding: binding.binding,
                    resource,
                }
            })
            .collect();

        self.texture_bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture_bind_group"),
            layout,
            entries: &entries,
        }));
    }

    /// Start recording a frame; resets the per-draw uniform ring
    pub fn begin_frame(&mut self) {
        self.draws = 0;
    }

    /// Draw `mesh` with the current uniform values.
    ///
    /// Returns false if the frame already holds the maximum number of draws.
    pub fn draw_indexed(&mut self, pass: &mut wgpu::RenderPass<'_>, mesh: &QuadMesh) -> bool {
        if self.draws >= MAX_DRAWS_PER_FRAME {
            if !self.overflow_logged {
                log::warn!("More than {MAX_DRAWS_PER_FRAME} draws in one frame, dropping the rest");
                self.overflow_logged = true;
            }
            return false;
        }

        let mut offsets = Vec::with_capacity(self.rings.len());
        for (ring, block) in self.rings.iter_mut().zip(self.linked.uniforms().blocks()) {
            let offset = self.draws * ring.stride;
            let start = offset as usize;
            let bytes = block.bytes();
            ring.staging[start..start + bytes.len()].copy_from_slice(bytes);
            offsets.push(offset);
        }

        pass.set_bind_group(UNIFORM_GROUP, &self.uniform_bind_group, &offsets);
        if let Some(textures) = &self.texture_bind_group {
            pass.set_bind_group(TEXTURE_GROUP, textures, &[]);
        }
        pass.draw_indexed(0..mesh.index_count(), 0, 0..1);
        self.draws += 1;
        true
    }

    /// Upload the uniform snapshots of this frame. Call before submitting.
    pub fn end_frame(&self, queue: &wgpu::Queue) {
        if self.draws == 0 {
            return;
        }
        for ring in &self.rings {
            let used = (self.draws * ring.stride) as usize;
            queue.write_buffer(&ring.buffer, 0, &ring.staging[..used]);
        }
    }

    pub fn draw_count(&self) -> u32 {
        self.draws
    }
}

fn layout_entries<'a>(
    bindings: impl Iterator<Item = &'a ProgramBinding>,
) -> Vec<wgpu::BindGroupLayoutEntry> {
    bindings
        .map(|binding| {
            let mut visibility = wgpu::ShaderStages::NONE;
            if binding.vertex {
                visibility |= wgpu::ShaderStages::VERTEX;
            }
            if binding.fragment {
                visibility |= wgpu::ShaderStages::FRAGMENT;
            }
            let ty = match &binding.kind {
                ResourceKind::Uniform(layout) => wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(layout.size as u64),
                },
                ResourceKind::Sampler => {
                    wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                }
                _ => wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
            };
            wgpu::BindGroupLayoutEntry {
                binding: binding.binding,
                visibility,
                ty,
                count: None,
            }
        })
        .collect()
}

fn attribute_kind(format: wgpu::VertexFormat) -> Option<ScalarKind> {
    use wgpu::VertexFormat as F;
    match format {
        F::Float32 | F::Float32x2 | F::Float32x3 | F::Float32x4 => Some(ScalarKind::Float),
        F::Uint32 | F::Uint32x2 | F::Uint32x3 | F::Uint32x4 => Some(ScalarKind::Uint),
        F::Sint32 | F::Sint32x2 | F::Sint32x3 | F::Sint32x4 => Some(ScalarKind::Sint),
        _ => None,
    }
}

/// Every vertex input must be fed by an attribute of the same scalar kind
pub fn check_vertex_inputs(
    vertex: &CompiledStage,
    layout: &wgpu::VertexBufferLayout<'_>,
) -> Result<(), ShaderError> {
    for input in vertex.inputs() {
        let Some(attribute) = layout
            .attributes
            .iter()
            .find(|a| a.shader_location == input.location)
        else {
            return Err(ShaderError::Link(format!(
                "vertex input `{}` at location {} has no vertex attribute",
                input.name, input.location
            )));
        };
        if let Some(kind) = attribute_kind(attribute.format)
            && kind != input.format.kind
        {
            return Err(ShaderError::Link(format!(
                "vertex input `{}` at location {} is {:?} but the attribute is {:?}",
                input.name, input.location, input.format.kind, attribute.format
            )));
        }
    }
    Ok(())
}

/// The single color target takes one float output at location 0
pub fn check_fragment_outputs(fragment: &CompiledStage) -> Result<(), ShaderError> {
    match fragment.outputs() {
        [output] if output.location == 0 && output.format.kind == ScalarKind::Float => Ok(()),
        [output] if output.location == 0 => Err(ShaderError::Link(format!(
            "fragment output is {:?} but the color target takes floats",
            output.format.kind
        ))),
        outputs => Err(ShaderError::Link(format!(
            "fragment stage must write exactly @location(0), found locations {:?}",
            outputs.iter().map(|o| o.location).collect::<Vec<_>>()
        ))),
    }
}

/// Every uniform buffer must fit in one binding of the device
pub fn check_uniform_sizes(
    linked: &LinkedProgram,
    max_binding_size: u32,
) -> Result<(), ShaderError> {
    for binding in linked.bindings_in(UNIFORM_GROUP) {
        if let ResourceKind::Uniform(layout) = &binding.kind
            && layout.size > max_binding_size
        {
            return Err(ShaderError::Link(format!(
                "uniform `{}` is {} bytes, over the device limit of {max_binding_size}",
                binding.name, layout.size
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::shaders;
    use crate::shader::{ShaderStage, build, compile};

    /// `max_uniform_buffer_binding_size` of `wgpu::Limits::downlevel_defaults()`
    const DOWNLEVEL_UNIFORM_LIMIT: u32 = 16 << 10;

    #[test]
    fn test_builtin_vertex_matches_quad_layout() {
        let stage = compile(ShaderStage::Vertex, shaders::QUAD_VERTEX).unwrap();
        assert!(check_vertex_inputs(&stage, &Vertex::desc()).is_ok());
    }

    #[test]
    fn test_unfed_location_is_rejected() {
        let src = r#"
            @vertex
            fn vs_main(@location(3) p: vec3<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(p, 1.0);
            }
        "#;
        let stage = compile(ShaderStage::Vertex, src).unwrap();
        let err = check_vertex_inputs(&stage, &Vertex::desc()).unwrap_err();
        assert!(err.to_string().contains("location 3"));
    }

    #[test]
    fn test_integer_input_from_float_attribute_is_rejected() {
        let src = r#"
            @vertex
            fn vs_main(@location(0) p: vec3<u32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(vec3<f32>(p), 1.0);
            }
        "#;
        let stage = compile(ShaderStage::Vertex, src).unwrap();
        assert!(matches!(
            check_vertex_inputs(&stage, &Vertex::desc()),
            Err(ShaderError::Link(_))
        ));
    }

    #[test]
    fn test_subset_of_attributes_is_fine() {
        let src = r#"
            @vertex
            fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(p, 1.0);
            }
        "#;
        let stage = compile(ShaderStage::Vertex, src).unwrap();
        assert!(check_vertex_inputs(&stage, &Vertex::desc()).is_ok());
    }

    #[test]
    fn test_builtin_program_fits_target_and_limits() {
        let linked = build(shaders::QUAD_VERTEX, shaders::QUAD_FRAGMENT).unwrap();
        assert!(check_fragment_outputs(linked.fragment()).is_ok());
        assert!(check_uniform_sizes(&linked, DOWNLEVEL_UNIFORM_LIMIT).is_ok());
    }

    #[test]
    fn test_integer_fragment_output_is_rejected() {
        let fragment = r#"
            @fragment
            fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<i32> {
                return vec4<i32>(vec3<i32>(color * 255.0), 255);
            }
        "#;
        // Links fine on the CPU; only the color target rules it out
        let linked = build(shaders::QUAD_VERTEX, fragment).unwrap();
        assert!(check_vertex_inputs(linked.vertex(), &Vertex::desc()).is_ok());
        let err = check_fragment_outputs(linked.fragment()).unwrap_err();
        assert!(err.to_string().contains("Sint"));
    }

    #[test]
    fn test_fragment_output_must_be_location_zero() {
        let fragment = r#"
            @fragment
            fn fs_main(@location(0) color: vec3<f32>) -> @location(1) vec4<f32> {
                return vec4<f32>(color, 1.0);
            }
        "#;
        let linked = build(shaders::QUAD_VERTEX, fragment).unwrap();
        assert!(matches!(
            check_fragment_outputs(linked.fragment()),
            Err(ShaderError::Link(_))
        ));
    }

    #[test]
    fn test_oversized_uniform_is_rejected() {
        let vertex = r#"
            struct Palette { colors: array<vec4<f32>, 2048> }
            @group(0) @binding(0) var<uniform> palette: Palette;

            struct VertexOutput {
                @builtin(position) clip_position: vec4<f32>,
                @location(0) color: vec3<f32>,
            }

            @vertex
            fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
                var out: VertexOutput;
                out.clip_position = vec4<f32>(position, 1.0);
                out.color = palette.colors[0].rgb;
                return out;
            }
        "#;
        let fragment = r#"
            @fragment
            fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
                return vec4<f32>(color, 1.0);
            }
        "#;
        let linked = build(vertex, fragment).unwrap();
        let err = check_uniform_sizes(&linked, DOWNLEVEL_UNIFORM_LIMIT).unwrap_err();
        assert!(err.to_string().contains("32768"));
        assert!(check_uniform_sizes(&linked, 64 << 10).is_ok());
    }
}
