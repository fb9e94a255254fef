//! Program linking
//!
//! Checks a vertex and a fragment stage against each other and merges their
//! resource bindings into one program layout.

use std::collections::BTreeMap;
use std::path::Path;

use super::compile::{CompiledStage, ResourceKind, compile};
use super::uniforms::{UniformBlock, UniformStorage};
use super::{ShaderError, ShaderStage};

/// Bind group holding `var<uniform>` buffers
pub const UNIFORM_GROUP: u32 = 0;
/// Bind group holding textures and their samplers
pub const TEXTURE_GROUP: u32 = 1;

/// Sampler paired with a texture by name
pub fn sampler_name(texture: &str) -> String {
    format!("{texture}_sampler")
}

/// A resource binding of the linked program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramBinding {
    pub group: u32,
    pub binding: u32,
    pub name: String,
    pub kind: ResourceKind,
    /// Used by the vertex stage
    pub vertex: bool,
    /// Used by the fragment stage
    pub fragment: bool,
}

/// A vertex and fragment stage that fit together
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    vertex: CompiledStage,
    fragment: CompiledStage,
    bindings: Vec<ProgramBinding>,
    uniforms: UniformStorage,
}

impl LinkedProgram {
    pub fn vertex(&self) -> &CompiledStage {
        &self.vertex
    }

    pub fn fragment(&self) -> &CompiledStage {
        &self.fragment
    }

    /// All bindings, ordered by group then binding
    pub fn bindings(&self) -> &[ProgramBinding] {
        &self.bindings
    }

    pub fn bindings_in(&self, group: u32) -> impl Iterator<Item = &ProgramBinding> {
        self.bindings.iter().filter(move |b| b.group == group)
    }

    /// Texture uniform names, in binding order
    pub fn texture_names(&self) -> impl Iterator<Item = &str> {
        self.bindings_in(TEXTURE_GROUP)
            .filter(|b| b.kind == ResourceKind::Texture2d)
            .map(|b| b.name.as_str())
    }

    pub fn uniforms(&self) -> &UniformStorage {
        &self.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut UniformStorage {
        &mut self.uniforms
    }

    /// Split into the stages and the uniform staging memory
    pub fn into_parts(self) -> (CompiledStage, CompiledStage, Vec<ProgramBinding>, UniformStorage) {
        (self.vertex, self.fragment, self.bindings, self.uniforms)
    }
}

/// Link two compiled stages into a program
pub fn link(vertex: CompiledStage, fragment: CompiledStage) -> Result<LinkedProgram, ShaderError> {
    if vertex.stage() != ShaderStage::Vertex || fragment.stage() != ShaderStage::Fragment {
        return Err(ShaderError::Link(format!(
            "expected a vertex and a fragment stage, got {} and {}",
            vertex.stage(),
            fragment.stage()
        )));
    }

    // Every fragment input must be written by the vertex stage
    for input in fragment.inputs() {
        let Some(output) = vertex.outputs().iter().find(|o| o.location == input.location) else {
            return Err(ShaderError::Link(format!(
                "fragment input `{}` at location {} is not written by the vertex stage",
                input.name, input.location
            )));
        };
        if output.format != input.format {
            return Err(ShaderError::Link(format!(
                "location {}: vertex writes {:?}x{} but fragment reads {:?}x{}",
                input.location,
                output.format.kind,
                output.format.components,
                input.format.kind,
                input.format.components
            )));
        }
    }

    let mut merged: BTreeMap<(u32, u32), ProgramBinding> = BTreeMap::new();
    for (stage, slot) in vertex
        .resources()
        .iter()
        .map(|r| (ShaderStage::Vertex, r))
        .chain(fragment.resources().iter().map(|r| (ShaderStage::Fragment, r)))
    {
        let entry = merged
            .entry((slot.group, slot.binding))
            .or_insert_with(|| ProgramBinding {
                group: slot.group,
                binding: slot.binding,
                name: slot.name.clone(),
                kind: slot.kind.clone(),
                vertex: false,
                fragment: false,
            });
        if entry.kind != slot.kind {
            return Err(ShaderError::Link(format!(
                "@group({}) @binding({}) is declared differently by the two stages",
                slot.group, slot.binding
            )));
        }
        match stage {
            ShaderStage::Vertex => entry.vertex = true,
            ShaderStage::Fragment => entry.fragment = true,
        }
    }
    let bindings: Vec<ProgramBinding> = merged.into_values().collect();

    for binding in &bindings {
        let expected_group = match binding.kind {
            ResourceKind::Uniform(_) => UNIFORM_GROUP,
            ResourceKind::Texture2d | ResourceKind::Sampler => TEXTURE_GROUP,
            ResourceKind::Unsupported(what) => {
                return Err(ShaderError::Link(format!(
                    "`{}`: unsupported {what}",
                    binding.name
                )));
            }
        };
        if binding.group != expected_group {
            return Err(ShaderError::Link(format!(
                "`{}` must be in @group({expected_group}), found @group({})",
                binding.name, binding.group
            )));
        }
    }

    // Samplers borrow their texture's filtering, so each needs a texture
    for sampler in bindings.iter().filter(|b| b.kind == ResourceKind::Sampler) {
        let paired = bindings
            .iter()
            .any(|b| b.kind == ResourceKind::Texture2d && sampler_name(&b.name) == sampler.name);
        if !paired {
            return Err(ShaderError::Link(format!(
                "sampler `{}` does not name a texture (expected `<texture>_sampler`)",
                sampler.name
            )));
        }
    }

    let uniforms = UniformStorage::new(
        bindings
            .iter()
            .filter_map(|b| match &b.kind {
                ResourceKind::Uniform(layout) => Some(UniformBlock::new(b.binding, layout.clone())),
                _ => None,
            })
            .collect(),
    );

    log::debug!(
        "linked program `{}`/`{}` with {} bindings",
        vertex.entry_point(),
        fragment.entry_point(),
        bindings.len()
    );

    Ok(LinkedProgram {
        vertex,
        fragment,
        bindings,
        uniforms,
    })
}

/// Compile both stages, then link.
///
/// Both stages are compiled even if the first fails, so every diagnostic is
/// reported at once.
pub fn build(vertex_source: &str, fragment_source: &str) -> Result<LinkedProgram, ShaderError> {
    let vertex = compile(ShaderStage::Vertex, vertex_source);
    let fragment = compile(ShaderStage::Fragment, fragment_source);

    match (vertex, fragment) {
        (Ok(vertex), Ok(fragment)) => link(vertex, fragment),
        (vertex, fragment) => Err(ShaderError::Compile(
            [vertex.err(), fragment.err()].into_iter().flatten().collect(),
        )),
    }
}

/// Read both stage files, then [`build`]
pub fn build_from_files(
    vertex_path: impl AsRef<Path>,
    fragment_path: impl AsRef<Path>,
) -> Result<LinkedProgram, ShaderError> {
    let read = |path: &Path| {
        std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })
    };
    let vertex_source = read(vertex_path.as_ref())?;
    let fragment_source = read(fragment_path.as_ref())?;
    build(&vertex_source, &fragment_source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::shaders;

    const PASS_VERTEX: &str = r#"
        struct VertexOutput {
            @builtin(position) clip_position: vec4<f32>,
            @location(0) color: vec3<f32>,
        }

        @vertex
        fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
            var out: VertexOutput;
            out.clip_position = vec4<f32>(position, 1.0);
            out.color = vec3<f32>(1.0, 0.5, 0.2);
            return out;
        }
    "#;

    const PASS_FRAGMENT: &str = r#"
        @fragment
        fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
            return vec4<f32>(color, 1.0);
        }
    "#;

    #[test]
    fn test_passthrough_program_links() {
        let program = build(PASS_VERTEX, PASS_FRAGMENT).unwrap();
        assert!(program.bindings().is_empty());
        assert!(program.uniforms().blocks().is_empty());
        assert_eq!(program.vertex().entry_point(), "vs_main");
        assert_eq!(program.fragment().entry_point(), "fs_main");
    }

    #[test]
    fn test_builtin_program_links() {
        let program = build(shaders::QUAD_VERTEX, shaders::QUAD_FRAGMENT).unwrap();

        let globals = &program.bindings()[0];
        assert_eq!((globals.group, globals.binding), (UNIFORM_GROUP, 0));
        assert!(globals.vertex && globals.fragment);

        let textures: Vec<&str> = program.texture_names().collect();
        assert_eq!(textures, vec!["texture1", "texture2"]);
        assert!(program.bindings_in(TEXTURE_GROUP).all(|b| b.fragment && !b.vertex));

        assert!(program.uniforms().contains("transform"));
        assert!(program.uniforms().contains("mix_amount"));
        assert!(!program.uniforms().contains("texture1"));
    }

    #[test]
    fn test_malformed_fragment_reports_fragment_only() {
        let err = build(PASS_VERTEX, "@fragment fn fs_main() -> @location(0) vec4<f32> { return }")
            .unwrap_err();
        assert_eq!(err.failed_stages(), vec![ShaderStage::Fragment]);
        assert!(err.to_string().contains("fragment stage failed to compile"));
    }

    #[test]
    fn test_both_stages_reported() {
        let err = build("not wgsl", "also not wgsl").unwrap_err();
        assert_eq!(
            err.failed_stages(),
            vec![ShaderStage::Vertex, ShaderStage::Fragment]
        );
    }

    #[test]
    fn test_unwritten_fragment_input_fails_link() {
        let fragment = r#"
            @fragment
            fn fs_main(@location(1) uv: vec2<f32>) -> @location(0) vec4<f32> {
                return vec4<f32>(uv, 0.0, 1.0);
            }
        "#;
        let err = build(PASS_VERTEX, fragment).unwrap_err();
        let ShaderError::Link(message) = err else {
            panic!("expected a link error, got {err:?}");
        };
        assert!(message.contains("location 1"));
    }

    #[test]
    fn test_mismatched_varying_fails_link() {
        let fragment = r#"
            @fragment
            fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
                return color;
            }
        "#;
        assert!(matches!(build(PASS_VERTEX, fragment), Err(ShaderError::Link(_))));
    }

    #[test]
    fn test_conflicting_uniform_fails_link() {
        let vertex = r#"
            struct Globals { transform: mat4x4<f32> }
            @group(0) @binding(0) var<uniform> globals: Globals;
            @vertex
            fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
                return globals.transform * vec4<f32>(p, 1.0);
            }
        "#;
        let fragment = r#"
            struct Globals { tint: vec4<f32> }
            @group(0) @binding(0) var<uniform> globals: Globals;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return globals.tint;
            }
        "#;
        assert!(matches!(build(vertex, fragment), Err(ShaderError::Link(_))));
    }

    #[test]
    fn test_unpaired_sampler_fails_link() {
        let fragment = r#"
            @group(1) @binding(0) var image: texture_2d<f32>;
            @group(1) @binding(1) var smp: sampler;
            @fragment
            fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
                return textureSample(image, smp, color.xy);
            }
        "#;
        let err = build(PASS_VERTEX, fragment).unwrap_err();
        assert!(err.to_string().contains("smp"));
    }

    #[test]
    fn test_texture_in_uniform_group_fails_link() {
        let fragment = r#"
            @group(0) @binding(0) var image: texture_2d<f32>;
            @group(0) @binding(1) var image_sampler: sampler;
            @fragment
            fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
                return textureSample(image, image_sampler, color.xy);
            }
        "#;
        assert!(matches!(build(PASS_VERTEX, fragment), Err(ShaderError::Link(_))));
    }

    #[test]
    fn test_storage_buffer_is_unsupported() {
        let fragment = r#"
            @group(0) @binding(0) var<storage, read> values: array<f32>;
            @fragment
            fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
                return vec4<f32>(color * values[0], 1.0);
            }
        "#;
        let err = build(PASS_VERTEX, fragment).unwrap_err();
        assert!(err.to_string().contains("storage buffer"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = build_from_files("/nonexistent/quad.vert.wgsl", "/nonexistent/quad.frag.wgsl")
            .unwrap_err();
        let ShaderError::Io { path, .. } = err else {
            panic!("expected an io error");
        };
        assert_eq!(path, Path::new("/nonexistent/quad.vert.wgsl"));
    }

    #[test]
    fn test_build_from_files() {
        let dir = std::env::temp_dir().join(format!("quad-pong-shaders-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let vertex_path = dir.join("pass.vert.wgsl");
        let fragment_path = dir.join("pass.frag.wgsl");
        std::fs::write(&vertex_path, PASS_VERTEX).unwrap();
        std::fs::write(&fragment_path, PASS_FRAGMENT).unwrap();

        let result = build_from_files(&vertex_path, &fragment_path);
        std::fs::remove_dir_all(&dir).ok();
        assert!(result.is_ok());
    }
}
