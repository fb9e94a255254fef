//! Stage compilation and reflection

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{
    AddressSpace, Binding, Handle, ImageClass, ImageDimension, Module, ScalarKind, Type, TypeInner,
    VectorSize,
};

use super::uniforms::{UniformField, UniformKind, UniformLayout};
use super::{ShaderStage, StageDiagnostic};

/// Scalar kind and component count of an inter-stage value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaryingFormat {
    pub kind: ScalarKind,
    pub components: u8,
}

/// A `@location(n)` input or output of an entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Varying {
    pub location: u32,
    pub format: VaryingFormat,
    pub name: String,
}

/// What a resource binding holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Uniform(UniformLayout),
    Texture2d,
    Sampler,
    /// Anything the program model has no slot for
    Unsupported(&'static str),
}

/// A global resource declared with `@group(g) @binding(b)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSlot {
    pub group: u32,
    pub binding: u32,
    pub name: String,
    pub kind: ResourceKind,
}

/// One validated stage
#[derive(Debug, Clone)]
pub struct CompiledStage {
    stage: ShaderStage,
    source: String,
    entry_point: String,
    inputs: Vec<Varying>,
    outputs: Vec<Varying>,
    resources: Vec<ResourceSlot>,
}

impl CompiledStage {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// WGSL text, handed to the GPU unchanged
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// `@location` inputs, sorted by location
    pub fn inputs(&self) -> &[Varying] {
        &self.inputs
    }

    /// `@location` outputs, sorted by location
    pub fn outputs(&self) -> &[Varying] {
        &self.outputs
    }

    pub fn resources(&self) -> &[ResourceSlot] {
        &self.resources
    }
}

/// Parse and validate `source` as a single `stage`.
///
/// The module must contain exactly one entry point for that stage.
pub fn compile(stage: ShaderStage, source: &str) -> Result<CompiledStage, StageDiagnostic> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| StageDiagnostic::new(stage, e.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| StageDiagnostic::new(stage, e.emit_to_string(source)))?;

    let mut candidates = module.entry_points.iter().filter(|ep| ep.stage == stage.naga());
    let entry = match (candidates.next(), candidates.next()) {
        (Some(entry), None) => entry,
        (None, _) => {
            return Err(StageDiagnostic::new(stage, format!("no @{stage} entry point")));
        }
        (Some(_), Some(_)) => {
            return Err(StageDiagnostic::new(
                stage,
                format!("more than one @{stage} entry point"),
            ));
        }
    };

    let mut inputs = Vec::new();
    for arg in &entry.function.arguments {
        collect_varyings(&module, arg.ty, arg.binding.as_ref(), arg.name.as_deref(), &mut inputs);
    }
    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        collect_varyings(&module, result.ty, result.binding.as_ref(), None, &mut outputs);
    }
    inputs.sort_by_key(|v| v.location);
    outputs.sort_by_key(|v| v.location);

    log::debug!(
        "compiled {stage} stage `{}`: {} inputs, {} outputs",
        entry.name,
        inputs.len(),
        outputs.len()
    );

    Ok(CompiledStage {
        stage,
        source: source.to_string(),
        entry_point: entry.name.clone(),
        inputs,
        outputs,
        resources: reflect_resources(&module),
    })
}

fn collect_varyings(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    name: Option<&str>,
    out: &mut Vec<Varying>,
) {
    let inner = &module.types[ty].inner;
    match binding {
        Some(Binding::Location { location, .. }) => {
            if let Some(format) = varying_format(inner) {
                out.push(Varying {
                    location: *location,
                    format,
                    name: name.unwrap_or("<unnamed>").to_string(),
                });
            }
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = inner {
                for member in members {
                    collect_varyings(
                        module,
                        member.ty,
                        member.binding.as_ref(),
                        member.name.as_deref(),
                        out,
                    );
                }
            }
        }
    }
}

fn varying_format(inner: &TypeInner) -> Option<VaryingFormat> {
    match *inner {
        TypeInner::Scalar(scalar) => Some(VaryingFormat {
            kind: scalar.kind,
            components: 1,
        }),
        TypeInner::Vector { size, scalar } => Some(VaryingFormat {
            kind: scalar.kind,
            components: match size {
                VectorSize::Bi => 2,
                VectorSize::Tri => 3,
                VectorSize::Quad => 4,
            },
        }),
        _ => None,
    }
}

fn reflect_resources(module: &Module) -> Vec<ResourceSlot> {
    module
        .global_variables
        .iter()
        .filter_map(|(_, var)| {
            let binding = var.binding.as_ref()?;
            let name = var.name.clone().unwrap_or_default();
            let inner = &module.types[var.ty].inner;
            let kind = match var.space {
                AddressSpace::Uniform => {
                    ResourceKind::Uniform(uniform_layout(module, &name, inner))
                }
                AddressSpace::Handle => match *inner {
                    TypeInner::Image {
                        dim: ImageDimension::D2,
                        arrayed: false,
                        class: ImageClass::Sampled {
                            kind: ScalarKind::Float,
                            multi: false,
                        },
                    } => ResourceKind::Texture2d,
                    TypeInner::Image { .. } => {
                        ResourceKind::Unsupported("texture other than texture_2d<f32>")
                    }
                    TypeInner::Sampler { comparison: false } => ResourceKind::Sampler,
                    TypeInner::Sampler { comparison: true } => {
                        ResourceKind::Unsupported("comparison sampler")
                    }
                    _ => ResourceKind::Unsupported("handle"),
                },
                AddressSpace::Storage { .. } => ResourceKind::Unsupported("storage buffer"),
                _ => ResourceKind::Unsupported("resource"),
            };
            Some(ResourceSlot {
                group: binding.group,
                binding: binding.binding,
                name,
                kind,
            })
        })
        .collect()
}

/// Struct uniforms expose their named members; anything else is one field
/// named after the variable.
fn uniform_layout(module: &Module, var_name: &str, inner: &TypeInner) -> UniformLayout {
    match inner {
        TypeInner::Struct { members, span } => UniformLayout {
            size: align16(*span),
            fields: members
                .iter()
                .filter_map(|m| {
                    Some(UniformField {
                        name: m.name.clone()?,
                        offset: m.offset,
                        kind: UniformKind::of(&module.types[m.ty].inner),
                    })
                })
                .collect(),
        },
        other => UniformLayout {
            size: align16(other.size(module.to_ctx())),
            fields: vec![UniformField {
                name: var_name.to_string(),
                offset: 0,
                kind: UniformKind::of(other),
            }],
        },
    }
}

fn align16(size: u32) -> u32 {
    size.div_ceil(16) * 16
}
