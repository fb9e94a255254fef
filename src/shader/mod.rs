//! Shader programs, CPU side
//!
//! A program is built from two WGSL source texts, one per stage:
//!
//! 1. [`compile`] parses and validates one stage with `naga`, and reflects its
//!    entry point interface and resource bindings.
//! 2. [`link`] checks the two stages against each other and lays out the
//!    named uniforms.
//!
//! Nothing here touches a GPU. `renderer::ShaderProgram` turns a
//! [`LinkedProgram`] into a wgpu pipeline.
//!
//! Binding conventions:
//! - group 0: `var<uniform>` buffers, set by name through [`UniformStorage`]
//! - group 1: `texture_2d<f32>` textures, each paired with a sampler named
//!   `<texture>_sampler`

pub mod compile;
pub mod error;
pub mod link;
pub mod uniforms;

use std::fmt;

pub use compile::{CompiledStage, ResourceKind, ResourceSlot, Varying, VaryingFormat, compile};
pub use error::{ShaderError, StageDiagnostic};
pub use link::{
    LinkedProgram, ProgramBinding, TEXTURE_GROUP, UNIFORM_GROUP, build, build_from_files, link,
    sampler_name,
};
pub use uniforms::{UniformField, UniformKind, UniformLayout, UniformStorage, UniformValue};

/// Pipeline stage of a shader source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }

    pub(crate) fn naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
